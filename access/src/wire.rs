//! JSON wire format for the control-panel endpoints.
//!
//! List responses are decoded field by field instead of through a derived
//! `Deserialize`, so one malformed record is skipped (and logged) without
//! failing the whole list.

use crate::error::{AccessError, Result};
use crate::model::{AccessRequest, AccessRequestDraft, RequestId, RequestStatus, RequestType};
use crate::session::SessionContext;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Body of `POST /api/control-panel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitBody<'a> {
    /// Client-generated id
    #[serde(rename = "RequestID")]
    pub request_id: &'a str,
    /// Module name
    #[serde(rename = "Module")]
    pub module: &'a str,
    /// Requester role
    #[serde(rename = "UserRole")]
    pub user_role: &'a str,
    /// Requester
    #[serde(rename = "Username")]
    pub username: &'a str,
    /// `Edit` or `Delete`
    #[serde(rename = "RequestType")]
    pub request_type: &'static str,
    /// Justification
    #[serde(rename = "Remarks")]
    pub remarks: &'a str,
    /// Optional sub-resource
    #[serde(rename = "ReferenceID", skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<&'a str>,
}

impl<'a> SubmitBody<'a> {
    /// Assemble the body from a draft and the session identity.
    #[must_use]
    pub fn new(
        request_id: &'a RequestId,
        session: &'a SessionContext,
        draft: &'a AccessRequestDraft,
    ) -> Self {
        Self {
            request_id: request_id.as_str(),
            module: &draft.module,
            user_role: &session.user_role,
            username: &session.username,
            request_type: draft.request_type.as_str(),
            remarks: draft.remarks.trim(),
            reference_id: draft.reference_id.as_deref(),
        }
    }
}

/// Decode a list response.
///
/// Accepts either a bare array or an object with a `data` array.
///
/// # Errors
///
/// Returns `AccessError::Decode` if the body has neither shape.
pub fn decode_list(body: &Value) -> Result<Vec<AccessRequest>> {
    let records = match body {
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get("data").or_else(|| obj.get("Data")) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(AccessError::Decode(
                    "expected an array or an object with a `data` array".to_string(),
                ));
            },
        },
        other => {
            return Err(AccessError::Decode(format!(
                "expected an array, got {}",
                kind(other)
            )));
        },
    };

    let mut requests = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        match decode_record(record) {
            Ok(request) => requests.push(request),
            Err(reason) => {
                tracing::warn!(index, %reason, "Skipping malformed access request record");
            },
        }
    }
    Ok(requests)
}

/// Decode a single record.
///
/// # Errors
///
/// Returns a description of the first problem found.
pub fn decode_record(record: &Value) -> std::result::Result<AccessRequest, String> {
    let Value::Object(obj) = record else {
        return Err(format!("record is {}, not an object", kind(record)));
    };

    let request_type = required(obj, &["RequestType", "requestType", "request_type"])?
        .parse::<RequestType>()
        .map_err(|e| e.to_string())?;
    let status = required(obj, &["Status", "status"])?
        .parse::<RequestStatus>()
        .map_err(|e| e.to_string())?;

    Ok(AccessRequest {
        request_id: RequestId::new(required(obj, &["RequestID", "RequestId", "requestId", "requestID"])?),
        module: required(obj, &["Module", "module"])?,
        username: required(obj, &["Username", "UserName", "username"])?,
        user_role: optional(obj, &["UserRole", "userRole"]).unwrap_or_default(),
        request_type,
        remarks: optional(obj, &["Remarks", "remarks"]).unwrap_or_default(),
        status,
        expires_at: expiry(obj)?,
        reference_id: optional(obj, &["ReferenceID", "ReferenceId", "referenceId", "referenceID"]),
    })
}

/// Parse an `ExpiresAt` value.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DD[T ]HH:MM:SS[.fff]` read as UTC,
/// or epoch milliseconds (as a number or a numeric string).
#[must_use]
pub fn parse_expiry(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::String(s) => parse_expiry_str(s.trim()),
        _ => None,
    }
}

fn parse_expiry_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Some(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    s.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis)
}

fn expiry(obj: &Map<String, Value>) -> std::result::Result<Option<DateTime<Utc>>, String> {
    match lookup(obj, &["ExpiresAt", "expiresAt", "expires_at"]) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value) => parse_expiry(value)
            .map(Some)
            .ok_or_else(|| format!("unreadable ExpiresAt `{value}`")),
    }
}

fn lookup<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| obj.get(*name))
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn required(obj: &Map<String, Value>, names: &[&str]) -> std::result::Result<String, String> {
    lookup(obj, names)
        .and_then(text)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| format!("missing `{}`", names[0]))
}

fn optional(obj: &Map<String, Value>, names: &[&str]) -> Option<String> {
    lookup(obj, names).and_then(text)
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn approved(expires: Value) -> Value {
        json!({
            "RequestID": "REQ1",
            "Module": "Items",
            "Username": "alice",
            "UserRole": "Staff",
            "RequestType": "Edit",
            "Remarks": "typo",
            "Status": "Approved",
            "ExpiresAt": expires,
        })
    }

    #[test]
    fn decodes_array_and_data_wrapper() {
        let list = json!([approved(json!("2025-01-01T00:10:00Z"))]);
        let wrapped = json!({ "data": [approved(json!("2025-01-01T00:10:00Z"))] });

        assert_eq!(decode_list(&list).unwrap(), decode_list(&wrapped).unwrap());
        assert_eq!(decode_list(&list).unwrap().len(), 1);
    }

    #[test]
    fn rejects_non_list_body() {
        assert!(matches!(decode_list(&json!("nope")), Err(AccessError::Decode(_))));
        assert!(matches!(decode_list(&json!({ "items": [] })), Err(AccessError::Decode(_))));
    }

    #[test]
    fn skips_malformed_records() {
        let body = json!([
            approved(json!(null)),
            { "RequestID": "REQ2", "Module": "Items" },
            { "RequestID": "REQ3", "Module": "Items", "Username": "bob",
              "RequestType": "View", "Status": "Pending" },
            "garbage",
        ]);

        let requests = decode_list(&body).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].request_id.as_str(), "REQ1");
        assert_eq!(requests[0].expires_at, None);
    }

    #[test]
    fn accepts_camel_case_and_lenient_enums() {
        let record = json!({
            "requestId": 42,
            "module": "Insurance Renewal",
            "username": "carol",
            "requestType": "DELETE",
            "status": "denied",
            "referenceId": "POL-7",
        });

        let request = decode_record(&record).unwrap();
        assert_eq!(request.request_id.as_str(), "42");
        assert_eq!(request.request_type, RequestType::Delete);
        assert_eq!(request.status, RequestStatus::Rejected);
        assert_eq!(request.reference_id.as_deref(), Some("POL-7"));
        assert_eq!(request.user_role, "");
    }

    #[test]
    fn expiry_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 1, 0, 10, 0).unwrap();

        assert_eq!(parse_expiry(&json!("2025-01-01T00:10:00Z")), Some(expected));
        assert_eq!(parse_expiry(&json!("2025-01-01T05:40:00+05:30")), Some(expected));
        assert_eq!(parse_expiry(&json!("2025-01-01T00:10:00")), Some(expected));
        assert_eq!(parse_expiry(&json!("2025-01-01 00:10:00.000")), Some(expected));
        assert_eq!(parse_expiry(&json!(1_735_690_200_000_i64)), Some(expected));
        assert_eq!(parse_expiry(&json!("1735690200000")), Some(expected));
        assert_eq!(parse_expiry(&json!("soon")), None);
    }

    #[test]
    fn unreadable_expiry_skips_record() {
        assert!(decode_record(&approved(json!("tomorrow"))).is_err());
    }

    #[test]
    fn submit_body_uses_backend_field_names() {
        let id = RequestId::new("REQ1735689600000");
        let session = SessionContext::new("alice", "Staff", "t0k3n");
        let draft = AccessRequestDraft {
            module: "Items".into(),
            request_type: RequestType::Edit,
            remarks: "  need to fix typo ".into(),
            reference_id: None,
        };

        let body = serde_json::to_value(SubmitBody::new(&id, &session, &draft)).unwrap();

        assert_eq!(
            body,
            json!({
                "RequestID": "REQ1735689600000",
                "Module": "Items",
                "UserRole": "Staff",
                "Username": "alice",
                "RequestType": "Edit",
                "Remarks": "need to fix typo",
            })
        );
    }
}

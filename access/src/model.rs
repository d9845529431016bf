//! Access request domain types.

use crate::error::AccessError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Client-generated request identifier (`REQ<unix-millis>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Wrap an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate an identifier from the submission time.
    #[must_use]
    pub fn generate(now: DateTime<Utc>) -> Self {
        Self(format!("REQ{}", now.timestamp_millis()))
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The kind of elevated operation being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    /// Permission to edit records
    Edit,
    /// Permission to delete records
    Delete,
}

impl RequestType {
    /// Both types, Edit first.
    pub const ALL: [Self; 2] = [Self::Edit, Self::Delete];

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Edit => "Edit",
            Self::Delete => "Delete",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestType {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "edit" => Ok(Self::Edit),
            "delete" => Ok(Self::Delete),
            other => Err(AccessError::Decode(format!("unknown request type `{other}`"))),
        }
    }
}

/// Backend-owned lifecycle status of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    /// Waiting for an approver
    Pending,
    /// Granted, usually with an expiry
    Approved,
    /// Refused
    Rejected,
}

impl RequestStatus {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" | "denied" => Ok(Self::Rejected),
            other => Err(AccessError::Decode(format!("unknown status `{other}`"))),
        }
    }
}

/// A user's request for temporary elevated permission on one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    /// Unique identifier
    pub request_id: RequestId,
    /// Protected module name (e.g. "Items")
    pub module: String,
    /// Requesting user
    pub username: String,
    /// Role of the requesting user
    pub user_role: String,
    /// Requested operation
    pub request_type: RequestType,
    /// Justification entered by the user
    pub remarks: String,
    /// Lifecycle status
    pub status: RequestStatus,
    /// End of the grant window, present once approved
    pub expires_at: Option<DateTime<Utc>>,
    /// Optional sub-resource the request is scoped to
    pub reference_id: Option<String>,
}

impl AccessRequest {
    /// Approved and not yet expired at `now`.
    ///
    /// An approved request without an expiry never grants access.
    #[must_use]
    pub fn is_active_grant(&self, now: DateTime<Utc>) -> bool {
        self.status == RequestStatus::Approved && self.expires_at.is_some_and(|at| at > now)
    }

    /// Pending and owned by `username`.
    #[must_use]
    pub fn is_pending_for(&self, username: &str) -> bool {
        self.status == RequestStatus::Pending && self.username == username
    }
}

/// The caller-supplied part of a new request.
///
/// The client attaches the generated [`RequestId`] and the session identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequestDraft {
    /// Protected module name
    pub module: String,
    /// Requested operation
    pub request_type: RequestType,
    /// Justification, non-blank
    pub remarks: String,
    /// Optional sub-resource
    pub reference_id: Option<String>,
}

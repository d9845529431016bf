//! Derive a user's effective access from a list of requests.
//!
//! Pure and deterministic: the same requests, time and username always give
//! the same [`AccessState`].

use crate::model::{AccessRequest, RequestType};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Which active grant is reported as the [`AccessState::active_request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveSelection {
    /// The first active grant in list order
    #[default]
    FirstListed,
    /// The active grant that expires first
    SoonestExpiring,
}

impl FromStr for ActiveSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first-listed" | "first_listed" | "first" => Ok(Self::FirstListed),
            "soonest-expiring" | "soonest_expiring" | "soonest" => Ok(Self::SoonestExpiring),
            other => Err(format!("unknown active selection `{other}`")),
        }
    }
}

impl fmt::Display for ActiveSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FirstListed => "first-listed",
            Self::SoonestExpiring => "soonest-expiring",
        })
    }
}

/// Effective access for one user on one module at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccessState {
    /// Some active grant is of type Edit
    pub has_edit_access: bool,
    /// Some active grant is of type Delete
    pub has_delete_access: bool,
    /// At least one active grant exists
    pub has_any_access: bool,
    /// The grant whose countdown is shown
    pub active_request: Option<AccessRequest>,
    /// The user has a pending Edit request
    pub pending_edit: bool,
    /// The user has a pending Delete request
    pub pending_delete: bool,
}

impl AccessState {
    /// Whether an active grant of `request_type` exists.
    #[must_use]
    pub const fn has_access(&self, request_type: RequestType) -> bool {
        match request_type {
            RequestType::Edit => self.has_edit_access,
            RequestType::Delete => self.has_delete_access,
        }
    }

    /// Whether the user has a pending request of `request_type`.
    #[must_use]
    pub const fn is_pending(&self, request_type: RequestType) -> bool {
        match request_type {
            RequestType::Edit => self.pending_edit,
            RequestType::Delete => self.pending_delete,
        }
    }

    /// The first pending type, Edit before Delete.
    #[must_use]
    pub const fn first_pending(&self) -> Option<RequestType> {
        if self.pending_edit {
            Some(RequestType::Edit)
        } else if self.pending_delete {
            Some(RequestType::Delete)
        } else {
            None
        }
    }
}

/// Evaluate with the default [`ActiveSelection::FirstListed`].
#[must_use]
pub fn evaluate(requests: &[AccessRequest], now: DateTime<Utc>, username: &str) -> AccessState {
    evaluate_with(requests, now, username, ActiveSelection::FirstListed)
}

/// Evaluate access at `now` for `username`.
///
/// Grants (`Approved` with `expires_at > now`) count whoever requested them,
/// since the list is already scoped to the module or reference. Pending
/// flags only count the current user's requests.
#[must_use]
pub fn evaluate_with(
    requests: &[AccessRequest],
    now: DateTime<Utc>,
    username: &str,
    selection: ActiveSelection,
) -> AccessState {
    let mut state = AccessState::default();

    for request in requests {
        if request.is_active_grant(now) {
            match request.request_type {
                RequestType::Edit => state.has_edit_access = true,
                RequestType::Delete => state.has_delete_access = true,
            }

            let replace = match (&state.active_request, selection) {
                (None, _) => true,
                (Some(_), ActiveSelection::FirstListed) => false,
                (Some(current), ActiveSelection::SoonestExpiring) => {
                    request.expires_at < current.expires_at
                },
            };
            if replace {
                state.active_request = Some(request.clone());
            }
        } else if request.is_pending_for(username) {
            match request.request_type {
                RequestType::Edit => state.pending_edit = true,
                RequestType::Delete => state.pending_delete = true,
            }
        }
    }

    state.has_any_access = state.active_request.is_some();
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RequestId, RequestStatus};
    use chrono::Duration;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(1_735_689_600)
    }

    fn req(
        id: &str,
        user: &str,
        request_type: RequestType,
        status: RequestStatus,
        expires_in: Option<i64>,
    ) -> AccessRequest {
        AccessRequest {
            request_id: RequestId::new(id),
            module: "Items".into(),
            username: user.into(),
            user_role: "Staff".into(),
            request_type,
            remarks: "r".into(),
            status,
            expires_at: expires_in.map(|secs| now() + Duration::seconds(secs)),
            reference_id: None,
        }
    }

    #[test]
    fn empty_list_grants_nothing() {
        assert_eq!(evaluate(&[], now(), "alice"), AccessState::default());
    }

    #[test]
    fn approved_edit_with_future_expiry() {
        let requests = [req("R1", "alice", RequestType::Edit, RequestStatus::Approved, Some(600))];

        let state = evaluate(&requests, now(), "alice");

        assert!(state.has_edit_access);
        assert!(!state.has_delete_access);
        assert!(state.has_any_access);
        assert_eq!(state.active_request.as_ref().map(|r| r.request_id.as_str()), Some("R1"));
    }

    #[test]
    fn expired_and_expiry_less_grants_are_ignored() {
        let requests = [
            req("R1", "alice", RequestType::Edit, RequestStatus::Approved, Some(0)),
            req("R2", "alice", RequestType::Delete, RequestStatus::Approved, Some(-5)),
            req("R3", "alice", RequestType::Delete, RequestStatus::Approved, None),
        ];

        let state = evaluate(&requests, now(), "alice");

        assert!(!state.has_any_access);
        assert!(state.active_request.is_none());
    }

    #[test]
    fn pending_only_counts_current_user() {
        let requests = [
            req("R1", "bob", RequestType::Edit, RequestStatus::Pending, None),
            req("R2", "alice", RequestType::Delete, RequestStatus::Pending, None),
        ];

        let state = evaluate(&requests, now(), "alice");

        assert!(!state.pending_edit);
        assert!(state.pending_delete);
        assert_eq!(state.first_pending(), Some(RequestType::Delete));
    }

    #[test]
    fn rejected_requests_count_for_nothing() {
        let requests = [req("R1", "alice", RequestType::Edit, RequestStatus::Rejected, Some(600))];
        assert_eq!(evaluate(&requests, now(), "alice"), AccessState::default());
    }

    #[test]
    fn first_listed_keeps_list_order() {
        let requests = [
            req("LATE", "alice", RequestType::Edit, RequestStatus::Approved, Some(3_600)),
            req("SOON", "alice", RequestType::Delete, RequestStatus::Approved, Some(60)),
        ];

        let first = evaluate(&requests, now(), "alice");
        let soonest = evaluate_with(&requests, now(), "alice", ActiveSelection::SoonestExpiring);

        assert_eq!(first.active_request.map(|r| r.request_id), Some(RequestId::new("LATE")));
        assert_eq!(soonest.active_request.map(|r| r.request_id), Some(RequestId::new("SOON")));
        assert!(first.has_edit_access && first.has_delete_access);
    }

    #[test]
    fn selection_parses_from_config_values() {
        assert_eq!("first-listed".parse::<ActiveSelection>(), Ok(ActiveSelection::FirstListed));
        assert_eq!("Soonest-Expiring".parse::<ActiveSelection>(), Ok(ActiveSelection::SoonestExpiring));
        assert!("random".parse::<ActiveSelection>().is_err());
    }

    fn arb_request() -> impl Strategy<Value = AccessRequest> {
        (
            0u32..1_000,
            prop_oneof![Just("alice"), Just("bob")],
            prop_oneof![Just(RequestType::Edit), Just(RequestType::Delete)],
            prop_oneof![
                Just(RequestStatus::Pending),
                Just(RequestStatus::Approved),
                Just(RequestStatus::Rejected)
            ],
            proptest::option::of(-7_200i64..7_200),
        )
            .prop_map(|(n, user, t, s, exp)| req(&format!("R{n}"), user, t, s, exp))
    }

    proptest! {
        #[test]
        fn evaluation_is_deterministic(requests in proptest::collection::vec(arb_request(), 0..12)) {
            prop_assert_eq!(
                evaluate(&requests, now(), "alice"),
                evaluate(&requests, now(), "alice")
            );
        }

        #[test]
        fn flags_agree_with_active_request(requests in proptest::collection::vec(arb_request(), 0..12)) {
            for selection in [ActiveSelection::FirstListed, ActiveSelection::SoonestExpiring] {
                let state = evaluate_with(&requests, now(), "alice", selection);

                prop_assert_eq!(state.has_any_access, state.active_request.is_some());
                prop_assert_eq!(
                    state.has_any_access,
                    state.has_edit_access || state.has_delete_access
                );
                if let Some(active) = &state.active_request {
                    prop_assert!(active.is_active_grant(now()));
                    prop_assert!(state.has_access(active.request_type));
                }
            }
        }

        #[test]
        fn first_listed_is_first_active(requests in proptest::collection::vec(arb_request(), 0..12)) {
            let state = evaluate(&requests, now(), "alice");
            let expected = requests.iter().find(|r| r.is_active_grant(now())).cloned();
            prop_assert_eq!(state.active_request, expected);
        }
    }
}

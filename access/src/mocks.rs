//! Scripted in-memory client for tests.
//!
//! Behaves like a tiny backend: submissions are stored as Pending requests
//! and show up in later listings. Failures can be queued per operation.

use crate::client::AccessRequestClient;
use crate::error::{AccessError, Result};
use crate::model::{AccessRequest, AccessRequestDraft, RequestId, RequestStatus};
use crate::session::SessionContext;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Backend {
    requests: Vec<AccessRequest>,
    list_failures: VecDeque<AccessError>,
    submit_failures: VecDeque<AccessError>,
    submitted: Vec<AccessRequestDraft>,
    list_calls: usize,
    next_id: u64,
    latency: Option<Duration>,
}

/// Mock access request client.
///
/// Clones share the same backend.
#[derive(Debug, Clone, Default)]
pub struct MockAccessRequestClient {
    backend: Arc<Mutex<Backend>>,
}

impl MockAccessRequestClient {
    /// Create an empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock backend holding `requests`.
    #[must_use]
    pub fn with_requests(requests: Vec<AccessRequest>) -> Self {
        let mock = Self::new();
        mock.lock().requests = requests;
        mock
    }

    /// Delay every response by `latency` (tokio time).
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = Some(latency);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Backend> {
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a request to the backend.
    pub fn push_request(&self, request: AccessRequest) {
        self.lock().requests.push(request);
    }

    /// Approve a request until `expires_at`, as an approver would.
    ///
    /// Returns `false` if no request has that id.
    pub fn approve(&self, request_id: &RequestId, expires_at: DateTime<Utc>) -> bool {
        let mut backend = self.lock();
        match backend.requests.iter_mut().find(|r| &r.request_id == request_id) {
            Some(request) => {
                request.status = RequestStatus::Approved;
                request.expires_at = Some(expires_at);
                true
            },
            None => false,
        }
    }

    /// Make the next `list_requests` call fail with `error`.
    pub fn fail_next_list(&self, error: AccessError) {
        self.lock().list_failures.push_back(error);
    }

    /// Make the next `submit_request` call fail with `error`.
    pub fn fail_next_submit(&self, error: AccessError) {
        self.lock().submit_failures.push_back(error);
    }

    /// Number of `list_requests` calls so far.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    /// Drafts accepted by `submit_request`, in order.
    #[must_use]
    pub fn submitted(&self) -> Vec<AccessRequestDraft> {
        self.lock().submitted.clone()
    }

    /// Everything currently stored.
    #[must_use]
    pub fn requests(&self) -> Vec<AccessRequest> {
        self.lock().requests.clone()
    }
}

impl AccessRequestClient for MockAccessRequestClient {
    fn list_requests(
        &self,
        _session: &SessionContext,
        module: &str,
        reference_id: Option<&str>,
    ) -> impl Future<Output = Result<Vec<AccessRequest>>> + Send {
        let (latency, outcome) = {
            let mut backend = self.lock();
            backend.list_calls += 1;
            let outcome = match backend.list_failures.pop_front() {
                Some(error) => Err(error),
                None => Ok(backend
                    .requests
                    .iter()
                    .filter(|r| match reference_id {
                        None => r.module == module,
                        Some(reference) => r.reference_id.as_deref() == Some(reference),
                    })
                    .cloned()
                    .collect()),
            };
            (backend.latency, outcome)
        };

        async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            outcome
        }
    }

    fn submit_request(
        &self,
        session: &SessionContext,
        draft: &AccessRequestDraft,
    ) -> impl Future<Output = Result<RequestId>> + Send {
        let (latency, outcome) = {
            let mut backend = self.lock();
            let outcome = match backend.submit_failures.pop_front() {
                Some(error) => Err(error),
                None => {
                    backend.next_id += 1;
                    let request_id = RequestId::new(format!("REQ{}", backend.next_id));
                    backend.requests.push(AccessRequest {
                        request_id: request_id.clone(),
                        module: draft.module.clone(),
                        username: session.username.clone(),
                        user_role: session.user_role.clone(),
                        request_type: draft.request_type,
                        remarks: draft.remarks.trim().to_string(),
                        status: RequestStatus::Pending,
                        expires_at: None,
                        reference_id: draft.reference_id.clone(),
                    });
                    backend.submitted.push(draft.clone());
                    Ok(request_id)
                },
            };
            (backend.latency, outcome)
        };

        async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            outcome
        }
    }
}

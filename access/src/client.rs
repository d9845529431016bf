//! Access request client.
//!
//! [`AccessRequestClient`] is the seam between the workflow and the backend.
//! [`HttpAccessRequestClient`] talks to the control-panel REST endpoints;
//! tests use the scripted mock in [`crate::mocks`].

use crate::config::AccessConfig;
use crate::error::{AccessError, Result};
use crate::model::{AccessRequest, AccessRequestDraft, RequestId};
use crate::session::SessionContext;
use crate::wire::{self, SubmitBody};
use fleetdesk_core::environment::{Clock, SystemClock};
use reqwest::{Client, Response, StatusCode, Url};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Lists and creates access requests on behalf of a session.
///
/// Implementations never mutate or delete existing requests.
pub trait AccessRequestClient: Send + Sync {
    /// List requests for `module`, or for one `reference_id` within it.
    ///
    /// # Errors
    ///
    /// - `AccessError::Unauthorized` if the token is rejected
    /// - `AccessError::Network` on transport failure or timeout
    /// - `AccessError::UnexpectedStatus` for other non-success responses
    /// - `AccessError::Decode` if the body is not a list
    fn list_requests(
        &self,
        session: &SessionContext,
        module: &str,
        reference_id: Option<&str>,
    ) -> impl Future<Output = Result<Vec<AccessRequest>>> + Send;

    /// Create a Pending request and return its generated id.
    ///
    /// # Errors
    ///
    /// Same as [`list_requests`](Self::list_requests), minus `Decode`.
    fn submit_request(
        &self,
        session: &SessionContext,
        draft: &AccessRequestDraft,
    ) -> impl Future<Output = Result<RequestId>> + Send;
}

/// REST implementation of [`AccessRequestClient`].
#[derive(Clone)]
pub struct HttpAccessRequestClient {
    client: Client,
    base_url: Url,
    clock: Arc<dyn Clock>,
}

impl HttpAccessRequestClient {
    /// Create a client for `base_url` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::InvalidConfig` if the URL is not a valid base
    /// URL or the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| AccessError::InvalidConfig(format!("api base url `{base_url}`: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AccessError::InvalidConfig(format!(
                "api base url `{base_url}` cannot be a base"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AccessError::InvalidConfig(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            clock: Arc::new(SystemClock),
        })
    }

    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn from_config(config: &AccessConfig) -> Result<Self> {
        Self::new(&config.api_base_url, config.request_timeout)
    }

    /// Use `clock` to generate request ids.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The backend base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| AccessError::InvalidConfig("api base url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl std::fmt::Debug for HttpAccessRequestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAccessRequestClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl AccessRequestClient for HttpAccessRequestClient {
    fn list_requests(
        &self,
        session: &SessionContext,
        module: &str,
        reference_id: Option<&str>,
    ) -> impl Future<Output = Result<Vec<AccessRequest>>> + Send {
        let client = self.client.clone();
        let url = match reference_id {
            None => self.endpoint(&["api", "control-panel"]),
            Some(_) => self.endpoint(&["api", "control-panel", "reference", module]),
        };
        let token = session.token.clone();
        let module = module.to_string();
        let reference_id = reference_id.map(str::to_string);

        async move {
            let url = url?;
            tracing::debug!(%url, module = %module, reference_id = ?reference_id, "Listing access requests");

            let response = client
                .get(url)
                .bearer_auth(&token)
                .send()
                .await
                .map_err(transport_error)?;
            let response = check_status(response).await?;

            let body: serde_json::Value = response.json().await.map_err(|e| {
                if e.is_decode() {
                    AccessError::Decode(e.to_string())
                } else {
                    transport_error(e)
                }
            })?;

            let mut requests = wire::decode_list(&body)?;
            match &reference_id {
                None => requests.retain(|r| r.module.eq_ignore_ascii_case(&module)),
                Some(reference) => {
                    requests.retain(|r| r.reference_id.as_deref() == Some(reference.as_str()));
                },
            }

            tracing::debug!(count = requests.len(), "Access requests listed");
            Ok(requests)
        }
    }

    fn submit_request(
        &self,
        session: &SessionContext,
        draft: &AccessRequestDraft,
    ) -> impl Future<Output = Result<RequestId>> + Send {
        let client = self.client.clone();
        let url = self.endpoint(&["api", "control-panel"]);
        let request_id = RequestId::generate(self.clock.now());
        let body = serde_json::to_value(SubmitBody::new(&request_id, session, draft))
            .map_err(|e| AccessError::Decode(e.to_string()));
        let token = session.token.clone();

        async move {
            let url = url?;
            let body = body?;

            let response = client
                .post(url)
                .bearer_auth(&token)
                .json(&body)
                .send()
                .await
                .map_err(transport_error)?;
            check_status(response).await?;

            tracing::info!(%request_id, "Access request submitted");
            Ok(request_id)
        }
    }
}

/// Map a reqwest error to `Network`, naming timeouts explicitly.
fn transport_error(err: reqwest::Error) -> AccessError {
    if err.is_timeout() {
        AccessError::Network(format!("request timed out: {err}"))
    } else {
        AccessError::Network(err.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED => Err(AccessError::Unauthorized),
        status => {
            let body = response.text().await.unwrap_or_default();
            Err(AccessError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            })
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_encode_module_names() {
        let client = HttpAccessRequestClient::new("http://fleet.local/", Duration::from_secs(1)).unwrap();

        assert_eq!(
            client.endpoint(&["api", "control-panel"]).unwrap().as_str(),
            "http://fleet.local/api/control-panel"
        );
        assert_eq!(
            client
                .endpoint(&["api", "control-panel", "reference", "Service Invoice"])
                .unwrap()
                .as_str(),
            "http://fleet.local/api/control-panel/reference/Service%20Invoice"
        );
    }

    #[test]
    fn keeps_base_path_prefix() {
        let client = HttpAccessRequestClient::new("https://fleet.local/backend", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.endpoint(&["api", "control-panel"]).unwrap().as_str(),
            "https://fleet.local/backend/api/control-panel"
        );
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(matches!(
            HttpAccessRequestClient::new("not a url", Duration::from_secs(1)),
            Err(AccessError::InvalidConfig(_))
        ));
        assert!(matches!(
            HttpAccessRequestClient::new("mailto:ops@fleet.local", Duration::from_secs(1)),
            Err(AccessError::InvalidConfig(_))
        ));
    }

    #[test]
    fn debug_shows_base_url() {
        let client = HttpAccessRequestClient::new("http://fleet.local", Duration::from_secs(1)).unwrap();
        assert!(format!("{client:?}").contains("fleet.local"));
    }
}

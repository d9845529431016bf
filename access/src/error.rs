//! Error types for the access-request workflow.

use crate::model::RequestType;
use thiserror::Error;

/// Result type alias for access-request operations.
pub type Result<T> = std::result::Result<T, AccessError>;

/// Everything that can go wrong while listing, evaluating or submitting
/// access requests.
///
/// Errors are `Clone + PartialEq` because they travel inside workflow
/// actions and are stored on the workflow state as notices.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    // ═══════════════════════════════════════════════════════════
    // Backend Errors
    // ═══════════════════════════════════════════════════════════
    /// The backend rejected the bearer token (HTTP 401).
    #[error("Session expired or token rejected")]
    Unauthorized,

    /// Transport failure or timeout.
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status other than 401.
    #[error("Unexpected response (status {status}): {body}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("Could not decode response: {0}")]
    Decode(String),

    // ═══════════════════════════════════════════════════════════
    // User Errors
    // ═══════════════════════════════════════════════════════════
    /// The request form failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A pending request of this type already exists for the user.
    #[error("You already have a pending {0} request for this module")]
    DuplicatePending(RequestType),

    // ═══════════════════════════════════════════════════════════
    // Setup Errors
    // ═══════════════════════════════════════════════════════════
    /// No session identity is available.
    #[error("No session: sign in first")]
    MissingSession,

    /// Configuration could not be loaded or is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AccessError {
    /// Whether the error means the session must be re-established.
    #[must_use]
    pub const fn is_session_expired(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::MissingSession)
    }

    /// Whether the error is a transient transport problem.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Form validation failures, detected before any network call.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// No request type was chosen.
    #[error("Select a request type")]
    MissingRequestType,

    /// Remarks are empty after trimming whitespace.
    #[error("Remarks are required")]
    MissingRemarks,
}

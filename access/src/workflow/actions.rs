//! Workflow actions.
//!
//! User intents, I/O results and timer ticks all enter the reducer as
//! [`WorkflowAction`]s.

use crate::error::AccessError;
use crate::model::{AccessRequest, RequestId, RequestType};

/// Input to the access workflow reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowAction {
    // ═══════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════
    /// The owning view appeared: load requests
    Mount,

    /// The owning view went away: stop timers, drop in-flight results
    Unmount,

    /// Re-fetch requests from the backend
    Refresh,

    // ═══════════════════════════════════════════════════════════
    // Listing results
    // ═══════════════════════════════════════════════════════════
    /// Listing succeeded
    RequestsLoaded {
        /// Listing generation this answers
        generation: u64,
        /// Requests for the module or reference
        requests: Vec<AccessRequest>,
    },

    /// Listing failed
    LoadFailed {
        /// Listing generation this answers
        generation: u64,
        /// Cause
        error: AccessError,
    },

    // ═══════════════════════════════════════════════════════════
    // Request form
    // ═══════════════════════════════════════════════════════════
    /// Open the form, optionally with a fixed type
    OpenRequestForm {
        /// Fixed type, or `None` to let the user choose
        request_type: Option<RequestType>,
    },

    /// Choose the type (only when not fixed)
    SelectRequestType(RequestType),

    /// Replace the remarks text
    EditRemarks(String),

    /// Validate and submit the form
    SubmitRequest,

    /// The backend accepted the submission
    SubmitSucceeded {
        /// Id of the created request
        request_id: RequestId,
    },

    /// The submission failed
    SubmitFailed {
        /// Cause
        error: AccessError,
    },

    /// Close the form without submitting
    CloseRequestForm,

    // ═══════════════════════════════════════════════════════════
    // Timers and notices
    // ═══════════════════════════════════════════════════════════
    /// Countdown tick
    Tick {
        /// Countdown generation this tick belongs to
        generation: u64,
    },

    /// Remove a notice
    DismissNotice(u64),
}

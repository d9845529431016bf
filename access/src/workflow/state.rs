//! Workflow state.

use crate::countdown::Countdown;
use crate::error::AccessError;
use crate::evaluator::AccessState;
use crate::model::{AccessRequest, RequestType};

/// Where the workflow stands for the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessPhase {
    /// Not mounted yet
    #[default]
    Idle,
    /// A listing is in flight
    Evaluating,
    /// An active grant of this type is displayed
    Granted(RequestType),
    /// No grant; a request of this type is pending (Edit before Delete)
    Pending(RequestType),
    /// No grant and nothing pending
    Unauthorized,
}

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Something happened as expected
    Info,
    /// Something the user should know but can ignore
    Warning,
    /// An operation failed
    Error,
}

/// A dismissible message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Identifier used by `DismissNotice`
    pub id: u64,
    /// Severity
    pub level: NoticeLevel,
    /// Text
    pub message: String,
}

/// The open request form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestForm {
    /// Chosen type, if any
    pub request_type: Option<RequestType>,
    /// The type was fixed when the form was opened
    pub type_locked: bool,
    /// Justification being typed
    pub remarks: String,
    /// A submission is in flight
    pub submitting: bool,
    /// Last validation or submission error
    pub error: Option<AccessError>,
}

/// State of one access workflow, scoped to a module and optional reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowState {
    /// Protected module
    pub module: String,
    /// Optional sub-resource
    pub reference_id: Option<String>,
    /// Whether the owning view is alive
    pub mounted: bool,
    /// Current phase
    pub phase: AccessPhase,
    /// Last evaluation
    pub access: AccessState,
    /// Last successfully listed requests, minus expired grants
    pub last_requests: Vec<AccessRequest>,
    /// Countdown for the displayed grant
    pub countdown: Option<Countdown>,
    /// Request form, when open
    pub form: Option<RequestForm>,
    /// Notices, oldest first
    pub notices: Vec<Notice>,
    /// The backend rejected the session token
    pub session_expired: bool,
    /// Generation of the latest listing; older results are ignored
    pub list_generation: u64,
    /// Generation of the latest countdown; older ticks are ignored
    pub ticker_generation: u64,
    next_notice_id: u64,
}

impl WorkflowState {
    /// Create an unmounted workflow for `module`.
    #[must_use]
    pub fn new(module: impl Into<String>, reference_id: Option<String>) -> Self {
        Self {
            module: module.into(),
            reference_id,
            mounted: false,
            phase: AccessPhase::Idle,
            access: AccessState::default(),
            last_requests: Vec::new(),
            countdown: None,
            form: None,
            notices: Vec::new(),
            session_expired: false,
            list_generation: 0,
            ticker_generation: 0,
            next_notice_id: 1,
        }
    }

    /// Record a notice and return its id.
    pub fn push_notice(&mut self, level: NoticeLevel, message: impl Into<String>) -> u64 {
        let id = self.next_notice_id;
        self.next_notice_id += 1;
        self.notices.push(Notice {
            id,
            level,
            message: message.into(),
        });
        id
    }

    /// Edit controls should be enabled.
    #[must_use]
    pub const fn can_edit(&self) -> bool {
        self.access.has_edit_access
    }

    /// Delete controls should be enabled.
    #[must_use]
    pub const fn can_delete(&self) -> bool {
        self.access.has_delete_access
    }

    /// Countdown text for display, e.g. `04:59`.
    #[must_use]
    pub fn countdown_display(&self) -> Option<String> {
        self.countdown.as_ref().map(Countdown::display)
    }

    /// Whether a submission is in flight.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.form.as_ref().is_some_and(|f| f.submitting)
    }
}

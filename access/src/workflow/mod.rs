//! Request workflow controller.
//!
//! The controller is a reducer: [`AccessWorkflowReducer`] turns
//! [`WorkflowAction`]s into [`WorkflowState`] changes and effects (listing,
//! submitting, countdown ticks, polling) that a
//! [`Store`](fleetdesk_runtime::Store) executes.

pub mod actions;
pub mod environment;
pub mod reducer;
pub mod state;

pub use actions::WorkflowAction;
pub use environment::WorkflowEnvironment;
pub use reducer::{
    AccessWorkflowReducer, LIST_EFFECT, POLL_EFFECT, SUBMIT_EFFECT, TICKER_EFFECT, derive_phase,
};
pub use state::{AccessPhase, Notice, NoticeLevel, RequestForm, WorkflowState};

/// Store running an access workflow.
pub type AccessWorkflowStore<C, K> = fleetdesk_runtime::Store<
    WorkflowState,
    WorkflowAction,
    WorkflowEnvironment<C, K>,
    AccessWorkflowReducer<C, K>,
>;

/// Create a store for `module` (and optional `reference_id`), unmounted.
///
/// Send [`WorkflowAction::Mount`] to start it.
#[must_use]
pub fn workflow_store<C, K>(
    module: impl Into<String>,
    reference_id: Option<String>,
    environment: WorkflowEnvironment<C, K>,
) -> AccessWorkflowStore<C, K>
where
    C: crate::client::AccessRequestClient + Clone + 'static,
    K: fleetdesk_core::environment::Clock + 'static,
{
    fleetdesk_runtime::Store::new(
        WorkflowState::new(module, reference_id),
        AccessWorkflowReducer::new(),
        environment,
    )
}

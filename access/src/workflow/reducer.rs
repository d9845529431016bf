//! Access workflow reducer.
//!
//! Drives one (module, reference) workflow through
//! `Idle → Evaluating → Granted | Pending | Unauthorized`.
//!
//! # Flow
//!
//! 1. `Mount` lists requests from the backend
//! 2. The result is evaluated against the clock; the displayed grant gets a
//!    countdown ticking every tick interval
//! 3. When the countdown reaches zero the grant is dropped and access is
//!    re-evaluated locally, without a network call
//! 4. The user may open the request form, which validates and guards against
//!    duplicate pending requests before submitting
//! 5. A successful submission closes the form and lists again
//!
//! # Failure semantics
//!
//! - A failed listing never reduces access: the last known list is kept
//! - A failed submission never changes access; the form stays open
//! - A 401 marks the session expired and is never retried here
//!
//! # Cancellation
//!
//! Listing, submission, countdown and polling effects are registered under
//! [`LIST_EFFECT`], [`SUBMIT_EFFECT`], [`TICKER_EFFECT`] and [`POLL_EFFECT`].
//! `Unmount` cancels all four, and every result carries a generation or is
//! checked against the `mounted` flag, so late results are inert.

use super::actions::WorkflowAction;
use super::environment::WorkflowEnvironment;
use super::state::{AccessPhase, NoticeLevel, RequestForm, WorkflowState};
use crate::client::AccessRequestClient;
use crate::countdown::{Countdown, TickOutcome, remaining_seconds};
use crate::error::{AccessError, ValidationError};
use crate::evaluator::{AccessState, evaluate_with};
use crate::model::{AccessRequestDraft, RequestId, RequestType};
use fleetdesk_core::effect::{Effect, EffectId};
use fleetdesk_core::environment::Clock;
use fleetdesk_core::reducer::Reducer;
use smallvec::{SmallVec, smallvec};

/// Effect id of the in-flight listing.
pub const LIST_EFFECT: EffectId = EffectId::from_static("access.list");
/// Effect id of the in-flight submission.
pub const SUBMIT_EFFECT: EffectId = EffectId::from_static("access.submit");
/// Effect id of the pending countdown tick.
pub const TICKER_EFFECT: EffectId = EffectId::from_static("access.ticker");
/// Effect id of the pending background refresh.
pub const POLL_EFFECT: EffectId = EffectId::from_static("access.poll");

type Effects = SmallVec<[Effect<WorkflowAction>; 4]>;

/// Access workflow reducer.
///
/// Stateless; all state lives in [`WorkflowState`].
#[derive(Debug, Clone)]
pub struct AccessWorkflowReducer<C, K> {
    /// Phantom data to hold type parameters.
    _phantom: std::marker::PhantomData<(C, K)>,
}

impl<C, K> AccessWorkflowReducer<C, K> {
    /// Create a new reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<C, K> Default for AccessWorkflowReducer<C, K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Phase implied by an evaluation.
#[must_use]
pub fn derive_phase(access: &AccessState) -> AccessPhase {
    if let Some(active) = &access.active_request {
        AccessPhase::Granted(active.request_type)
    } else if let Some(pending) = access.first_pending() {
        AccessPhase::Pending(pending)
    } else {
        AccessPhase::Unauthorized
    }
}

impl<C, K> AccessWorkflowReducer<C, K>
where
    C: AccessRequestClient + Clone + 'static,
    K: Clock,
{
    /// Start a listing, superseding any listing still in flight.
    fn refresh(state: &mut WorkflowState, env: &WorkflowEnvironment<C, K>) -> Effects {
        let Some(session) = env.session.clone() else {
            tracing::warn!(module = %state.module, "Cannot list access requests without a session");
            state.push_notice(NoticeLevel::Error, AccessError::MissingSession.to_string());
            state.phase = derive_phase(&state.access);
            return smallvec![Effect::None];
        };

        state.phase = AccessPhase::Evaluating;
        state.list_generation += 1;
        let generation = state.list_generation;

        let client = env.client.clone();
        let module = state.module.clone();
        let reference_id = state.reference_id.clone();

        tracing::debug!(%module, generation, "Refreshing access requests");

        smallvec![
            Effect::Future(Box::pin(async move {
                match client
                    .list_requests(&session, &module, reference_id.as_deref())
                    .await
                {
                    Ok(requests) => Some(WorkflowAction::RequestsLoaded {
                        generation,
                        requests,
                    }),
                    Err(error) => Some(WorkflowAction::LoadFailed { generation, error }),
                }
            }))
            .cancellable(LIST_EFFECT)
        ]
    }

    /// Re-evaluate `last_requests` at the current time and keep the countdown
    /// on the displayed grant.
    ///
    /// A grant with less than a second left is expired on the spot rather
    /// than one tick later.
    fn reevaluate(state: &mut WorkflowState, env: &WorkflowEnvironment<C, K>) -> Effects {
        let now = env.clock.now();

        loop {
            state.access =
                evaluate_with(&state.last_requests, now, env.username(), env.active_selection);
            state.phase = derive_phase(&state.access);

            let subject = state.access.active_request.as_ref().and_then(|r| {
                r.expires_at.map(|at| (r.request_id.clone(), at, r.request_type))
            });

            let unchanged = match (&state.countdown, &subject) {
                (Some(countdown), Some((id, at, _))) => {
                    &countdown.request_id == id
                        && countdown.expires_at == *at
                        && !countdown.is_finished()
                },
                (None, None) => true,
                _ => false,
            };
            if unchanged {
                return smallvec![];
            }

            match subject {
                Some((request_id, expires_at, request_type)) => {
                    if remaining_seconds(expires_at, now) == 0 {
                        Self::drop_expired(state, &request_id, Some(request_type));
                        continue;
                    }

                    state.ticker_generation += 1;
                    tracing::debug!(%request_id, %expires_at, "Starting countdown");
                    state.countdown = Some(Countdown::start(
                        request_id,
                        expires_at,
                        now,
                        state.ticker_generation,
                    ));
                    return smallvec![Self::schedule_tick(env, state.ticker_generation)];
                },
                None => {
                    state.countdown = None;
                    return smallvec![Effect::cancel(TICKER_EFFECT)];
                },
            }
        }
    }

    /// Remove an expired grant from the last known list and tell the user.
    fn drop_expired(
        state: &mut WorkflowState,
        request_id: &RequestId,
        request_type: Option<RequestType>,
    ) {
        tracing::info!(%request_id, module = %state.module, "Access grant expired");
        state.last_requests.retain(|r| &r.request_id != request_id);

        let message = match request_type {
            Some(t) => format!("{t} access for {} has expired", state.module),
            None => format!("Access for {} has expired", state.module),
        };
        state.push_notice(NoticeLevel::Warning, message);
    }

    fn schedule_tick(env: &WorkflowEnvironment<C, K>, generation: u64) -> Effect<WorkflowAction> {
        Effect::Delay {
            duration: env.tick_interval,
            action: Box::new(WorkflowAction::Tick { generation }),
        }
        .cancellable(TICKER_EFFECT)
    }

    fn schedule_poll(env: &WorkflowEnvironment<C, K>) -> Option<Effect<WorkflowAction>> {
        env.poll_interval.map(|interval| {
            Effect::Delay {
                duration: interval,
                action: Box::new(WorkflowAction::Refresh),
            }
            .cancellable(POLL_EFFECT)
        })
    }

    fn submit(state: &mut WorkflowState, env: &WorkflowEnvironment<C, K>) -> Effects {
        let Some(form) = state.form.as_mut() else {
            tracing::warn!("SubmitRequest without an open form");
            return smallvec![Effect::None];
        };
        if form.submitting {
            tracing::debug!("Submission already in flight; ignoring");
            return smallvec![Effect::None];
        }

        let Some(request_type) = form.request_type else {
            form.error = Some(ValidationError::MissingRequestType.into());
            return smallvec![Effect::None];
        };
        if form.remarks.trim().is_empty() {
            form.error = Some(ValidationError::MissingRemarks.into());
            return smallvec![Effect::None];
        }

        if state.access.is_pending(request_type) {
            let error = AccessError::DuplicatePending(request_type);
            tracing::warn!(module = %state.module, %request_type, "Refusing duplicate pending request");
            form.error = Some(error.clone());
            state.push_notice(NoticeLevel::Warning, error.to_string());
            return smallvec![Effect::None];
        }

        let Some(session) = env.session.clone() else {
            form.error = Some(AccessError::MissingSession);
            state.push_notice(NoticeLevel::Error, AccessError::MissingSession.to_string());
            return smallvec![Effect::None];
        };

        form.submitting = true;
        form.error = None;

        let draft = AccessRequestDraft {
            module: state.module.clone(),
            request_type,
            remarks: form.remarks.trim().to_string(),
            reference_id: state.reference_id.clone(),
        };
        let client = env.client.clone();

        tracing::info!(module = %draft.module, %request_type, "Submitting access request");

        smallvec![
            Effect::Future(Box::pin(async move {
                match client.submit_request(&session, &draft).await {
                    Ok(request_id) => Some(WorkflowAction::SubmitSucceeded { request_id }),
                    Err(error) => Some(WorkflowAction::SubmitFailed { error }),
                }
            }))
            .cancellable(SUBMIT_EFFECT)
        ]
    }
}

impl<C, K> Reducer for AccessWorkflowReducer<C, K>
where
    C: AccessRequestClient + Clone + 'static,
    K: Clock,
{
    type State = WorkflowState;
    type Action = WorkflowAction;
    type Environment = WorkflowEnvironment<C, K>;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        if !state.mounted && action != WorkflowAction::Mount {
            tracing::debug!(?action, "Workflow not mounted; ignoring");
            return smallvec![Effect::None];
        }

        match action {
            // ═══════════════════════════════════════════════════════════════
            // Mount / Unmount / Refresh
            // ═══════════════════════════════════════════════════════════════
            WorkflowAction::Mount => {
                state.mounted = true;
                Self::refresh(state, env)
            },

            WorkflowAction::Unmount => {
                state.mounted = false;
                state.countdown = None;
                state.form = None;
                state.list_generation += 1;
                state.ticker_generation += 1;
                tracing::debug!(module = %state.module, "Workflow unmounted");

                smallvec![
                    Effect::cancel(LIST_EFFECT),
                    Effect::cancel(SUBMIT_EFFECT),
                    Effect::cancel(TICKER_EFFECT),
                    Effect::cancel(POLL_EFFECT),
                ]
            },

            WorkflowAction::Refresh => Self::refresh(state, env),

            // ═══════════════════════════════════════════════════════════════
            // Listing results
            // ═══════════════════════════════════════════════════════════════
            WorkflowAction::RequestsLoaded {
                generation,
                requests,
            } => {
                if generation != state.list_generation {
                    tracing::debug!(generation, current = state.list_generation, "Stale listing ignored");
                    return smallvec![Effect::None];
                }

                state.last_requests = requests;
                state.session_expired = false;

                let mut effects = Self::reevaluate(state, env);
                effects.extend(Self::schedule_poll(env));

                tracing::debug!(
                    module = %state.module,
                    phase = ?state.phase,
                    requests = state.last_requests.len(),
                    "Access evaluated"
                );

                if effects.is_empty() {
                    effects.push(Effect::None);
                }
                effects
            },

            WorkflowAction::LoadFailed { generation, error } => {
                if generation != state.list_generation {
                    tracing::debug!(generation, current = state.list_generation, "Stale failure ignored");
                    return smallvec![Effect::None];
                }

                tracing::warn!(module = %state.module, %error, "Listing access requests failed; keeping last known access");
                if error.is_session_expired() {
                    state.session_expired = true;
                }
                let message = if error.is_network() {
                    format!("Could not refresh access: {error}; showing last known access")
                } else {
                    format!("Could not refresh access: {error}")
                };
                state.push_notice(NoticeLevel::Warning, message);

                let mut effects = Self::reevaluate(state, env);
                if !state.session_expired {
                    effects.extend(Self::schedule_poll(env));
                }
                if effects.is_empty() {
                    effects.push(Effect::None);
                }
                effects
            },

            // ═══════════════════════════════════════════════════════════════
            // Request form
            // ═══════════════════════════════════════════════════════════════
            WorkflowAction::OpenRequestForm { request_type } => {
                if state.is_submitting() {
                    tracing::debug!("Form busy; ignoring OpenRequestForm");
                    return smallvec![Effect::None];
                }

                match request_type {
                    Some(fixed) if state.access.is_pending(fixed) => {
                        let error = AccessError::DuplicatePending(fixed);
                        tracing::warn!(module = %state.module, request_type = %fixed, "Request already pending");
                        state.push_notice(NoticeLevel::Warning, error.to_string());
                    },
                    None if state.access.pending_edit && state.access.pending_delete => {
                        tracing::warn!(module = %state.module, "Edit and Delete requests already pending");
                        state.push_notice(
                            NoticeLevel::Warning,
                            "You already have pending Edit and Delete requests for this module",
                        );
                    },
                    _ => {
                        state.form = Some(RequestForm {
                            request_type,
                            type_locked: request_type.is_some(),
                            ..RequestForm::default()
                        });
                    },
                }
                smallvec![Effect::None]
            },

            WorkflowAction::SelectRequestType(request_type) => {
                match state.form.as_mut() {
                    Some(form) if !form.type_locked && !form.submitting => {
                        form.request_type = Some(request_type);
                        form.error = None;
                    },
                    _ => tracing::debug!(%request_type, "Request type cannot be changed now"),
                }
                smallvec![Effect::None]
            },

            WorkflowAction::EditRemarks(remarks) => {
                if let Some(form) = state.form.as_mut().filter(|f| !f.submitting) {
                    form.remarks = remarks;
                    form.error = None;
                }
                smallvec![Effect::None]
            },

            WorkflowAction::SubmitRequest => Self::submit(state, env),

            WorkflowAction::SubmitSucceeded { request_id } => {
                tracing::info!(%request_id, module = %state.module, "Access request accepted");
                state.form = None;
                state.push_notice(
                    NoticeLevel::Info,
                    format!("Access request {request_id} submitted"),
                );
                Self::refresh(state, env)
            },

            WorkflowAction::SubmitFailed { error } => {
                tracing::warn!(module = %state.module, %error, "Access request submission failed");
                if error.is_session_expired() {
                    state.session_expired = true;
                }
                if let Some(form) = state.form.as_mut() {
                    form.submitting = false;
                    form.error = Some(error.clone());
                }
                state.push_notice(NoticeLevel::Error, format!("Could not submit request: {error}"));
                smallvec![Effect::None]
            },

            WorkflowAction::CloseRequestForm => {
                if state.is_submitting() {
                    tracing::debug!("Submission in flight; form stays open");
                } else {
                    state.form = None;
                }
                smallvec![Effect::None]
            },

            // ═══════════════════════════════════════════════════════════════
            // Countdown
            // ═══════════════════════════════════════════════════════════════
            WorkflowAction::Tick { generation } => {
                let now = env.clock.now();
                let Some(countdown) = state
                    .countdown
                    .as_mut()
                    .filter(|c| c.generation == generation && generation == state.ticker_generation)
                else {
                    tracing::debug!(generation, "Stale tick ignored");
                    return smallvec![Effect::None];
                };

                match countdown.tick(now) {
                    TickOutcome::Running(_) => smallvec![Self::schedule_tick(env, generation)],
                    TickOutcome::Finished => smallvec![Effect::None],
                    TickOutcome::Expired => {
                        let expired = countdown.request_id.clone();
                        let request_type = state
                            .access
                            .active_request
                            .as_ref()
                            .map(|r| r.request_type);

                        Self::drop_expired(state, &expired, request_type);
                        state.countdown = None;

                        let effects = Self::reevaluate(state, env);
                        if effects.is_empty() {
                            smallvec![Effect::None]
                        } else {
                            effects
                        }
                    },
                }
            },

            WorkflowAction::DismissNotice(id) => {
                state.notices.retain(|n| n.id != id);
                smallvec![Effect::None]
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::MockAccessRequestClient;
    use crate::model::{AccessRequest, RequestId, RequestStatus, RequestType};
    use crate::session::SessionContext;
    use chrono::Duration;
    use fleetdesk_testing::{ManualClock, test_clock};

    type Env = WorkflowEnvironment<MockAccessRequestClient, ManualClock>;
    type TestReducer = AccessWorkflowReducer<MockAccessRequestClient, ManualClock>;

    fn env(clock: &ManualClock) -> Env {
        WorkflowEnvironment::new(
            MockAccessRequestClient::new(),
            clock.clone(),
            Some(SessionContext::new("alice", "Staff", "token")),
        )
    }

    fn mounted() -> WorkflowState {
        let mut state = WorkflowState::new("Items", None);
        state.mounted = true;
        state.list_generation = 1;
        state
    }

    fn approved(id: &str, request_type: RequestType, secs: i64) -> AccessRequest {
        AccessRequest {
            request_id: RequestId::new(id),
            module: "Items".into(),
            username: "alice".into(),
            user_role: "Staff".into(),
            request_type,
            remarks: "r".into(),
            status: RequestStatus::Approved,
            expires_at: Some(test_clock().now() + Duration::seconds(secs)),
            reference_id: None,
        }
    }

    #[test]
    fn derive_phase_prefers_grant_then_edit() {
        let mut access = AccessState::default();
        assert_eq!(derive_phase(&access), AccessPhase::Unauthorized);

        access.pending_delete = true;
        access.pending_edit = true;
        assert_eq!(derive_phase(&access), AccessPhase::Pending(RequestType::Edit));

        access.active_request = Some(approved("R1", RequestType::Delete, 60));
        assert_eq!(derive_phase(&access), AccessPhase::Granted(RequestType::Delete));
    }

    #[test]
    fn unchanged_grant_keeps_countdown_generation() {
        let clock = ManualClock::starting_at(test_clock().now());
        let env = env(&clock);
        let reducer = TestReducer::new();
        let mut state = mounted();
        let requests = vec![approved("R1", RequestType::Edit, 60)];

        reducer.reduce(
            &mut state,
            WorkflowAction::RequestsLoaded { generation: 1, requests: requests.clone() },
            &env,
        );
        let first = state.ticker_generation;

        state.list_generation = 2;
        let effects = reducer.reduce(
            &mut state,
            WorkflowAction::RequestsLoaded { generation: 2, requests },
            &env,
        );

        assert_eq!(state.ticker_generation, first);
        assert!(effects.iter().all(Effect::is_none));
    }

    #[test]
    fn actions_before_mount_are_ignored() {
        let clock = ManualClock::starting_at(test_clock().now());
        let reducer = TestReducer::new();
        let mut state = WorkflowState::new("Items", None);

        let effects = reducer.reduce(&mut state, WorkflowAction::Refresh, &env(&clock));

        assert_eq!(state.phase, AccessPhase::Idle);
        assert_eq!(state.list_generation, 0);
        assert!(effects.iter().all(Effect::is_none));
    }
}

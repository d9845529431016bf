//! Integration tests for Store effect execution, feedback and cancellation.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use fleetdesk_core::{effect::Effect, effect::EffectId, reducer::Reducer, smallvec, SmallVec};
use fleetdesk_runtime::{Store, StoreError};
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum TimerAction {
    /// Arm a cancellable timer that fires `Fired(tag)` after `after_ms`
    Arm { tag: u32, after_ms: u64 },
    /// Cancel the armed timer
    Disarm,
    /// Timer elapsed
    Fired(u32),
    /// Run an async lookup that answers with `Answered`
    Lookup(u32),
    /// Lookup result
    Answered(u32),
    /// Two lookups, one after another
    LookupTwice,
}

#[derive(Debug, Clone, Default)]
struct TimerState {
    fired: Vec<u32>,
    answers: Vec<u32>,
}

struct TimerReducer;

const TIMER: EffectId = EffectId::from_static("timer");

impl Reducer for TimerReducer {
    type State = TimerState;
    type Action = TimerAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TimerAction::Arm { tag, after_ms } => smallvec![
                Effect::Delay {
                    duration: Duration::from_millis(after_ms),
                    action: Box::new(TimerAction::Fired(tag)),
                }
                .cancellable(TIMER)
            ],
            TimerAction::Disarm => smallvec![Effect::cancel(TIMER)],
            TimerAction::Fired(tag) => {
                state.fired.push(tag);
                smallvec![Effect::None]
            },
            TimerAction::Lookup(n) => smallvec![Effect::Future(Box::pin(async move {
                Some(TimerAction::Answered(n * 10))
            }))],
            TimerAction::Answered(n) => {
                state.answers.push(n);
                smallvec![Effect::None]
            },
            TimerAction::LookupTwice => smallvec![Effect::chain(vec![
                Effect::Future(Box::pin(async { Some(TimerAction::Answered(1)) })),
                Effect::Future(Box::pin(async { Some(TimerAction::Answered(2)) })),
            ])],
        }
    }
}

fn store() -> Store<TimerState, TimerAction, (), TimerReducer> {
    Store::new(TimerState::default(), TimerReducer, ())
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn future_effect_feeds_action_back() {
    let store = store();

    let answered = store
        .send_and_wait_for(
            TimerAction::Lookup(4),
            |a| matches!(a, TimerAction::Answered(_)),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    assert_eq!(answered, TimerAction::Answered(40));
    // feedback runs right after the broadcast; give it a moment
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(store.state(|s| s.answers.clone()).await, vec![40]);
}

#[tokio::test(start_paused = true)]
async fn delay_fires_after_duration() {
    let store = store();

    let mut handle = store
        .send(TimerAction::Arm { tag: 1, after_ms: 1_000 })
        .await
        .unwrap();
    assert_eq!(handle.pending(), 1);

    handle.wait_with_timeout(Duration::from_secs(5)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(store.state(|s| s.fired.clone()).await, vec![1]);
}

#[tokio::test(start_paused = true)]
async fn rearming_same_id_cancels_previous_timer() {
    let store = store();

    store
        .send(TimerAction::Arm { tag: 1, after_ms: 1_000 })
        .await
        .unwrap();
    store
        .send(TimerAction::Arm { tag: 2, after_ms: 1_000 })
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(store.state(|s| s.fired.clone()).await, vec![2]);
}

#[tokio::test(start_paused = true)]
async fn cancel_effect_stops_pending_timer() {
    let store = store();

    let mut armed = store
        .send(TimerAction::Arm { tag: 7, after_ms: 1_000 })
        .await
        .unwrap();
    store.send(TimerAction::Disarm).await.unwrap();

    // An aborted task still releases its tracking
    armed.wait_with_timeout(Duration::from_secs(1)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(store.state(|s| s.fired.is_empty()).await);
    assert_eq!(store.pending_effects(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_from_outside_the_reducer() {
    let store = store();

    store
        .send(TimerAction::Arm { tag: 3, after_ms: 500 })
        .await
        .unwrap();
    assert_eq!(store.cancel(&TIMER), 1);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(store.state(|s| s.fired.is_empty()).await);
}

#[tokio::test]
async fn sequential_effects_run_in_order() {
    let store = store();

    let mut handle = store.send(TimerAction::LookupTwice).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(store.state(|s| s.answers.clone()).await, vec![1, 2]);
}

#[tokio::test]
async fn shutdown_rejects_new_actions() {
    let store = store();

    store.shutdown(Duration::from_secs(1)).await.unwrap();

    let result = store.send(TimerAction::Lookup(1)).await;
    assert_eq!(result.unwrap_err(), StoreError::ShutdownInProgress);
}

#[tokio::test(start_paused = true)]
async fn shutdown_times_out_while_timer_runs() {
    let store = store();

    store
        .send(TimerAction::Arm { tag: 1, after_ms: 60_000 })
        .await
        .unwrap();

    let result = store.shutdown(Duration::from_millis(200)).await;
    assert_eq!(result, Err(StoreError::ShutdownTimeout(1)));
}

#[tokio::test]
async fn wait_for_times_out_without_matching_action() {
    let store = store();

    let result = store
        .send_and_wait_for(
            TimerAction::Lookup(1),
            |a| matches!(a, TimerAction::Fired(_)),
            Duration::from_millis(50),
        )
        .await;

    assert_eq!(result, Err(StoreError::Timeout));
}

//! # FleetDesk Core
//!
//! Core traits and types for building FleetDesk workflows as explicit state
//! machines.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state for one workflow instance
//! - **Action**: Every input to a reducer (user intents, I/O results, timer ticks)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits
//!
//! Reducers never touch the network or the wall clock directly. They read time
//! through [`environment::Clock`] and describe I/O and timers as
//! [`effect::Effect`] values, which the runtime executes and feeds back as
//! further actions.
//!
//! ## Example
//!
//! ```ignore
//! use fleetdesk_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! impl Reducer for TimerReducer {
//!     type State = TimerState;
//!     type Action = TimerAction;
//!     type Environment = TimerEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut TimerState,
//!         action: TimerAction,
//!         env: &TimerEnvironment,
//!     ) -> SmallVec<[Effect<TimerAction>; 4]> {
//!         match action {
//!             TimerAction::Start => smallvec![Effect::Delay {
//!                 duration: Duration::from_secs(1),
//!                 action: Box::new(TimerAction::Tick),
//!             }
//!             .cancellable("timer")],
//!             TimerAction::Stop => smallvec![Effect::cancel("timer")],
//!             TimerAction::Tick => smallvec![Effect::None],
//!         }
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They contain all decision logic and are deterministic and testable.
pub mod reducer {
    use super::SmallVec;
    use super::effect::Effect;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Implementations update `state` in place and return descriptions of
        /// the side effects to run. They must not perform I/O themselves.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable and cancellable.
pub mod effect {
    use std::borrow::Cow;
    use std::fmt;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Identifier for a group of cancellable effects
    ///
    /// Work started by [`Effect::Cancellable`] is registered under its id.
    /// Starting another cancellable effect with the same id aborts the
    /// previous one, and [`Effect::Cancel`] aborts everything registered
    /// under the id.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct EffectId(Cow<'static, str>);

    impl EffectId {
        /// Create an id from a static name (usable in `const` contexts)
        #[must_use]
        pub const fn from_static(name: &'static str) -> Self {
            Self(Cow::Borrowed(name))
        }

        /// Create an id from any string
        #[must_use]
        pub fn new(name: impl Into<String>) -> Self {
            Self(Cow::Owned(name.into()))
        }

        /// The id as a string slice
        #[must_use]
        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl fmt::Display for EffectId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<&'static str> for EffectId {
        fn from(name: &'static str) -> Self {
            Self::from_static(name)
        }
    }

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (timers, countdown ticks, polling)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Run `effect`, registered under `id` so it can be cancelled later
        ///
        /// Any work still registered under the same id is aborted first.
        Cancellable {
            /// Cancellation group
            id: EffectId,
            /// The wrapped effect
            effect: Box<Effect<Action>>,
        },

        /// Abort all in-flight work registered under the id
        Cancel(EffectId),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> fmt::Debug for Effect<Action>
    where
        Action: fmt::Debug,
    {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::Cancellable { id, effect } => f
                    .debug_struct("Effect::Cancellable")
                    .field("id", id)
                    .field("effect", effect)
                    .finish(),
                Effect::Cancel(id) => f.debug_tuple("Effect::Cancel").field(id).finish(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Register this effect under `id` (latest wins)
        #[must_use]
        pub fn cancellable(self, id: impl Into<EffectId>) -> Effect<Action> {
            Effect::Cancellable {
                id: id.into(),
                effect: Box::new(self),
            }
        }

        /// Abort everything registered under `id`
        #[must_use]
        pub fn cancel(id: impl Into<EffectId>) -> Effect<Action> {
            Effect::Cancel(id.into())
        }

        /// Whether this effect does nothing
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }

        /// The cancellation id this effect is registered under, if any
        #[must_use]
        pub const fn cancellation_id(&self) -> Option<&EffectId> {
            match self {
                Effect::Cancellable { id, .. } => Some(id),
                _ => None,
            }
        }

        /// Whether this effect cancels `id`
        #[must_use]
        pub fn cancels(&self, id: &EffectId) -> bool {
            match self {
                Effect::Cancel(target) => target == id,
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    effects.iter().any(|e| e.cancels(id))
                },
                _ => false,
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Anything that compares against "now" (grant expiry, countdowns,
    /// timestamp-based ids) goes through this trait so tests can control time.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
        fn now(&self) -> DateTime<Utc> {
            (**self).now()
        }
    }
}

//! Workflow environment.
//!
//! Holds everything the reducer needs from the outside world: the backend
//! client, the clock, the session identity and timing settings.

use crate::client::AccessRequestClient;
use crate::config::AccessConfig;
use crate::evaluator::ActiveSelection;
use crate::session::SessionContext;
use fleetdesk_core::environment::Clock;
use std::time::Duration;

/// Dependencies of [`AccessWorkflowReducer`](super::AccessWorkflowReducer).
///
/// # Type Parameters
///
/// - `C`: Access request client
/// - `K`: Clock
#[derive(Debug, Clone)]
pub struct WorkflowEnvironment<C, K>
where
    C: AccessRequestClient + Clone,
    K: Clock,
{
    /// Backend client.
    pub client: C,

    /// Time source for expiry checks.
    pub clock: K,

    /// Signed-in user, `None` when nobody is signed in.
    pub session: Option<SessionContext>,

    /// Countdown refresh period.
    pub tick_interval: Duration,

    /// Background refresh period, `None` to refresh only on demand.
    pub poll_interval: Option<Duration>,

    /// Which active grant the countdown follows.
    pub active_selection: ActiveSelection,
}

impl<C, K> WorkflowEnvironment<C, K>
where
    C: AccessRequestClient + Clone,
    K: Clock,
{
    /// Create an environment with a one-second tick and no polling.
    #[must_use]
    pub const fn new(client: C, clock: K, session: Option<SessionContext>) -> Self {
        Self {
            client,
            clock,
            session,
            tick_interval: Duration::from_secs(1),
            poll_interval: None,
            active_selection: ActiveSelection::FirstListed,
        }
    }

    /// Create an environment using the timing settings in `config`.
    #[must_use]
    pub fn from_config(
        client: C,
        clock: K,
        session: Option<SessionContext>,
        config: &AccessConfig,
    ) -> Self {
        Self {
            client,
            clock,
            session,
            tick_interval: config.tick_interval,
            poll_interval: config.poll_interval,
            active_selection: config.active_selection,
        }
    }

    /// Set the countdown refresh period.
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Enable background polling.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Choose which active grant the countdown follows.
    #[must_use]
    pub fn with_active_selection(mut self, selection: ActiveSelection) -> Self {
        self.active_selection = selection;
        self
    }

    /// The signed-in username, or `""`.
    #[must_use]
    pub fn username(&self) -> &str {
        self.session.as_ref().map_or("", |s| s.username.as_str())
    }
}

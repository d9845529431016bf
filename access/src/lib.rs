//! # FleetDesk Access
//!
//! Time-limited edit/delete access for protected FleetDesk modules (Items,
//! Service Invoice, Insurance Renewal, ...).
//!
//! A user requests access, an approver grants it out of band with an expiry,
//! and the grant lapses on its own when the expiry passes:
//!
//! ```text
//! request → Pending → Approved (expires_at) → expired
//!                   ↘ Rejected
//! ```
//!
//! ## Components
//!
//! - [`client`]: [`AccessRequestClient`] and its REST implementation
//! - [`evaluator`]: pure [`evaluate`] from requests to [`AccessState`]
//! - [`countdown`]: remaining-time arithmetic and display
//! - [`workflow`]: the reducer tying them together, run by a
//!   [`Store`](fleetdesk_runtime::Store)
//!
//! ## Example
//!
//! ```ignore
//! use fleetdesk_access::{AccessConfig, HttpAccessRequestClient, SessionContext};
//! use fleetdesk_access::workflow::{WorkflowAction, WorkflowEnvironment, workflow_store};
//! use fleetdesk_core::environment::SystemClock;
//!
//! let config = AccessConfig::from_env()?;
//! let session = SessionContext::load(&config.session_file)?;
//! let client = HttpAccessRequestClient::from_config(&config)?;
//! let env = WorkflowEnvironment::from_config(client, SystemClock, session, &config);
//!
//! let store = workflow_store("Items", None, env);
//! store.send(WorkflowAction::Mount).await?;
//! ```

pub mod client;
pub mod config;
pub mod countdown;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod session;
pub mod wire;
pub mod workflow;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use client::{AccessRequestClient, HttpAccessRequestClient};
pub use config::{AccessConfig, ConfigError};
pub use countdown::{Countdown, TickOutcome, format_remaining, remaining_seconds};
pub use error::{AccessError, Result, ValidationError};
pub use evaluator::{AccessState, ActiveSelection, evaluate, evaluate_with};
pub use model::{AccessRequest, AccessRequestDraft, RequestId, RequestStatus, RequestType};
pub use session::SessionContext;

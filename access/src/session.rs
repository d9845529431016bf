//! Session identity injected into the workflow.
//!
//! The session is issued elsewhere and persisted as JSON
//! (`{"username", "userRole", "token"}`). This crate only reads it.

use crate::error::{AccessError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;

/// Identity of the signed-in user.
///
/// Read-only for the lifetime of a workflow instance.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    /// Username
    pub username: String,
    /// Role name (e.g. "Staff", "Admin")
    pub user_role: String,
    /// Bearer token sent with every backend call
    pub token: String,
}

impl SessionContext {
    /// Create a session context.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        user_role: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            user_role: user_role.into(),
            token: token.into(),
        }
    }

    /// Parse a persisted session.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::InvalidConfig` if the JSON is malformed or the
    /// username or token is blank.
    pub fn from_json(json: &str) -> Result<Self> {
        let session: Self = serde_json::from_str(json)
            .map_err(|e| AccessError::InvalidConfig(format!("session file: {e}")))?;

        if session.username.trim().is_empty() || session.token.trim().is_empty() {
            return Err(AccessError::InvalidConfig(
                "session file: username and token are required".to_string(),
            ));
        }
        Ok(session)
    }

    /// Load the persisted session from `path`.
    ///
    /// A missing file means nobody is signed in and yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::InvalidConfig` if the file cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No session file");
                Ok(None)
            },
            Err(e) => Err(AccessError::InvalidConfig(format!(
                "cannot read {}: {e}",
                path.display()
            ))),
        }
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("username", &self.username)
            .field("user_role", &self.user_role)
            .field("token", &"<redacted>")
            .finish()
    }
}

//! Third-party authorization records and listeners.
//!
//! The tool provider owns the authorization record for every
//! (user, tool) pair. [`Authorization`] is the local view of that record;
//! an [`AuthorizationListener`] is told when the user has to act on it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Lifecycle of an authorization record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum AuthorizationStatus {
    /// The user has not been asked yet.
    #[default]
    NotStarted,
    /// The user was asked and has not finished.
    Pending,
    /// The user granted access.
    Completed,
    /// The flow failed or was rejected.
    Failed,
}

impl AuthorizationStatus {
    /// Check if authorization is complete.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Check if authorization failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Provider response to an authorization request or status poll.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Authorization {
    /// Identifier to poll for status; absent once nothing is left to wait on.
    #[serde(default)]
    pub id: Option<String>,
    /// Current status.
    #[serde(default)]
    pub status: AuthorizationStatus,
    /// Consent URL the user must visit while the status is pending.
    #[serde(default)]
    pub url: Option<String>,
    /// Scopes requested from the third party.
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Authorization {
    /// An already-completed authorization.
    #[must_use]
    pub fn completed() -> Self {
        Self {
            status: AuthorizationStatus::Completed,
            ..Self::default()
        }
    }

    /// A pending authorization awaiting the user at `url`.
    #[must_use]
    pub fn pending(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            status: AuthorizationStatus::Pending,
            url: Some(url.into()),
            scopes: Vec::new(),
        }
    }

    /// A failed authorization.
    #[must_use]
    pub fn failed(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            status: AuthorizationStatus::Failed,
            ..Self::default()
        }
    }

    /// Check if authorization is complete.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.status.is_completed()
    }
}

/// Observer of authorization flows that need user action.
#[async_trait]
pub trait AuthorizationListener: Send + Sync {
    /// The user must complete `authorization` (usually by visiting its URL).
    async fn on_authorization_required(
        &self,
        tool_name: &str,
        user_id: &str,
        authorization: &Authorization,
    );

    /// A previously required authorization has completed.
    async fn on_authorization_completed(&self, _tool_name: &str, _user_id: &str) {}
}

/// A shared authorization listener.
pub type SharedAuthorizationListener = Arc<dyn AuthorizationListener>;

/// Listener that reports authorization flows through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingAuthListener;

#[async_trait]
impl AuthorizationListener for LoggingAuthListener {
    async fn on_authorization_required(
        &self,
        tool_name: &str,
        user_id: &str,
        authorization: &Authorization,
    ) {
        tracing::info!(
            tool = tool_name,
            user = user_id,
            url = authorization.url.as_deref().unwrap_or("<none>"),
            "Authorization required, waiting for the user to complete it"
        );
    }

    async fn on_authorization_completed(&self, tool_name: &str, user_id: &str) {
        tracing::info!(tool = tool_name, user = user_id, "Authorization completed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod authorization_status {
        use super::*;

        #[test]
        fn default_is_not_started() {
            assert_eq!(AuthorizationStatus::default(), AuthorizationStatus::NotStarted);
        }

        #[test]
        fn serde_uses_snake_case() {
            let parsed: AuthorizationStatus = serde_json::from_str(r#""not_started""#).unwrap();
            assert_eq!(parsed, AuthorizationStatus::NotStarted);
            assert_eq!(
                serde_json::to_string(&AuthorizationStatus::Completed).unwrap(),
                r#""completed""#
            );
        }

        #[test]
        fn display_matches_serde() {
            assert_eq!(AuthorizationStatus::Pending.to_string(), "pending");
            assert_eq!(AuthorizationStatus::Failed.to_string(), "failed");
        }
    }

    mod authorization {
        use super::*;

        #[test]
        fn deserialize_provider_response_ignores_extra_fields() {
            let json = r#"{
                "id": "ac_123",
                "status": "pending",
                "url": "https://accounts.example.com/consent",
                "scopes": ["gmail.send"],
                "provider_id": "google",
                "context": {}
            }"#;
            let auth: Authorization = serde_json::from_str(json).unwrap();
            assert_eq!(auth.id.as_deref(), Some("ac_123"));
            assert_eq!(auth.status, AuthorizationStatus::Pending);
            assert_eq!(auth.scopes, vec!["gmail.send"]);
        }

        #[test]
        fn deserialize_minimal_completed() {
            let auth: Authorization = serde_json::from_str(r#"{"status": "completed"}"#).unwrap();
            assert!(auth.is_completed());
            assert!(auth.id.is_none());
        }

        #[test]
        fn constructors() {
            assert!(Authorization::completed().is_completed());
            let pending = Authorization::pending("id", "https://x");
            assert_eq!(pending.status, AuthorizationStatus::Pending);
            assert_eq!(pending.url.as_deref(), Some("https://x"));
            assert!(Authorization::failed("id").status.is_failed());
        }
    }

    #[tokio::test]
    async fn logging_listener_accepts_events() {
        let listener = LoggingAuthListener;
        listener
            .on_authorization_required("Gmail_SendEmail", "u", &Authorization::pending("a", "b"))
            .await;
        listener.on_authorization_completed("Gmail_SendEmail", "u").await;
    }
}

// In-memory session state owned by the controller.

use serde::{Deserialize, Serialize};

use crate::report::{Report, Session};

/// Identity returned by the service at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default, deserialize_with = "opt_string_or_number", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
}

impl UserInfo {
    pub fn new(username: impl Into<String>) -> Self {
        Self { id: None, username: username.into(), full_name: None, organization: None }
    }

    /// "Full Name (Organization)", falling back to the username and the
    /// beta tester label.
    pub fn display_name(&self) -> String {
        let name = self
            .full_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.username);
        let org = self
            .organization
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("베타 테스터");
        format!("{} ({})", name, org)
    }
}

/// Bearer token together with the user it belongs to. One cannot exist
/// without the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: String,
    pub user: UserInfo,
}

/// Everything the client remembers during one run.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub auth: Option<AuthSession>,
    pub current_session_id: Option<String>,
    pub session: Option<Session>,
    pub report: Option<Report>,
}

impl SessionState {
    pub fn token(&self) -> Option<&str> {
        self.auth.as_ref().map(|a| a.token.as_str())
    }

    pub fn user(&self) -> Option<&UserInfo> {
        self.auth.as_ref().map(|a| &a.user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    /// Record a new report, replacing whatever session was active.
    pub fn accept_report(&mut self, report: Report) -> &Session {
        self.current_session_id = Some(report.session_id.clone());
        let session = self.session.insert(Session::from_report(&report));
        self.report = Some(report);
        session
    }

    /// Drop credentials and everything derived from them.
    pub fn clear(&mut self) {
        self.auth = None;
        self.current_session_id = None;
        self.session = None;
        self.report = None;
    }
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

//! Persisted login state.
//!
//! Two keys in the local store: `authToken` (raw bearer string) and
//! `currentUser` (JSON). They are written and cleared together; a store holding
//! only one of them reads as logged out.

use riskview_config::storage::KeyValueStore;
use riskview_config::ConfigError;
use riskview_core::{AuthSession, UserInfo};

pub const TOKEN_KEY: &str = "authToken";
pub const USER_KEY: &str = "currentUser";

/// Load saved credentials.
/// Returns None if either key is missing or the user record is invalid.
pub fn load_auth(store: &dyn KeyValueStore) -> Option<AuthSession> {
    let token = store.get(TOKEN_KEY).filter(|t| !t.is_empty())?;
    let user_json = store.get(USER_KEY)?;
    let user: UserInfo = match serde_json::from_str(&user_json) {
        Ok(u) => u,
        Err(e) => {
            log::warn!("Stored user record is invalid, ignoring saved login: {}", e);
            return None;
        }
    };
    Some(AuthSession { token, user })
}

/// Save credentials. On failure nothing half-written is left behind.
pub fn save_auth(store: &mut dyn KeyValueStore, auth: &AuthSession) -> Result<(), ConfigError> {
    let user_json =
        serde_json::to_string(&auth.user).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let result = store
        .set(TOKEN_KEY, &auth.token)
        .and_then(|()| store.set(USER_KEY, &user_json));

    if result.is_err() {
        let _ = clear_auth(store);
    }
    result
}

/// Delete saved credentials. Safe to call when nothing is saved.
pub fn clear_auth(store: &mut dyn KeyValueStore) -> Result<(), ConfigError> {
    let token = store.remove(TOKEN_KEY);
    let user = store.remove(USER_KEY);
    token.and(user)
}

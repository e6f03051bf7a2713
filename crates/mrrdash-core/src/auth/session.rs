use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::store::{KeyValueStore, StoreError};

/// Store key holding the bearer token
pub const TOKEN_KEY: &str = "token";

/// Store key holding the user id the token was issued to
pub const USER_ID_KEY: &str = "userID";

/// Store key holding the token expiry as decimal epoch seconds
pub const EXPIRATION_KEY: &str = "tokenExpiration";

const SESSION_KEYS: [&str; 3] = [TOKEN_KEY, USER_ID_KEY, EXPIRATION_KEY];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub token: String,
    pub user_id: String,
    /// Absolute expiry, epoch seconds
    pub expires_at: i64,
}

impl SessionData {
    pub fn new(token: impl Into<String>, user_id: impl Into<String>, expires_at: i64) -> Self {
        Self {
            token: token.into(),
            user_id: user_id.into(),
            expires_at,
        }
    }

    /// Milliseconds left before the token lapses; negative once it has
    pub fn remaining_millis(&self, now_millis: i64) -> i64 {
        self.expires_at.saturating_mul(1000).saturating_sub(now_millis)
    }

    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.remaining_millis(now_millis) < 0
    }

    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expires_at, 0)
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self, now_millis: i64) -> i64 {
        (self.remaining_millis(now_millis) / 60_000).max(0)
    }

    /// Write all three session keys.
    ///
    /// If a write fails, keys already written are put back to what they held
    /// before (or removed if they were absent), so a failed save leaves any
    /// previously persisted session intact.
    pub fn persist(&self, store: &dyn KeyValueStore) -> Result<(), StoreError> {
        let expires_at = self.expires_at.to_string();
        let entries = [
            (TOKEN_KEY, self.token.as_str()),
            (USER_ID_KEY, self.user_id.as_str()),
            (EXPIRATION_KEY, expires_at.as_str()),
        ];

        let previous = entries
            .iter()
            .map(|(key, _)| store.get(key))
            .collect::<Result<Vec<_>, _>>()?;

        for (written, (key, value)) in entries.iter().enumerate() {
            if let Err(e) = store.set(key, value) {
                for ((key, _), old) in entries[..written].iter().zip(&previous) {
                    let rollback = match old {
                        Some(old) => store.set(key, old),
                        None => store.remove(key),
                    };
                    if let Err(rollback) = rollback {
                        warn!(key, error = %rollback, "Failed to roll back session key");
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Read a persisted session.
    ///
    /// Returns `Ok(None)` when any key is missing or the expiry is not a
    /// number. Expiry is not checked here.
    pub fn load(store: &dyn KeyValueStore) -> Result<Option<Self>, StoreError> {
        let token = store.get(TOKEN_KEY)?;
        let user_id = store.get(USER_ID_KEY)?;
        let expiration = store.get(EXPIRATION_KEY)?;

        let (Some(token), Some(user_id), Some(expiration)) = (token, user_id, expiration) else {
            return Ok(None);
        };

        let Some(expires_at) = parse_expiration(&expiration) else {
            warn!(value = %expiration, "Ignoring unparsable token expiration");
            return Ok(None);
        };

        Ok(Some(Self {
            token,
            user_id,
            expires_at,
        }))
    }

    /// Remove every session key, attempting all of them even if one fails
    pub fn clear(store: &dyn KeyValueStore) -> Result<(), StoreError> {
        let mut first_error = None;
        for key in SESSION_KEYS {
            if let Err(e) = store.remove(key) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Expiry may have been written as an integer or, by other clients, a float
fn parse_expiration(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<i64>() {
        return Some(secs);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite())
        .map(|secs| secs.trunc() as i64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    Explicit,
    Expiry,
}

/// Observable snapshot of the session manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthStatus {
    Unauthenticated { did_auto_logout: bool },
    Authenticated { user_id: String, expires_at: i64 },
}

impl AuthStatus {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthStatus::Authenticated { .. })
    }

    pub fn did_auto_logout(&self) -> bool {
        matches!(
            self,
            AuthStatus::Unauthenticated {
                did_auto_logout: true
            }
        )
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            AuthStatus::Authenticated { user_id, .. } => Some(user_id),
            AuthStatus::Unauthenticated { .. } => None,
        }
    }
}

impl Default for AuthStatus {
    fn default() -> Self {
        AuthStatus::Unauthenticated {
            did_auto_logout: false,
        }
    }
}

//! Core library for mrrdash.
//!
//! This crate holds everything the dashboard client needs to keep a user
//! signed in:
//!
//! - `auth`: the session state machine with token-expiry auto-logout
//! - `api`: the HTTP client for the login/signup endpoints
//! - `store`: key-value persistence back-ends for the session token
//! - `analytics`: the file/period selection that is scoped to a session
//! - `config`: on-disk configuration with environment overrides

pub mod analytics;
pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod store;

pub use analytics::AnalyticsSelection;
pub use api::{AuthClient, AuthError, AuthGrant, AuthMode, AuthService, Credentials};
pub use auth::{AuthStatus, LogoutReason, SessionData, SessionManager, SessionObserver};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use store::{FileStore, KeyValueStore, KeyringStore, MemoryStore, StoreError};

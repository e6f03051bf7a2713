//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionManager`: the login/logout state machine with expiry auto-logout
//! - `SessionData`: the token, user id and absolute expiry, plus how they are
//!   laid out in a `KeyValueStore`
//! - `ExpiryTimer`: the single one-shot timer behind auto-logout
//!
//! Tokens carry an absolute expiry from the server; the session ends by
//! itself when it passes.

pub mod manager;
pub mod session;
pub mod timer;

pub use manager::{SessionManager, SessionManagerBuilder, SessionObserver};
pub use session::{AuthStatus, LogoutReason, SessionData};
pub use timer::ExpiryTimer;

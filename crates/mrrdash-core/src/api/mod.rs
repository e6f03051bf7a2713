//! REST client for the dashboard's authentication endpoints.
//!
//! `AuthClient` posts credentials to `/api/v1/login` or `/api/v1/signup` and
//! turns the response into an `AuthGrant` (token, user id, absolute expiry).
//! The session manager depends on the `AuthService` trait rather than the
//! concrete client so it can be driven without a server.

pub mod client;
pub mod error;

pub use client::{AuthClient, AuthGrant, AuthMode, AuthService, Credentials};
pub use error::AuthError;

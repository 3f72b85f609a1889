//! API trait definitions split by responsibility
//!
//! - [`AuthApi`] - sign-in, registration, password and access checks
//! - [`ProfileApi`] - the signed-in user's own profile
//! - [`AdminApi`] - user, list and access-mode administration
//!
//! [`ApiClient`](super::ApiClient) implements all three.

mod admin;
mod auth;
mod profile;

pub use admin::{AccessList, AdminApi};
pub use auth::AuthApi;
pub use profile::ProfileApi;

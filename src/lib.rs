//! Portal - session-management client and CLI for the auth portal API
//!
//! The library keeps one authenticated session per "window" (a browser tab,
//! or one `portal` process), refreshes the short-lived access token behind a
//! single-flight gate, and keeps windows that share a store in agreement
//! about who is signed in.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod output;
pub mod session;
pub mod store;
pub mod validation;

pub use client::{ApiClient, PortalApi};
pub use error::{ApiError, Error, Result};
pub use session::{Session, SessionController, SessionState};

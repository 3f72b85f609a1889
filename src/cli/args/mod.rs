//! Shared CLI argument types
//!
//! Reusable argument structs that can be flattened into commands using
//! `#[command(flatten)]`.

mod common;
mod global;

pub use common::{OutputFormat, PasswordArgs};
pub use global::GlobalOptions;

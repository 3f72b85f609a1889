//! Display models for CLI output
//!
//! Display models turn API responses and session state into the rows and
//! records the CLI prints.

pub mod display;

pub use display::{
    AccessModeDisplay, EntryDisplay, MessageDisplay, ProfileDisplay, StatusDisplay, UserDisplay,
};

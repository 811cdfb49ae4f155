//! Core client logic shared by every command.

pub mod agentos;
pub mod auth;
mod error;
pub mod http;
pub mod keychain;
pub mod notes;
pub mod secret;
pub mod session;
pub mod stream;

pub use error::{Error, Result};

/// Generate a new message id.
#[must_use]
pub fn new_message_id() -> String {
    format!("msg_{}", ulid::Ulid::new())
}

//! Helpdesk CLI - terminal client for the AgentOS helpdesk and Supabase notes.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                     CLI                       │
//! └───────────────┬───────────────────────────────┘
//!                 │
//!         ┌───────┴────────┐        ┌────────────┐
//!         │  ChatSession   │        │   Notes    │
//!         └───────┬────────┘        └─────┬──────┘
//!                 │                       │
//!   ┌─────────────┴──────────────┐  ┌─────┴──────┐
//!   │ decoder → reducer (stream) │  │  Supabase  │
//!   └─────────────┬──────────────┘  │ auth/REST  │
//!                 │                 └────────────┘
//!         ┌───────┴────────┐
//!         │ AgentOS client │
//!         └────────────────┘
//! ```

pub mod build_info;
pub mod cli;
pub mod config;
pub mod core;

pub use config::Config;
pub use core::session::{ChatMessage, ChatSession, ExchangeOutcome};

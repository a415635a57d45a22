//! # Vellum Common Library
//!
//! Shared code for the Vellum moderation services including:
//! - Moderation record models (submissions, community reports, audit records)
//! - Database initialization and schema migrations
//! - Change-notification events (ModerationEvent enum) and the EventBus
//! - Configuration loading
//! - Utility functions

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use events::{EventBus, ModerationEvent};

//! Moderation record models and database setup

pub mod models;

#[cfg(feature = "sqlx")]
pub mod init;
#[cfg(feature = "sqlx")]
pub mod migrations;

#[cfg(feature = "sqlx")]
pub use init::*;
pub use models::*;

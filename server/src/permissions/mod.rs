//! Permission Table
//!
//! Maps moderation actions to the minimum effective rank allowed to perform
//! them. Each community can override the static defaults and switch feature
//! modules off.

pub mod actions;
pub mod modules;
pub mod table;

pub use actions::ModerationAction;
pub use modules::{ModuleToggles, ANTISPAM};
pub use table::{PermissionTable, Threshold};

use crate::db::GatewayError;

/// Permission table errors.
#[derive(Debug, thiserror::Error)]
pub enum PermissionError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Minimum rank {0} is outside the 0-5 scale")]
    InvalidThreshold(i64),

    #[error("Invalid module id: {0}")]
    InvalidModule(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

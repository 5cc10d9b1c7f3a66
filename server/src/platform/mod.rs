//! Live Platform Roles
//!
//! The chat platform is the authority on who owns or administers a
//! community. Lookups that fail are reported as [`PlatformRole::Unknown`] by
//! callers, never as an ordinary member.

pub mod telegram;

use async_trait::async_trait;
use serde::Serialize;

pub use telegram::TelegramRoles;

/// Role of an identity in a community as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformRole {
    Member,
    Administrator,
    Owner,
    Restricted,
    Left,
    /// The platform could not be asked or gave an answer we do not understand.
    Unknown,
}

/// Platform lookup failures.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Platform request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Platform rejected request: {0}")]
    Rejected(String),

    #[error("Unrecognised member status: {0}")]
    UnknownStatus(String),
}

/// Source of live platform roles.
#[async_trait]
pub trait PlatformRoles: Send + Sync {
    /// Role of `identity_id` in `community_id`.
    async fn member_role(
        &self,
        community_id: i64,
        identity_id: i64,
    ) -> Result<PlatformRole, PlatformError>;
}

/// Platform stand-in for deployments without a bot token.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflinePlatform;

#[async_trait]
impl PlatformRoles for OfflinePlatform {
    async fn member_role(
        &self,
        _community_id: i64,
        _identity_id: i64,
    ) -> Result<PlatformRole, PlatformError> {
        Ok(PlatformRole::Unknown)
    }
}

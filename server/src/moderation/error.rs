//! Moderation Error Types

use crate::db::GatewayError;

#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error("Expiry must be in the future")]
    ExpiryInPast,

    #[error("Invalid reason: {0}")]
    InvalidReason(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ModerationError {
    /// Whether the caller supplied bad input (as opposed to a store failure).
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::ExpiryInPast | Self::InvalidReason(_))
    }
}

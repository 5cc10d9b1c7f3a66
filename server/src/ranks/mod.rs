//! Rank System
//!
//! Layered rank model:
//! - Global owner from configuration
//! - Live platform role (owner, administrator)
//! - Stored per-community rank
//!
//! The resolver is read-only; the companion mutators validate and upsert
//! community membership rows.

pub mod hierarchy;
pub mod names;
pub mod queries;
pub mod rank;
pub mod resolver;

pub use hierarchy::{dominates, may_grant, HierarchyGuard};
pub use names::{default_name, GrammaticalCase, RankNames};
pub use rank::{Rank, RankOutOfRange};
pub use resolver::{effective_rank, RankResolver, RankSource, ResolvedRank};

use crate::db::GatewayError;

/// Rank operation errors.
#[derive(Debug, thiserror::Error)]
pub enum RankError {
    #[error("Rank {0} is outside the 0-5 scale")]
    OutOfRange(i64),

    #[error("Rank {0} cannot be assigned (allowed: 1-5)")]
    NotAssignable(i64),

    #[error("Invalid rank name: {0}")]
    InvalidName(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl From<RankOutOfRange> for RankError {
    fn from(err: RankOutOfRange) -> Self {
        Self::OutOfRange(err.0)
    }
}

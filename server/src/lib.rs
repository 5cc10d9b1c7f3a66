//! Bailiff Server
//!
//! Rank resolution, hierarchy checks, permission thresholds and moderation
//! ledgers for a group-chat moderation bot. Every durable read and write goes
//! through the retrying [`db::Gateway`].

pub mod activity;
pub mod api;
pub mod config;
pub mod db;
pub mod moderation;
pub mod permissions;
pub mod platform;
pub mod ranks;

//! Per-community feature modules.
//!
//! Communities can switch named modules off. Only disabled ids are stored;
//! every module is enabled until a community turns it off.

use std::collections::BTreeSet;

use tracing::info;

use super::PermissionError;
use crate::db::{Gateway, GatewayError};

/// Module that gates the global denylist check.
pub const ANTISPAM: &str = "antispam";

const MAX_MODULE_ID_CHARS: usize = 32;

/// Accept lowercase ASCII ids such as `antispam` or `rank_names`.
pub fn validate_module_id(module_id: &str) -> Result<(), PermissionError> {
    let valid = !module_id.is_empty()
        && module_id.len() <= MAX_MODULE_ID_CHARS
        && module_id
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(PermissionError::InvalidModule(module_id.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct ModuleToggles {
    gateway: Gateway,
}

impl ModuleToggles {
    #[must_use]
    pub const fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Modules switched off in `community_id`.
    pub async fn disabled(&self, community_id: i64) -> Result<BTreeSet<String>, GatewayError> {
        let disabled: Option<Vec<String>> = self
            .gateway
            .run("modules_disabled", |pool| async move {
                sqlx::query_scalar("SELECT disabled FROM community_modules WHERE community_id = $1")
                    .bind(community_id)
                    .fetch_optional(&pool)
                    .await
            })
            .await?;

        Ok(disabled.unwrap_or_default().into_iter().collect())
    }

    pub async fn is_enabled(&self, community_id: i64, module_id: &str) -> Result<bool, GatewayError> {
        Ok(!self.disabled(community_id).await?.contains(module_id))
    }

    /// Switch a module on or off. Repeating a toggle is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn set_enabled(
        &self,
        community_id: i64,
        module_id: &str,
        enabled: bool,
    ) -> Result<(), PermissionError> {
        validate_module_id(module_id)?;

        self.gateway
            .run("modules_toggle", |pool| async move {
                let query = if enabled {
                    sqlx::query(
                        r"
                        UPDATE community_modules
                        SET disabled = array_remove(disabled, $2), updated_at = NOW()
                        WHERE community_id = $1
                        ",
                    )
                } else {
                    sqlx::query(
                        r"
                        INSERT INTO community_modules (community_id, disabled)
                        VALUES ($1, ARRAY[$2])
                        ON CONFLICT (community_id) DO UPDATE
                        SET disabled = CASE
                                WHEN $2 = ANY(community_modules.disabled) THEN community_modules.disabled
                                ELSE array_append(community_modules.disabled, $2)
                            END,
                            updated_at = NOW()
                        ",
                    )
                };
                query
                    .bind(community_id)
                    .bind(module_id)
                    .execute(&pool)
                    .await
            })
            .await?;

        info!(community_id, module_id, enabled, "Module toggled");
        Ok(())
    }
}

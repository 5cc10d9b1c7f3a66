//! API Router and Application State
//!
//! Internal JSON API used by the bot's command handlers.

pub mod activity;
pub mod error;
pub mod moderation;
pub mod permissions;
pub mod ranks;

pub use error::ApiError;

use axum::{
    extract::State,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::{
    activity::ActivityCoalescer,
    config::Config,
    db::Gateway,
    moderation::{Denylist, RestrictionLedger, WarningLedger},
    permissions::{ModuleToggles, PermissionTable},
    platform::PlatformRoles,
    ranks::{HierarchyGuard, RankResolver},
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Effective rank resolution and rank writes
    pub resolver: Arc<RankResolver>,
    pub guard: HierarchyGuard,
    pub permissions: PermissionTable,
    /// Per-community feature switches
    pub modules: ModuleToggles,
    pub restrictions: RestrictionLedger,
    pub warnings: WarningLedger,
    /// Global denylist with its in-process cache
    pub denylist: Arc<Denylist>,
    /// Activity coalescer; one per process
    pub activity: Arc<ActivityCoalescer>,
}

impl AppState {
    /// Wire every component onto one gateway.
    #[must_use]
    pub fn new(db: PgPool, config: Config, platform: Arc<dyn PlatformRoles>) -> Self {
        let gateway = Gateway::new(db, config.retry_policy());
        let resolver = Arc::new(RankResolver::new(
            gateway.clone(),
            platform,
            config.global_owner_id,
        ));

        Self {
            guard: HierarchyGuard::new(Arc::clone(&resolver)),
            resolver,
            permissions: PermissionTable::new(gateway.clone()),
            modules: ModuleToggles::new(gateway.clone()),
            restrictions: RestrictionLedger::new(gateway.clone()),
            warnings: WarningLedger::new(gateway.clone()),
            denylist: Arc::new(Denylist::new(gateway.clone(), config.denylist_cache_ttl())),
            activity: Arc::new(ActivityCoalescer::new(gateway, config.activity_window())),
            config: Arc::new(config),
        }
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let community_routes = Router::new()
        // Ranks
        .route("/ranks", get(ranks::list_ranked))
        .route(
            "/members/{identity_id}/rank",
            get(ranks::get_rank).put(ranks::set_rank),
        )
        .route(
            "/rank-names/{rank}",
            get(ranks::get_rank_name)
                .put(ranks::set_rank_name)
                .delete(ranks::clear_rank_name),
        )
        .route("/hierarchy", get(ranks::can_modify))
        // Permission thresholds
        .route("/permissions", get(permissions::list_thresholds))
        .route(
            "/permissions/{action}",
            get(permissions::required_rank).put(permissions::set_override),
        )
        .route(
            "/permissions/{action}/check",
            get(permissions::check_action),
        )
        // Feature modules
        .route("/modules", get(permissions::list_disabled_modules))
        .route("/modules/{module}", put(permissions::set_module))
        // Denylist screening, gated by the antispam module
        .route("/denylist/{identity_id}", get(moderation::screen_member))
        // Restrictions
        .route(
            "/restrictions/{kind}/{identity_id}",
            get(moderation::restriction_status)
                .put(moderation::set_restriction)
                .delete(moderation::clear_restriction),
        )
        // Warnings
        .route(
            "/members/{identity_id}/warnings",
            get(moderation::list_warnings)
                .post(moderation::add_warning)
                .delete(moderation::clear_warnings),
        )
        .route(
            "/members/{identity_id}/warnings/latest",
            delete(moderation::remove_latest_warning),
        )
        .route(
            "/members/{identity_id}/warnings/{position}",
            delete(moderation::remove_warning_at),
        );

    Router::new()
        // Health check
        .route("/health", get(health_check))
        .nest("/api/communities/{community_id}", community_routes)
        .route(
            "/api/activity/{identity_id}",
            post(activity::mark_active).get(activity::get_activity),
        )
        .route(
            "/api/denylist/{identity_id}",
            get(moderation::denylist_contains)
                .put(moderation::denylist_add)
                .delete(moderation::denylist_remove),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    /// Whether live platform roles are consulted
    platform: bool,
    /// Identities held by the activity coalescer
    tracked_activity: usize,
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        platform: state.config.has_platform(),
        tracked_activity: state.activity.tracked(),
    })
}

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, AvatarService, JwtTokenIssuer, MemberService, SeaOrmAuthService,
    SeaOrmMemberService,
};

pub mod auth;
mod error;
mod members;
mod observability;
mod system;
mod types;
mod upload;
mod users;
mod validation;

pub use error::ApiError;
pub use types::*;
pub use validation::Pagination;

use metrics_exporter_prometheus::PrometheusHandle;

/// Headroom over the avatar ceiling for multipart framing.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,

    pub config: Arc<Config>,

    pub auth_service: Arc<dyn AuthService>,

    pub member_service: Arc<dyn MemberService>,

    pub avatar_service: Arc<AvatarService>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn auth_service(&self) -> &dyn AuthService {
        self.auth_service.as_ref()
    }

    #[must_use]
    pub fn member_service(&self) -> &dyn MemberService {
        self.member_service.as_ref()
    }

    #[must_use]
    pub fn avatar_service(&self) -> &AvatarService {
        &self.avatar_service
    }
}

pub fn create_app_state(
    config: Config,
    store: Store,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let tokens = Arc::new(JwtTokenIssuer::from_config(&config.security)?);

    let auth_service: Arc<dyn AuthService> = Arc::new(SeaOrmAuthService::new(
        store.clone(),
        tokens,
        config.security.clone(),
    ));
    let member_service: Arc<dyn MemberService> =
        Arc::new(SeaOrmMemberService::new(store.clone()));
    let avatar_service = Arc::new(AvatarService::new(store.clone(), &config.uploads));

    Ok(Arc::new(AppState {
        store,
        config: Arc::new(config),
        auth_service,
        member_service,
        avatar_service,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    }))
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;
    create_app_state(config, store, prometheus_handle)
}

pub fn router(state: Arc<AppState>) -> Router {
    let upload_dir = state.config().uploads.upload_dir.clone();
    let cors_layer = cors_layer(&state.config().server.cors_allowed_origins);

    let api_router = Router::new()
        .merge(create_public_router())
        .merge(create_authenticated_router(state.clone()))
        .merge(create_admin_router(state.clone()))
        .with_state(state.clone());

    let mut service_routes = Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health));
    if state.prometheus_handle.is_some() {
        service_routes = service_routes.route("/metrics", get(observability::get_metrics));
    }

    service_routes
        .with_state(state)
        .nest("/api", api_router)
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .layer(cors_layer)
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn create_public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(users::register))
        .route("/users/register", post(users::register))
        .route("/users/token", post(users::login))
        .route(
            "/users/{id}",
            put(users::update_user).delete(users::delete_user),
        )
        .route(
            "/members",
            get(members::list_members).post(members::create_member),
        )
        .route(
            "/members/{id}",
            get(members::get_member)
                .put(members::update_member)
                .delete(members::delete_member),
        )
        .route(
            "/members/user/{user_id}",
            get(members::get_member_by_user).put(members::update_member_by_user),
        )
}

fn create_authenticated_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let avatar_body_limit = state.config().uploads.max_avatar_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/users/me", get(users::get_current_user))
        .route(
            "/users/profile",
            get(users::get_current_user).put(users::update_current_user),
        )
        .route("/members/profile", put(members::update_own_member))
        .route(
            "/upload/avatar",
            post(upload::upload_avatar).layer(DefaultBodyLimit::max(avatar_body_limit)),
        )
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}

fn create_admin_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/admin/all", get(users::list_users))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::admin_middleware,
        ))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins.iter().filter_map(|s| s.parse().ok()).collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
}

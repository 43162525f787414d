use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::services::{AuthService, OccupancyService};
use crate::state::SharedState;

mod assets;
pub mod auth;
pub mod dashboard;
mod error;
mod form;
pub mod machines;
mod observability;
pub mod pages;
pub mod session;
pub mod toast;
pub mod users;

pub use error::WebError;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        self.shared.config()
    }

    #[must_use]
    pub fn occupancy(&self) -> &Arc<dyn OccupancyService> {
        &self.shared.occupancy
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        prometheus_handle,
    })
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let protected_routes = create_protected_router(state.clone());

    let public_routes = Router::new()
        .route("/", get(auth::home))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/metrics", get(observability::get_metrics))
        .route("/static/{*path}", get(assets::serve_asset));

    let cors_layer = if cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(dashboard::dashboard))
        .route("/partials/machines", get(dashboard::machines_partial))
        .route("/partials/logs", get(dashboard::logs_partial))
        .route("/book", post(machines::book))
        .route("/assign/free", post(machines::assign_free))
        .route("/assign/contribute", post(machines::assign_contribute))
        .route("/self/contribute", post(machines::self_contribute))
        .route("/release/main", post(machines::release_main))
        .route("/release/contrib", post(machines::release_contrib))
        .route("/add/system", post(machines::add_system))
        .route("/remove/system", post(machines::remove_system))
        .route("/promote", post(users::promote))
        .route_layer(middleware::from_fn_with_state(
            state,
            session::require_user,
        ))
}

pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;
pub mod types;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue},
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::warn;

use crate::config::SecurityConfig;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, rate_limit_middleware};
use crate::state::AppState;

/// Full HTTP surface. Serve with
/// `into_make_service_with_connect_info::<SocketAddr>()` so the rate limiter
/// can see client addresses.
pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(he_routes())
        .merge(exmr_routes())
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    let security_headers = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("no-referrer"),
        ));

    let router = Router::new()
        // Public
        .route("/", get(public::root::index))
        .route("/health", get(public::root::health))
        .merge(auth_public_routes())
        // Protected
        .merge(protected_routes)
        // Global middleware
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(security_headers)
        .layer(cors_layer(&state.config.security));

    let router = if state.config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/api/auth/login", post(auth::login_post))
        .route("/api/auth/logout", post(auth::logout_post))
}

fn auth_routes() -> Router<AppState> {
    use protected::auth;

    Router::new()
        .route("/api/auth/register", post(auth::register_post))
        .route("/api/auth/profile", get(auth::profile_get))
        .route("/api/auth/users", get(auth::users_get))
}

fn user_routes() -> Router<AppState> {
    use protected::auth;

    Router::new()
        .route("/api/users/profile", get(auth::profile_get))
        .route("/api/users/users", get(auth::users_get))
}

fn he_routes() -> Router<AppState> {
    use protected::hes;

    Router::new()
        .route("/api/hes/add", post(hes::he_add))
        .route("/api/hes/:he_code/update", put(hes::he_update))
        .route("/api/hes/:he_code/delete", delete(hes::he_delete))
        .route("/api/hes/search", get(hes::he_search))
}

fn exmr_routes() -> Router<AppState> {
    use protected::exmrs;

    Router::new()
        .route("/api/exmrs/add", post(exmrs::exmr_add))
        .route("/api/exmrs/:exmr_code/update", put(exmrs::exmr_update))
        .route("/api/exmrs/:exmr_code/delete", delete(exmrs::exmr_delete))
        .route("/api/exmrs/:exmr_code/transfer", put(exmrs::exmr_transfer))
        .route("/api/exmrs/search", get(exmrs::exmr_search))
}

/// Permissive when no origins are listed (or `*` is), otherwise an allow-list.
/// Disabled CORS emits no CORS headers at all.
fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

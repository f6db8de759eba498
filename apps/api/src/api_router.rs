use axum::Router;
use axum::http::HeaderValue;
use axum::http::header::CONTENT_TYPE;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::PostgresStore;

use shellforge_core::AppError;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(
    app_state: AppState,
    frontend_url: &str,
    session_layer: SessionManagerLayer<PostgresStore>,
) -> Result<Router, AppError> {
    let admin_routes = Router::new()
        .route(
            "/api/admin/rate-limits/active",
            get(handlers::admin::active_rate_limits_handler),
        )
        .route(
            "/api/admin/rate-limits/history",
            get(handlers::admin::rate_limit_history_handler),
        )
        .route(
            "/api/admin/rate-limits/users/{user_id}",
            get(handlers::admin::rate_limits_for_user_handler),
        )
        .route(
            "/api/admin/rate-limits/users/{user_id}/reset",
            post(handlers::admin::reset_rate_limit_handler),
        )
        .route_layer(from_fn(middleware::require_admin))
        .route_layer(from_fn(middleware::require_auth));

    let protected_routes = Router::new()
        .route("/auth/me", get(handlers::auth::me_handler))
        .route_layer(from_fn(middleware::require_auth));

    let cors_layer = build_cors_layer(frontend_url)?;

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route("/auth/register", post(handlers::auth::register_handler))
        .route("/auth/login", post(handlers::auth::login_handler))
        .route("/auth/logout", post(handlers::auth::logout_handler))
        .route(
            "/snippets/{snippet_id}/like",
            post(handlers::likes::like_snippet_handler),
        )
        .merge(protected_routes)
        .merge(admin_routes)
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_same_origin_for_mutations,
        ))
        .layer(session_layer)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state))
}

fn build_cors_layer(frontend_url: &str) -> Result<CorsLayer, AppError> {
    use axum::http::Method;

    Ok(CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]))
}

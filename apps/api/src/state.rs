use shellforge_application::{RateLimitService, UserService};
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub rate_limit_service: RateLimitService,
    pub pool: PgPool,
    pub frontend_url: String,
}

//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod argon2_password_hasher;
mod http_geo_lookup;
mod in_memory_rate_limit_store;
mod postgres_rate_limit_event_repository;
mod postgres_rate_limit_store;
mod postgres_user_repository;
mod redis_rate_limit_store;

pub use argon2_password_hasher::Argon2PasswordHasher;
pub use http_geo_lookup::HttpGeoLookup;
pub use in_memory_rate_limit_store::InMemoryRateLimitStore;
pub use postgres_rate_limit_event_repository::PostgresRateLimitEventRepository;
pub use postgres_rate_limit_store::PostgresRateLimitStore;
pub use postgres_user_repository::PostgresUserRepository;
pub use redis_rate_limit_store::RedisRateLimitStore;

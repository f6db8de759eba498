//! User domain types and validation rules.
//!
//! Follows OWASP Authentication and Password Storage cheat sheets for email
//! validation and credential handling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shellforge_core::{AppError, AppResult};
use uuid::Uuid;

/// Unique identifier for a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Performs basic structural validation: non-empty, contains exactly one
    /// `@`, local part and domain are non-empty, domain contains at least one
    /// `.`, total length at most 254 characters.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_lowercase();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let parts: Vec<&str> = trimmed.splitn(2, '@').collect();
        if parts.len() != 2 {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        }

        let local = parts[0];
        let domain = parts[1];

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if domain.is_empty() || !domain.contains('.') {
            return Err(AppError::Validation(
                "email domain must contain at least one '.'".to_owned(),
            ));
        }

        if trimmed.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(trimmed))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Persisted user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier.
    pub id: UserId,
    /// Validated email address, unique across accounts.
    pub email: EmailAddress,
    /// Display name shown in the builder UI.
    pub display_name: String,
    /// Argon2 hash; `None` for accounts created through OAuth only.
    pub password_hash: Option<String>,
    /// Whether the user may call admin endpoints.
    pub is_admin: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::EmailAddress;

    #[test]
    fn accepts_well_formed_address_and_lowercases() {
        let email = EmailAddress::new(" Alice@Example.COM ");
        assert!(email.is_ok_and(|email| email.as_str() == "alice@example.com"));
    }

    #[test]
    fn rejects_missing_at_sign() {
        assert!(EmailAddress::new("alice.example.com").is_err());
    }

    #[test]
    fn rejects_dotless_domain() {
        assert!(EmailAddress::new("alice@localhost").is_err());
    }

    proptest! {
        #[test]
        fn never_panics_and_validated_addresses_contain_at(input in ".{0,300}") {
            if let Ok(email) = EmailAddress::new(input) {
                prop_assert!(email.as_str().contains('@'));
                prop_assert!(email.as_str().len() <= 254);
            }
        }
    }
}

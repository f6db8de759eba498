//! Email/password account service.
//!
//! Fallback path next to the external OAuth login. Follows the OWASP
//! Authentication cheat sheet: generic failure outcomes to prevent account
//! enumeration, and a dummy hash on unknown emails to level response timing.

use std::sync::Arc;

use async_trait::async_trait;

use shellforge_core::{AppError, AppResult};
use shellforge_domain::{EmailAddress, User, UserId};

/// Minimum accepted password length (OWASP: length over composition rules).
const MIN_PASSWORD_LENGTH: usize = 12;
/// Maximum accepted password length, bounding hash cost.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Repository port for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a user by validated email.
    async fn find_by_email(&self, email: &EmailAddress) -> AppResult<Option<User>>;

    /// Finds a user by id.
    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<User>>;

    /// Inserts a new user. Fails with a conflict when the email is taken.
    async fn insert_user(&self, user: &User) -> AppResult<()>;
}

/// Port for password hashing and verification.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password for storage.
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verifies a plaintext password against a stored hash.
    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;
}

/// Parameters for email/password registration.
#[derive(Debug, Clone)]
pub struct RegisterParams {
    /// Raw email input; validated inside `register`.
    pub email: String,
    /// Plaintext password; hashed inside `register`.
    pub password: String,
    /// Display name shown in the builder UI.
    pub display_name: String,
}

/// Result of an authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Credentials matched; carries the account.
    Authenticated(Box<User>),
    /// Generic failure: unknown email, wrong password, or passkey-only
    /// account. Deliberately indistinguishable to the caller.
    Failed,
}

/// Application service for account registration and login.
#[derive(Clone)]
pub struct UserService {
    user_repository: Arc<dyn UserRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    /// Creates the service from its ports.
    #[must_use]
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            user_repository,
            password_hasher,
        }
    }

    /// Creates a new account with email and password.
    pub async fn register(&self, params: RegisterParams) -> AppResult<UserId> {
        let email = EmailAddress::new(params.email)?;
        validate_password(&params.password)?;

        let display_name = params.display_name.trim();
        if display_name.is_empty() {
            return Err(AppError::Validation(
                "display name must not be empty".to_owned(),
            ));
        }

        if self.user_repository.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(
                "an account with this email already exists".to_owned(),
            ));
        }

        let user = User {
            id: UserId::new(),
            email,
            display_name: display_name.to_owned(),
            password_hash: Some(self.password_hasher.hash_password(&params.password)?),
            is_admin: false,
            created_at: chrono::Utc::now(),
        };

        self.user_repository.insert_user(&user).await?;
        Ok(user.id)
    }

    /// Authenticates a user with email and password.
    ///
    /// Returns `AuthOutcome::Failed` with no detail for any failure mode.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthOutcome> {
        let Ok(email) = EmailAddress::new(email) else {
            let _ = self.password_hasher.hash_password(password);
            return Ok(AuthOutcome::Failed);
        };

        let Some(user) = self.user_repository.find_by_email(&email).await? else {
            // Always hash to prevent timing-based enumeration.
            let _ = self.password_hasher.hash_password(password);
            return Ok(AuthOutcome::Failed);
        };

        let Some(ref stored_hash) = user.password_hash else {
            // OAuth-only account trying password login.
            let _ = self.password_hasher.hash_password(password);
            return Ok(AuthOutcome::Failed);
        };

        if !self.password_hasher.verify_password(password, stored_hash)? {
            return Ok(AuthOutcome::Failed);
        }

        Ok(AuthOutcome::Authenticated(Box::new(user)))
    }

    /// Loads a user by id.
    pub async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<User>> {
        self.user_repository.find_by_id(user_id).await
    }
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "password must not exceed {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use shellforge_core::{AppError, AppResult};
    use shellforge_domain::{EmailAddress, User, UserId};

    use super::{AuthOutcome, PasswordHasher, RegisterParams, UserRepository, UserService};

    #[derive(Default)]
    struct TestUserRepo {
        users: Mutex<HashMap<String, User>>,
    }

    #[async_trait]
    impl UserRepository for TestUserRepo {
        async fn find_by_email(&self, email: &EmailAddress) -> AppResult<Option<User>> {
            Ok(self
                .users
                .lock()
                .ok()
                .and_then(|users| users.get(email.as_str()).cloned()))
        }

        async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<User>> {
            Ok(self
                .users
                .lock()
                .ok()
                .and_then(|users| users.values().find(|user| user.id == user_id).cloned()))
        }

        async fn insert_user(&self, user: &User) -> AppResult<()> {
            self.users
                .lock()
                .map_err(|error| {
                    AppError::Internal(format!("failed to lock repo state: {error}"))
                })?
                .insert(user.email.as_str().to_owned(), user.clone());
            Ok(())
        }
    }

    /// Reversible stand-in for Argon2 so tests stay fast.
    struct TestHasher;

    impl PasswordHasher for TestHasher {
        fn hash_password(&self, password: &str) -> AppResult<String> {
            Ok(format!("hashed:{password}"))
        }

        fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
            Ok(hash == format!("hashed:{password}"))
        }
    }

    fn service() -> (UserService, Arc<TestUserRepo>) {
        let repo = Arc::new(TestUserRepo::default());
        (UserService::new(repo.clone(), Arc::new(TestHasher)), repo)
    }

    fn register_params() -> RegisterParams {
        RegisterParams {
            email: "alice@example.com".to_owned(),
            password: "correct-horse-battery".to_owned(),
            display_name: "Alice".to_owned(),
        }
    }

    #[tokio::test]
    async fn register_then_login_succeeds() -> AppResult<()> {
        let (service, _repo) = service();
        let user_id = service.register(register_params()).await?;

        let outcome = service
            .login("alice@example.com", "correct-horse-battery")
            .await?;

        match outcome {
            AuthOutcome::Authenticated(user) => assert_eq!(user.id, user_id),
            AuthOutcome::Failed => panic!("expected successful login"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn register_rejects_short_passwords() {
        let (service, _repo) = service();
        let result = service
            .register(RegisterParams {
                password: "short".to_owned(),
                ..register_params()
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() -> AppResult<()> {
        let (service, _repo) = service();
        service.register(register_params()).await?;

        let result = service.register(register_params()).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        Ok(())
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_fail_identically() -> AppResult<()> {
        let (service, _repo) = service();
        service.register(register_params()).await?;

        let wrong_password = service.login("alice@example.com", "not-the-password").await?;
        let unknown_email = service.login("mallory@example.com", "whatever-here").await?;

        assert_eq!(wrong_password, AuthOutcome::Failed);
        assert_eq!(unknown_email, AuthOutcome::Failed);
        Ok(())
    }
}

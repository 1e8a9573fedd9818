//! Authentication service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{CreateUser, User, UserClaims},
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate by username/password and return a JWT token
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }

        let token = self.create_token(&user)?;
        Ok((token, user))
    }

    /// Register a new member account
    pub async fn signup(&self, request: CreateUser) -> AppResult<User> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if request.password != request.confirm_password {
            return Err(AppError::Validation("Passwords do not match".to_string()));
        }

        if self.repository.users.username_exists(&request.username).await? {
            return Err(AppError::Validation(
                "Username already exists. Please choose a different one".to_string(),
            ));
        }

        let password_hash = self.hash_password(&request.password)?;

        let user = self
            .repository
            .users
            .create(&request.username, &password_hash, &request.full_name, false)
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, "account created");
        Ok(user)
    }

    /// Get the authenticated user's own profile
    pub async fn me(&self, user_id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(user_id).await
    }

    /// Seed the default administrator account on first start
    pub async fn ensure_default_admin(&self) -> AppResult<()> {
        if self.repository.users.get_by_username("admin").await?.is_some() {
            return Ok(());
        }

        let password_hash = self.hash_password("admin123")?;
        self.repository
            .users
            .create("admin", &password_hash, "Admin User", true)
            .await?;

        tracing::warn!("created default admin account (admin/admin123), change the password");
        Ok(())
    }

    /// Create a JWT token for a user
    pub fn create_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            is_admin: user.is_admin,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(&user.password_hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

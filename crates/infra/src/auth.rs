use std::sync::Arc;

use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use backoffice_domain::admin::{Admin, AdminRole, AdminSummary};
use backoffice_domain::error::DomainError;
use backoffice_domain::ports::admin::AdminRepository;
use backoffice_domain::util::{now_ms, uuid_v7_without_dashes};

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredential,
    #[error("account is deactivated")]
    Inactive,
    #[error("an admin account already exists")]
    AlreadyInitialized,
    #[error("credential processing failed")]
    Credential,
    #[error("storage error: {0}")]
    Storage(String),
}

/// Bearer-token claims. `sub` is the admin id; `role` round-trips through
/// [`AdminRole::parse`] on the way back in.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub admin: AdminSummary,
}

/// Credential verification and token issuance over the admin store.
#[derive(Clone)]
pub struct AuthService {
    admins: Arc<dyn AdminRepository>,
    jwt_secret: String,
    token_ttl_days: i64,
}

impl AuthService {
    pub fn new(
        admins: Arc<dyn AdminRepository>,
        jwt_secret: impl Into<String>,
        token_ttl_days: i64,
    ) -> Self {
        Self {
            admins,
            jwt_secret: jwt_secret.into(),
            token_ttl_days,
        }
    }

    /// Verifies the password before the active flag, so a deactivated
    /// account with the right password gets the distinct "deactivated"
    /// outcome while wrong credentials never reveal account state.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let admin = self
            .admins
            .find_by_email(email.trim())
            .await
            .map_err(storage_error)?
            .ok_or(AuthError::InvalidCredential)?;

        let matches = bcrypt::verify(password, &admin.password_hash)
            .map_err(|_| AuthError::InvalidCredential)?;
        if !matches {
            return Err(AuthError::InvalidCredential);
        }
        if !admin.is_active {
            return Err(AuthError::Inactive);
        }

        self.admins
            .update_last_login(&admin.id, now_ms())
            .await
            .map_err(storage_error)?;

        let token = self.issue_token(&admin)?;
        Ok(LoginOutcome {
            token,
            admin: AdminSummary::from(&admin),
        })
    }

    /// Creates the first admin account. Refused once any account exists.
    pub async fn bootstrap(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Admin, AuthError> {
        if self.admins.any_exists().await.map_err(storage_error)? {
            return Err(AuthError::AlreadyInitialized);
        }
        let password_hash =
            bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|_| AuthError::Credential)?;
        let admin = Admin {
            id: uuid_v7_without_dashes(),
            email: email.trim().to_string(),
            password_hash,
            name: name.trim().to_string(),
            role: AdminRole::SuperAdmin,
            is_active: true,
            last_login_at_ms: None,
            created_at_ms: now_ms(),
        };
        self.admins.create(&admin).await.map_err(storage_error)
    }

    fn issue_token(&self, admin: &Admin) -> Result<String, AuthError> {
        let exp = now_ms() / 1_000 + self.token_ttl_days * SECONDS_PER_DAY;
        let claims = Claims {
            sub: admin.id.clone(),
            email: admin.email.clone(),
            name: admin.name.clone(),
            role: admin.role.as_str().to_string(),
            exp: exp as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|_| AuthError::Credential)
    }
}

fn storage_error(err: DomainError) -> AuthError {
    AuthError::Storage(err.to_string())
}

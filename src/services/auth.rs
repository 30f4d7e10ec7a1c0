// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, User},
    services::{
        email_service::{generate_reset_code, ResetCodeMailer},
        fingerprint::DeviceMetadata,
        session_service::SessionService,
    },
};

// Work factor for bcrypt (DEFAULT_COST = 12).
const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

const TOKEN_TTL_DAYS: i64 = 7;
const RESET_CODE_TTL_MINUTES: i64 = 15;

/// Signs `{ sub, email, name }` with the server secret, 7-day expiry.
pub fn mint_token(jwt_secret: &str, user: &User) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        iat: now.timestamp() as usize,
        exp: (now + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )?)
}

/// Verifies signature and expiry, distinguishing the two failure modes.
pub fn decode_token(jwt_secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

/// Constant-time-safe comparison; a malformed hash counts as a mismatch
/// instead of an error.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    verify(password, password_hash).unwrap_or(false)
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    sessions: SessionService,
    mailer: Arc<dyn ResetCodeMailer>,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        sessions: SessionService,
        mailer: Arc<dyn ResetCodeMailer>,
        jwt_secret: String,
    ) -> Self {
        Self {
            user_repo,
            sessions,
            mailer,
            jwt_secret,
        }
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        decode_token(&self.jwt_secret, token)
    }

    // bcrypt is CPU-bound, so it runs off the async workers.
    async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let password = password.to_owned();
        let hashed = tokio::task::spawn_blocking(move || hash(&password, BCRYPT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Hashing task failed: {}", e))??;
        Ok(hashed)
    }

    async fn check_password(&self, password: &str, password_hash: &str) -> Result<bool, AppError> {
        let password = password.to_owned();
        let password_hash = password_hash.to_owned();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
            .await
            .map_err(|e| anyhow::anyhow!("Password verification task failed: {}", e))?;
        Ok(valid)
    }

    /// Creates the account, mints a token, and opens a device-bound session.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
        meta: &DeviceMetadata,
    ) -> Result<(User, String), AppError> {
        if self.user_repo.find_by_email(email).await?.is_some() {
            return Err(AppError::EmailAlreadyExists);
        }

        let password_hash = self.hash_password(password).await?;
        let user = self.user_repo.create_user(name, email, &password_hash).await?;

        let token = mint_token(&self.jwt_secret, &user)?;
        self.sessions.create_session(user.id, &token, meta).await?;

        Ok((user, token))
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        meta: &DeviceMetadata,
    ) -> Result<(User, String), AppError> {
        // Unknown e-mail and wrong password fail identically.
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !self.check_password(password, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        let token = mint_token(&self.jwt_secret, &user)?;
        self.sessions.create_session(user.id, &token, meta).await?;

        Ok((user, token))
    }

    pub async fn logout(&self, token: &str) -> Result<(), AppError> {
        self.sessions.revoke(token).await?;
        Ok(())
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<(User, i64), AppError> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let total_customers = self.user_repo.count_customers(user_id).await?;
        Ok((user, total_customers))
    }

    /// Always reports success to the caller, whether or not the account
    /// exists (no enumeration through this endpoint).
    pub async fn forgot_password(&self, email: &str) -> Result<(), AppError> {
        let Some(user) = self.user_repo.find_by_email(email).await? else {
            return Ok(());
        };

        let code = generate_reset_code();
        let expires = Utc::now() + chrono::Duration::minutes(RESET_CODE_TTL_MINUTES);
        self.user_repo.set_reset_code(user.id, &code, expires).await?;
        self.mailer.send_reset_code(email, &user.name, &code).await?;
        Ok(())
    }

    pub async fn reset_forgot_password(
        &self,
        email: &str,
        reset_code: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let user = self
            .user_repo
            .find_by_reset_code(email, reset_code)
            .await?
            .ok_or(AppError::InvalidResetCode)?;

        let password_hash = self.hash_password(new_password).await?;
        // Also clears the reset code
        self.user_repo.update_password(user.id, &password_hash).await?;
        Ok(())
    }

    /// Logged-in variant: the current password must check out first.
    pub async fn reset_password(
        &self,
        email: &str,
        password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::NotFound)?;

        if !self.check_password(password, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        let password_hash = self.hash_password(new_password).await?;
        self.user_repo.update_password(user.id, &password_hash).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: "Asha".into(),
            email: "asha@example.com".into(),
            password_hash: String::new(),
            reset_code: None,
            reset_code_expires: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn token_roundtrip_carries_identity_claims() {
        let u = user();
        let token = mint_token("secret", &u).unwrap();
        let claims = decode_token("secret", &token).unwrap();
        assert_eq!(claims.sub, u.id);
        assert_eq!(claims.email, u.email);
        assert_eq!(claims.name, u.name);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let token = mint_token("secret", &user()).unwrap();
        assert!(matches!(
            decode_token("other-secret", &token),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn garbage_token_is_invalid() {
        assert!(matches!(
            decode_token("secret", "not.a.jwt"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let u = user();
        let now = Utc::now();
        let claims = Claims {
            sub: u.id,
            email: u.email,
            name: u.name,
            iat: (now - chrono::Duration::days(8)).timestamp() as usize,
            exp: (now - chrono::Duration::days(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(matches!(
            decode_token("secret", &token),
            Err(AppError::TokenExpired)
        ));
    }

    #[test]
    fn verify_password_rejects_malformed_hash_without_panicking() {
        assert!(!verify_password("password", "not-a-bcrypt-hash"));
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        // cost 4 keeps the test fast; the service itself uses DEFAULT_COST
        let h = hash("hunter22", 4).unwrap();
        assert!(verify_password("hunter22", &h));
        assert!(!verify_password("hunter23", &h));
    }
}

// src/db/session_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::session::Session};

// Repository for the 'user_sessions' table.
//
// Methods take an executor so the SessionService can run the whole
// evict-then-insert sequence inside one transaction (see service).
#[derive(Clone)]
pub struct SessionRepository;

impl SessionRepository {
    pub fn new() -> Self {
        Self
    }

    /// Serializes session creation per fingerprint. The lock is released
    /// automatically at commit/rollback of the surrounding transaction.
    pub async fn lock_fingerprint<'e, E>(
        &self,
        executor: E,
        fingerprint: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(fingerprint)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn list_active_for_update<'e, E>(
        &self,
        executor: E,
        fingerprint: &str,
    ) -> Result<Vec<Session>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sessions = sqlx::query_as::<_, Session>(
            "SELECT * FROM user_sessions
             WHERE device_fingerprint = $1 AND is_active = TRUE
             FOR UPDATE",
        )
        .bind(fingerprint)
        .fetch_all(executor)
        .await?;
        Ok(sessions)
    }

    pub async fn deactivate<'e, E>(&self, executor: E, session_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE user_sessions SET is_active = FALSE WHERE id = $1")
            .bind(session_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        token: &str,
        fingerprint: &str,
        user_agent: Option<&str>,
        ip_address: Option<&str>,
    ) -> Result<Session, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let session = sqlx::query_as::<_, Session>(
            "INSERT INTO user_sessions (user_id, token, device_fingerprint, user_agent, ip_address)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(user_id)
        .bind(token)
        .bind(fingerprint)
        .bind(user_agent)
        .bind(ip_address)
        .fetch_one(executor)
        .await?;
        Ok(session)
    }

    pub async fn find_active<'e, E>(
        &self,
        executor: E,
        token: &str,
        fingerprint: &str,
    ) -> Result<Option<Session>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let session = sqlx::query_as::<_, Session>(
            "SELECT * FROM user_sessions
             WHERE token = $1 AND device_fingerprint = $2 AND is_active = TRUE",
        )
        .bind(token)
        .bind(fingerprint)
        .fetch_optional(executor)
        .await?;
        Ok(session)
    }

    // Recency signal for cap eviction.
    pub async fn touch<'e, E>(&self, executor: E, session_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE user_sessions SET last_used_at = now() WHERE id = $1")
            .bind(session_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    // Deactivates every session carrying the token (logout).
    pub async fn revoke_by_token<'e, E>(&self, executor: E, token: &str) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE user_sessions SET is_active = FALSE WHERE token = $1")
            .bind(token)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

impl Default for SessionRepository {
    fn default() -> Self {
        Self::new()
    }
}

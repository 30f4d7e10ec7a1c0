// src/services/session_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::SessionRepository,
    models::session::Session,
    services::fingerprint::{device_fingerprint, DeviceMetadata},
};

/// Device-bound session lifecycle: issue, cap, evict, validate, revoke.
#[derive(Clone)]
pub struct SessionService {
    repo: SessionRepository,
    pool: PgPool,
    max_device_sessions: usize,
}

/// Which active session loses its slot when the cap is hit: the oldest
/// `last_used_at`, ties broken by lowest id so the choice is deterministic.
pub fn eviction_candidate(sessions: &[Session]) -> Option<Uuid> {
    sessions
        .iter()
        .min_by_key(|s| (s.last_used_at, s.id))
        .map(|s| s.id)
}

impl SessionService {
    pub fn new(repo: SessionRepository, pool: PgPool, max_device_sessions: usize) -> Self {
        Self {
            repo,
            pool,
            max_device_sessions: max_device_sessions.max(1),
        }
    }

    /// Creates an active session for (user, device), evicting the stalest one
    /// first when the device is at its cap.
    ///
    /// The read-then-decide-then-write sequence runs inside one transaction
    /// holding a per-fingerprint advisory lock, so two concurrent logins from
    /// the same device cannot both observe "cap not reached" and breach it.
    pub async fn create_session(
        &self,
        user_id: Uuid,
        token: &str,
        meta: &DeviceMetadata,
    ) -> Result<Session, AppError> {
        let fingerprint = device_fingerprint(meta);

        let mut tx = self.pool.begin().await?;
        self.repo.lock_fingerprint(&mut *tx, &fingerprint).await?;

        let active = self
            .repo
            .list_active_for_update(&mut *tx, &fingerprint)
            .await?;

        // Eviction is an internal side effect of a successful login; it is
        // never surfaced to the caller.
        if active.len() >= self.max_device_sessions {
            if let Some(victim) = eviction_candidate(&active) {
                self.repo.deactivate(&mut *tx, victim).await?;
                tracing::info!("Session cap reached for device, evicted session {}", victim);
            }
        }

        let user_agent = (!meta.user_agent.is_empty()).then_some(meta.user_agent.as_str());
        let ip_address = (!meta.ip_address.is_empty()).then_some(meta.ip_address.as_str());

        let session = self
            .repo
            .insert(&mut *tx, user_id, token, &fingerprint, user_agent, ip_address)
            .await?;

        tx.commit().await?;
        Ok(session)
    }

    /// Session validity is bound to (token AND device): a token replayed from
    /// a device with a different fingerprint finds no session here, even
    /// though the token itself verifies cryptographically.
    pub async fn validate_session(
        &self,
        token: &str,
        meta: &DeviceMetadata,
    ) -> Result<Option<Session>, AppError> {
        let fingerprint = device_fingerprint(meta);
        self.repo.find_active(&self.pool, token, &fingerprint).await
    }

    pub async fn touch(&self, session: &Session) -> Result<(), AppError> {
        self.repo.touch(&self.pool, session.id).await
    }

    pub async fn revoke(&self, token: &str) -> Result<u64, AppError> {
        self.repo.revoke_by_token(&self.pool, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn session(id_byte: u8, last_used_offset_secs: i64) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::from_bytes([id_byte; 16]),
            user_id: Uuid::nil(),
            token: "t".into(),
            device_fingerprint: "fp".into(),
            user_agent: None,
            ip_address: None,
            is_active: true,
            created_at: now,
            last_used_at: now + Duration::seconds(last_used_offset_secs),
        }
    }

    #[test]
    fn evicts_the_least_recently_used_session() {
        let sessions = vec![session(1, 30), session(2, -60), session(3, 10)];
        assert_eq!(eviction_candidate(&sessions), Some(sessions[1].id));
    }

    #[test]
    fn ties_break_by_lowest_id() {
        let a = session(9, 0);
        let mut b = session(2, 0);
        b.last_used_at = a.last_used_at;
        let sessions = vec![a.clone(), b.clone()];
        assert_eq!(eviction_candidate(&sessions), Some(b.id));

        // order in the slice must not matter
        let sessions = vec![b.clone(), a];
        assert_eq!(eviction_candidate(&sessions), Some(b.id));
    }

    #[test]
    fn no_candidate_for_empty_set() {
        assert_eq!(eviction_candidate(&[]), None);
    }
}

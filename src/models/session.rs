// src/models/session.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

// One authorized (user, device) pairing.
//
// At most MAX_DEVICE_SESSIONS rows with `is_active = true` share a
// `device_fingerprint`; rows are deactivated (never deleted) when superseded
// or logged out, and a deactivated session is never reactivated.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,

    #[serde(skip_serializing)]
    pub token: String,

    pub device_fingerprint: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

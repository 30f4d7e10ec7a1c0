// src/config.rs

use std::{env, sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::error::AppError,
    db::{CustomerRepository, SessionRepository, UserRepository},
    services::{
        auth::AuthService, customer_service::CustomerService, email_service::LogMailer,
        file_service::FileStore, session_service::SessionService,
    },
};

/// Environment-derived configuration, read once at startup. Required values
/// abort the boot (`ConfigError`) instead of failing per request.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub max_device_sessions: usize,
    pub upload_dir: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let required = |name: &str| {
            env::var(name).map_err(|_| AppError::ConfigError(name.to_string()))
        };

        let max_device_sessions = env::var("MAX_DEVICE_SESSIONS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1)
            .max(1);

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(3000);

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            max_device_sessions,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads/documents".to_string()),
            port,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: AppConfig,
    pub auth_service: AuthService,
    pub session_service: SessionService,
    pub customer_service: CustomerService,
    pub file_store: FileStore,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Database connection established");

        // --- Wire the dependency graph ---
        let file_store = FileStore::new(&config.upload_dir);

        let session_service = SessionService::new(
            SessionRepository::new(),
            db_pool.clone(),
            config.max_device_sessions,
        );

        let auth_service = AuthService::new(
            UserRepository::new(db_pool.clone()),
            session_service.clone(),
            Arc::new(LogMailer),
            config.jwt_secret.clone(),
        );

        let customer_service = CustomerService::new(
            CustomerRepository::new(),
            file_store.clone(),
            db_pool.clone(),
        );

        Ok(Self {
            db_pool,
            config,
            auth_service,
            session_service,
            customer_service,
            file_store,
        })
    }
}

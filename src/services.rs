pub mod auth;
pub mod customer_service;
pub mod email_service;
pub mod file_service;
pub mod fingerprint;
pub mod session_service;

// src/services/email_service.rs

use async_trait::async_trait;
use rand::Rng;

use crate::common::error::AppError;

/// Outbound delivery of password-reset codes. Delivery itself is an external
/// collaborator; the service only depends on this contract.
#[async_trait]
pub trait ResetCodeMailer: Send + Sync {
    async fn send_reset_code(&self, email: &str, name: &str, code: &str) -> Result<(), AppError>;
}

/// Default mailer: logs the code instead of sending it. Swapped for a real
/// transport at the composition root in deployments that need SMTP.
pub struct LogMailer;

#[async_trait]
impl ResetCodeMailer for LogMailer {
    async fn send_reset_code(&self, email: &str, name: &str, code: &str) -> Result<(), AppError> {
        tracing::info!("Reset code for {} <{}>: {}", name, email, code);
        Ok(())
    }
}

/// Six random decimal digits, zero-padded.
pub fn generate_reset_code() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{:06}", n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_code_is_six_digits() {
        for _ in 0..100 {
            let code = generate_reset_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}

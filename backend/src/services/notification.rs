//! Delivery of signature request emails.
//!
//! Delivery is best effort: callers log failures and never fail the request.

use async_trait::async_trait;
use std::sync::Arc;

use crate::utils::email::{EmailService, SignatureEmail};
use crate::utils::token::redact_token;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignatureNotifier: Send + Sync {
    async fn send_signature_request(&self, email: SignatureEmail) -> anyhow::Result<()>;
}

/// Sends through SMTP on the blocking pool.
pub struct EmailNotifier {
    service: Arc<EmailService>,
}

impl EmailNotifier {
    pub fn new(service: EmailService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

#[async_trait]
impl SignatureNotifier for EmailNotifier {
    async fn send_signature_request(&self, email: SignatureEmail) -> anyhow::Result<()> {
        let service = self.service.clone();
        tokio::task::spawn_blocking(move || service.send_signature_request(&email)).await??;
        Ok(())
    }
}

/// Logs requests instead of sending them. Used when no SMTP host is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl SignatureNotifier for LogNotifier {
    async fn send_signature_request(&self, email: SignatureEmail) -> anyhow::Result<()> {
        let token = email.link.rsplit('/').next().unwrap_or_default();
        tracing::info!(
            to = %email.to_email,
            session = %email.session_title,
            token = %redact_token(token),
            "Signature request not sent (no SMTP configured)"
        );
        Ok(())
    }
}

/// Sends and logs the outcome; errors never propagate.
pub async fn dispatch(notifier: &dyn SignatureNotifier, email: SignatureEmail) -> bool {
    let to = email.to_email.clone();
    match notifier.send_signature_request(email).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(to = %to, error = %err, "Failed to send signature request");
            false
        }
    }
}

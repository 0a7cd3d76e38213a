//! Token issuance with audit emission.
//!
//! [`issue`](webproof_token::issue) itself is a pure function; backends
//! that also want the issuance recorded go through [`TokenIssuer`], which
//! ships a best-effort audit event alongside.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use webproof_token::SignatureConfig;

use crate::audit::{AuditLog, LogType};
use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Issues capability tokens and records the fact.
pub struct TokenIssuer {
    audit: AuditLog,
}

impl TokenIssuer {
    /// Create an issuer from the client configuration.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            audit: AuditLog::new(config),
        }
    }

    /// Issue a capability token for `config`.
    ///
    /// Emits a `SESSION_TOKEN_GENERATED` audit event on success and a
    /// `SESSION_TOKEN_FAILED` event on failure, correlated by the token's
    /// `signatureId`. Audit delivery never affects the returned result.
    ///
    /// # Errors
    ///
    /// Propagates [`TokenError`](webproof_token::TokenError) from the
    /// underlying issuance.
    pub async fn issue(&self, config: &SignatureConfig) -> ClientResult<String> {
        let now = Utc::now().timestamp();

        match webproof_token::issue(config, now) {
            Ok(token) => {
                // Re-read our own token for its signatureId; a fresh UUID
                // only if that somehow fails.
                let correlation_id = webproof_token::verify(&token, now)
                    .map(|data| data.signature_id)
                    .unwrap_or_else(|_| Uuid::new_v4().to_string());
                self.audit
                    .send(
                        &correlation_id,
                        LogType::SessionTokenGenerated,
                        &config.application_id,
                    )
                    .await;
                info!(
                    application_id = %config.application_id,
                    signature_id = %correlation_id,
                    "capability token issued"
                );
                Ok(token)
            },
            Err(err) => {
                self.audit
                    .send(
                        &Uuid::new_v4().to_string(),
                        LogType::SessionTokenFailed,
                        &config.application_id,
                    )
                    .await;
                Err(err.into())
            },
        }
    }
}

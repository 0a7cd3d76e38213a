//! Audit log emission.
//!
//! Operational events (token issued, verification started, proof
//! generated, failures) are shipped to a log sink. Delivery is strictly
//! best-effort: a failure is logged locally and swallowed, never surfaced
//! to the caller.

use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::directory::AppDirectory;
use crate::error::{ClientError, ClientResult};

/// Kind of an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogType {
    /// A capability token was issued.
    SessionTokenGenerated,
    /// A capability token failed to issue.
    SessionTokenFailed,
    /// A proof request passed validation and was dispatched.
    VerificationStarted,
    /// The attestor returned a signed claim.
    ProofGenerated,
    /// A proof request failed after all attempts.
    Error,
    /// Generic success marker.
    Success,
    /// Generic failure marker.
    Failed,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LogEvent<'a> {
    session_id: &'a str,
    log_type: LogType,
    date: String,
    application_id: &'a str,
    application_name: &'a str,
}

/// Ships audit events to the log sink.
pub struct AuditLog {
    http: Client,
    logs_url: String,
    directory: Arc<AppDirectory>,
    enabled: bool,
}

impl AuditLog {
    /// Create an audit log from the client configuration.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            http: Client::new(),
            logs_url: config.logs_url.clone(),
            directory: Arc::new(AppDirectory::new(config.directory_url.clone())),
            enabled: config.audit_logs,
        }
    }

    /// Emit one audit event.
    ///
    /// `correlation_id` is the client session id, or the token's
    /// `signatureId` for issuance events. Never fails: delivery problems
    /// are logged and dropped.
    pub async fn send(&self, correlation_id: &str, log_type: LogType, application_id: &str) {
        if !self.enabled {
            return;
        }
        if let Err(err) = self.try_send(correlation_id, log_type, application_id).await {
            warn!(%err, ?log_type, "failed to deliver audit log event");
        }
    }

    async fn try_send(
        &self,
        correlation_id: &str,
        log_type: LogType,
        application_id: &str,
    ) -> ClientResult<()> {
        let application_name = self.directory.application_name(application_id).await?;

        let event = LogEvent {
            session_id: correlation_id,
            log_type,
            date: Utc::now().to_rfc3339(),
            application_id,
            application_name: &application_name,
        };

        let url = format!("{}/business-logs", self.logs_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .json(&event)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::Network(format!(
                "log sink returned HTTP {}",
                response.status()
            )));
        }

        debug!(?log_type, correlation_id, "audit log event delivered");
        Ok(())
    }
}

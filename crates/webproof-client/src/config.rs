//! Client configuration.
//!
//! Every collaborator endpoint is carried here rather than read from
//! module globals, so a test (or a self-hosted deployment) swaps them by
//! constructing a different config.

use std::path::PathBuf;
use std::time::Duration;

/// Default attestor endpoint.
pub const DEFAULT_ATTESTOR_URL: &str = "https://attestor.webproof.dev/api/claim";

/// Default application-directory endpoint.
pub const DEFAULT_DIRECTORY_URL: &str = "https://api.webproof.dev";

/// Default audit-log sink endpoint.
pub const DEFAULT_LOGS_URL: &str = "https://logs.webproof.dev";

/// Configuration for [`ProofClient`](crate::ProofClient) and
/// [`TokenIssuer`](crate::TokenIssuer).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// The attestor node that executes proof requests.
    pub attestor_url: String,
    /// The application-registration directory.
    pub directory_url: String,
    /// The audit-log sink.
    pub logs_url: String,
    /// Directory for persisted ephemeral keys. `None` keeps keys in
    /// memory only, giving each process run a fresh session identity.
    pub key_store_dir: Option<PathBuf>,
    /// Attempts for the proof-request loop (at least 1).
    pub retries: u32,
    /// Fixed delay between attempts.
    pub retry_interval: Duration,
    /// Whether to ship audit events. Delivery is always best-effort;
    /// disabling skips the network call entirely.
    pub audit_logs: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            attestor_url: DEFAULT_ATTESTOR_URL.to_string(),
            directory_url: DEFAULT_DIRECTORY_URL.to_string(),
            logs_url: DEFAULT_LOGS_URL.to_string(),
            key_store_dir: None,
            retries: 1,
            retry_interval: Duration::from_millis(1000),
            audit_logs: true,
        }
    }
}

//! The attested-fetch client.

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;

use webproof_crypto::{Address, KeyIdentity};
use webproof_token::{SignatureData, is_url_allowed, verify};

use crate::attestor::{
    Attestor, AttestorEndpoint, ClaimParams, ClaimRequest, ClaimSecretParams, HttpAttestor,
};
use crate::audit::{AuditLog, LogType};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::keystore::EphemeralKeyManager;
use crate::options::{FetchOptions, ResponseMatch, SecretOptions};
use crate::proof::Proof;

/// How a client authenticates, decided by the caller out of band.
///
/// There is no sniffing of string shapes: a secret is a secret and a
/// token is a token, discriminated by the variant.
pub enum ClientAuth {
    /// Backend mode: the application secret itself (hex).
    Secret(String),
    /// Frontend mode: an issued capability token.
    Token(String),
}

impl std::fmt::Debug for ClientAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Secret(_) => write!(f, "ClientAuth::Secret(..)"),
            Self::Token(_) => write!(f, "ClientAuth::Token(..)"),
        }
    }
}

/// Resolved authentication state.
enum AuthMode {
    /// Signing directly with the application secret.
    Secret(KeyIdentity),
    /// Signing with an ephemeral key under a verified token's scope.
    Token {
        data: SignatureData,
        key: KeyIdentity,
    },
}

/// Client for fetching attested proofs of HTTP responses.
///
/// In secret mode the client signs proof requests with the application
/// secret. In token mode it carries a verified capability token, gates
/// every URL against the token's allow-list, and signs with a locally
/// held ephemeral key - the application secret never reaches the
/// frontend.
pub struct ProofClient {
    application_id: String,
    session_id: String,
    auth: AuthMode,
    attestor: Arc<dyn Attestor>,
    audit: AuditLog,
    config: ClientConfig,
}

impl ProofClient {
    /// Create a client with the default collaborators for `config`.
    ///
    /// # Errors
    ///
    /// See [`with_collaborators`](Self::with_collaborators).
    pub fn new(
        application_id: impl Into<String>,
        auth: ClientAuth,
        config: ClientConfig,
    ) -> ClientResult<Self> {
        let attestor: Arc<dyn Attestor> = Arc::new(HttpAttestor::new(config.attestor_url.clone()));
        let keys = match &config.key_store_dir {
            Some(dir) => EphemeralKeyManager::persistent(dir.clone()),
            None => EphemeralKeyManager::in_memory(),
        };
        Self::with_collaborators(application_id, auth, config, attestor, &keys)
    }

    /// Create a client with explicit collaborators (dependency injection
    /// seam for tests and embedders).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidParameter`] when the application id
    /// does not parse, when a secret does not derive the claimed id, or
    /// when a token was issued for a different application; token
    /// verification failures propagate as [`ClientError::Token`].
    pub fn with_collaborators(
        application_id: impl Into<String>,
        auth: ClientAuth,
        config: ClientConfig,
        attestor: Arc<dyn Attestor>,
        keys: &EphemeralKeyManager,
    ) -> ClientResult<Self> {
        let application_id = application_id.into();
        let claimed = Address::from_hex(&application_id).map_err(|e| {
            ClientError::InvalidParameter(format!("invalid applicationId: {e}"))
        })?;

        let auth = match auth {
            ClientAuth::Secret(secret) => {
                let key = KeyIdentity::from_hex(&secret).map_err(|e| {
                    ClientError::InvalidParameter(format!("invalid applicationSecret: {e}"))
                })?;
                if key.address() != claimed {
                    return Err(ClientError::InvalidParameter(
                        "applicationId does not match applicationSecret".to_string(),
                    ));
                }
                AuthMode::Secret(key)
            },
            ClientAuth::Token(token) => {
                let data = verify(&token, Utc::now().timestamp())?;
                let token_id = Address::from_hex(&data.application_id).map_err(|e| {
                    ClientError::InvalidParameter(format!("invalid applicationId in token: {e}"))
                })?;
                if token_id != claimed {
                    return Err(ClientError::InvalidParameter(format!(
                        "token applicationId ({}) does not match expected ({application_id})",
                        data.application_id
                    )));
                }
                let key = keys.get_or_create(&data.application_id);
                AuthMode::Token { data, key }
            },
        };

        let session_id = Uuid::new_v4().to_string();
        info!(%application_id, %session_id, "initializing proof client");

        Ok(Self {
            application_id,
            session_id,
            auth,
            attestor,
            audit: AuditLog::new(&config),
            config,
        })
    }

    /// The application this client acts for.
    #[must_use]
    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    /// This client's session id (audit correlation).
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The verified token payload, in token mode.
    #[must_use]
    pub fn signature_data(&self) -> Option<&SignatureData> {
        match &self.auth {
            AuthMode::Token { data, .. } => Some(data),
            AuthMode::Secret(_) => None,
        }
    }

    /// Fetch a URL through the attestor and return the signed proof.
    ///
    /// In token mode the URL must match the token's allow-list. The
    /// request is signed by the application secret (secret mode) or the
    /// ephemeral key (token mode); the attestor derives the claim owner
    /// from that key.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidParameter`] for a malformed URL or
    /// disallowed method, [`ClientError::UrlNotAllowed`] when the token
    /// scope rejects the URL, [`ClientError::Network`] for transport
    /// failures and [`ClientError::Protocol`] when the attestor reports a
    /// failure, after the configured number of attempts.
    pub async fn fetch_proof(
        &self,
        url: &str,
        options: FetchOptions,
        secret_options: SecretOptions,
    ) -> ClientResult<Proof> {
        Url::parse(url).map_err(|_| {
            ClientError::InvalidParameter(format!("invalid URL passed to fetch_proof: {url}"))
        })?;
        options.validate()?;

        if let AuthMode::Token { data, .. } = &self.auth {
            if !is_url_allowed(url, &data.allowed_urls) {
                warn!(url, "URL rejected by token scope");
                return Err(ClientError::UrlNotAllowed {
                    url: url.to_string(),
                    allowed: data.allowed_urls.clone(),
                });
            }
        }

        self.audit
            .send(
                &self.session_id,
                LogType::VerificationStarted,
                &self.application_id,
            )
            .await;

        let request = self.build_request(url, options, secret_options);

        let mut attempt: u32 = 0;
        loop {
            match self.attempt_claim(&request).await {
                Ok(proof) => {
                    self.audit
                        .send(
                            &self.session_id,
                            LogType::ProofGenerated,
                            &self.application_id,
                        )
                        .await;
                    info!(url, identifier = %proof.identifier, "proof generated");
                    return Ok(proof);
                },
                Err(err) => {
                    attempt = attempt.saturating_add(1);
                    if attempt >= self.config.retries.max(1) {
                        self.audit
                            .send(&self.session_id, LogType::Error, &self.application_id)
                            .await;
                        error!(url, %err, "proof generation failed");
                        return Err(err);
                    }
                    warn!(url, %err, attempt, "proof attempt failed, retrying");
                    tokio::time::sleep(self.config.retry_interval).await;
                },
            }
        }
    }

    async fn attempt_claim(&self, request: &ClaimRequest) -> ClientResult<Proof> {
        let response = self.attestor.create_claim(request).await?;
        if let Some(failure) = &response.error {
            return Err(ClientError::Protocol(failure.message.clone()));
        }
        Proof::from_response(response, &self.config.attestor_url)
    }

    fn build_request(
        &self,
        url: &str,
        options: FetchOptions,
        secret_options: SecretOptions,
    ) -> ClaimRequest {
        let owner_key = match &self.auth {
            AuthMode::Secret(key) => key,
            AuthMode::Token { key, .. } => key,
        };

        ClaimRequest {
            name: "http".to_string(),
            params: ClaimParams {
                method: options.method,
                url: url.to_string(),
                response_matches: secret_options
                    .response_matches
                    .unwrap_or_else(|| vec![ResponseMatch::capture_all()]),
                response_redactions: secret_options.response_redactions.unwrap_or_default(),
                headers: options.headers,
                body: options.body.unwrap_or_default(),
                param_values: options.param_values,
                geo_location: options.geo_location,
            },
            secret_params: ClaimSecretParams {
                headers: secret_options.headers.unwrap_or_default(),
                cookie_str: secret_options.cookie_str.unwrap_or_default(),
                param_values: secret_options.param_values,
            },
            owner_private_key: owner_key.secret_hex().to_string(),
            client: AttestorEndpoint {
                url: self.config.attestor_url.clone(),
            },
            context: options.context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestor::{ClaimFailure, ClaimResponse, ClaimSignature, RawClaim};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use webproof_token::{SignatureConfig, issue};

    struct StubAttestor {
        fail_first: usize,
        body_error: bool,
        calls: AtomicUsize,
        last_request: Mutex<Option<ClaimRequest>>,
    }

    impl StubAttestor {
        fn succeeding() -> Self {
            Self {
                fail_first: 0,
                body_error: false,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            }
        }

        fn failing_first(n: usize) -> Self {
            Self {
                fail_first: n,
                ..Self::succeeding()
            }
        }

        fn body_erroring() -> Self {
            Self {
                body_error: true,
                ..Self::succeeding()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Attestor for StubAttestor {
        async fn create_claim(&self, request: &ClaimRequest) -> ClientResult<ClaimResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());

            if n < self.fail_first {
                return Err(ClientError::Network("connection reset".to_string()));
            }
            if self.body_error {
                return Ok(ClaimResponse {
                    error: Some(ClaimFailure {
                        message: "provider refused".to_string(),
                    }),
                    claim: None,
                    signatures: vec![],
                });
            }
            Ok(ClaimResponse {
                error: None,
                claim: Some(RawClaim {
                    identifier: "0xclaim".to_string(),
                    provider: "http".to_string(),
                    parameters: "{}".to_string(),
                    owner: "0xowner".to_string(),
                    timestamp_s: 1_700_000_000,
                    context: String::new(),
                    epoch: 1,
                }),
                signatures: vec![ClaimSignature {
                    signature: "0xsig".to_string(),
                    attestor_address: "0xattestor".to_string(),
                }],
            })
        }
    }

    fn test_config() -> ClientConfig {
        ClientConfig {
            audit_logs: false,
            retries: 1,
            retry_interval: Duration::from_millis(1),
            ..ClientConfig::default()
        }
    }

    fn issued_token(key: &KeyIdentity, allowed_urls: &[&str]) -> String {
        let config = SignatureConfig {
            application_id: key.address().to_hex(),
            application_secret: key.secret_hex().to_string(),
            allowed_urls: allowed_urls.iter().map(ToString::to_string).collect(),
            expires_at: None,
        };
        issue(&config, Utc::now().timestamp()).unwrap()
    }

    fn token_client(
        key: &KeyIdentity,
        allowed_urls: &[&str],
        attestor: Arc<StubAttestor>,
        keys: &EphemeralKeyManager,
    ) -> ProofClient {
        ProofClient::with_collaborators(
            key.address().to_hex(),
            ClientAuth::Token(issued_token(key, allowed_urls)),
            test_config(),
            attestor,
            keys,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_secret_mode_fetches() {
        let key = KeyIdentity::generate();
        let attestor = Arc::new(StubAttestor::succeeding());
        let keys = EphemeralKeyManager::in_memory();

        let client = ProofClient::with_collaborators(
            key.address().to_hex(),
            ClientAuth::Secret(key.secret_hex().to_string()),
            test_config(),
            attestor.clone(),
            &keys,
        )
        .unwrap();

        let proof = client
            .fetch_proof(
                "https://api.example.com/data",
                FetchOptions::default(),
                SecretOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(proof.identifier, "0xclaim");
        assert_eq!(attestor.calls(), 1);

        // Secret mode signs with the application secret itself
        let request = attestor.last_request.lock().unwrap().take().unwrap();
        let owner = KeyIdentity::from_hex(&request.owner_private_key).unwrap();
        assert_eq!(owner.address(), key.address());
    }

    #[tokio::test]
    async fn test_secret_mode_rejects_mismatched_id() {
        let key = KeyIdentity::generate();
        let other = KeyIdentity::generate();
        let keys = EphemeralKeyManager::in_memory();

        let result = ProofClient::with_collaborators(
            other.address().to_hex(),
            ClientAuth::Secret(key.secret_hex().to_string()),
            test_config(),
            Arc::new(StubAttestor::succeeding()),
            &keys,
        );

        assert!(matches!(result, Err(ClientError::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn test_token_mode_gates_urls() {
        let key = KeyIdentity::generate();
        let attestor = Arc::new(StubAttestor::succeeding());
        let keys = EphemeralKeyManager::in_memory();
        let client = token_client(&key, &["https://api.example.com/*"], attestor.clone(), &keys);

        let result = client
            .fetch_proof(
                "https://evil.example/data",
                FetchOptions::default(),
                SecretOptions::default(),
            )
            .await;

        match result {
            Err(ClientError::UrlNotAllowed { url, allowed }) => {
                assert_eq!(url, "https://evil.example/data");
                assert_eq!(allowed, vec!["https://api.example.com/*".to_string()]);
            },
            other => panic!("expected UrlNotAllowed, got {other:?}"),
        }
        // The attestor was never consulted
        assert_eq!(attestor.calls(), 0);
    }

    #[tokio::test]
    async fn test_token_mode_signs_with_ephemeral_key() {
        let key = KeyIdentity::generate();
        let attestor = Arc::new(StubAttestor::succeeding());
        let keys = EphemeralKeyManager::in_memory();
        let client = token_client(&key, &["https://api.example.com/*"], attestor.clone(), &keys);

        client
            .fetch_proof(
                "https://api.example.com/users/1",
                FetchOptions::default(),
                SecretOptions::default(),
            )
            .await
            .unwrap();

        let request = attestor.last_request.lock().unwrap().take().unwrap();
        let owner = KeyIdentity::from_hex(&request.owner_private_key).unwrap();

        // Signed by the ephemeral key for this application, not the secret
        let ephemeral = keys.get_or_create(&key.address().to_hex());
        assert_eq!(owner.address(), ephemeral.address());
        assert_ne!(owner.address(), key.address());
    }

    #[tokio::test]
    async fn test_token_for_other_application_rejected() {
        let key = KeyIdentity::generate();
        let other = KeyIdentity::generate();
        let keys = EphemeralKeyManager::in_memory();

        let result = ProofClient::with_collaborators(
            other.address().to_hex(),
            ClientAuth::Token(issued_token(&key, &["https://api.example.com/*"])),
            test_config(),
            Arc::new(StubAttestor::succeeding()),
            &keys,
        );

        assert!(matches!(result, Err(ClientError::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let key = KeyIdentity::generate();
        let keys = EphemeralKeyManager::in_memory();

        let result = ProofClient::with_collaborators(
            key.address().to_hex(),
            ClientAuth::Token("not.a-token".to_string()),
            test_config(),
            Arc::new(StubAttestor::succeeding()),
            &keys,
        );

        assert!(matches!(result, Err(ClientError::Token(_))));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let key = KeyIdentity::generate();
        let keys = EphemeralKeyManager::in_memory();
        let attestor = Arc::new(StubAttestor::succeeding());
        let client = token_client(&key, &["https://api.example.com/*"], attestor.clone(), &keys);

        let result = client
            .fetch_proof(
                "not a url",
                FetchOptions::default(),
                SecretOptions::default(),
            )
            .await;

        assert!(matches!(result, Err(ClientError::InvalidParameter(_))));
        assert_eq!(attestor.calls(), 0);
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let key = KeyIdentity::generate();
        let attestor = Arc::new(StubAttestor::failing_first(1));
        let keys = EphemeralKeyManager::in_memory();

        let mut config = test_config();
        config.retries = 3;

        let client = ProofClient::with_collaborators(
            key.address().to_hex(),
            ClientAuth::Secret(key.secret_hex().to_string()),
            config,
            attestor.clone(),
            &keys,
        )
        .unwrap();

        let proof = client
            .fetch_proof(
                "https://api.example.com/data",
                FetchOptions::default(),
                SecretOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(proof.identifier, "0xclaim");
        assert_eq!(attestor.calls(), 2);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let key = KeyIdentity::generate();
        let attestor = Arc::new(StubAttestor::failing_first(usize::MAX));
        let keys = EphemeralKeyManager::in_memory();

        let mut config = test_config();
        config.retries = 2;

        let client = ProofClient::with_collaborators(
            key.address().to_hex(),
            ClientAuth::Secret(key.secret_hex().to_string()),
            config,
            attestor.clone(),
            &keys,
        )
        .unwrap();

        let result = client
            .fetch_proof(
                "https://api.example.com/data",
                FetchOptions::default(),
                SecretOptions::default(),
            )
            .await;

        assert!(matches!(result, Err(ClientError::Network(_))));
        assert_eq!(attestor.calls(), 2);
    }

    #[tokio::test]
    async fn test_attestor_body_error_is_protocol_failure() {
        let key = KeyIdentity::generate();
        let attestor = Arc::new(StubAttestor::body_erroring());
        let keys = EphemeralKeyManager::in_memory();

        let client = ProofClient::with_collaborators(
            key.address().to_hex(),
            ClientAuth::Secret(key.secret_hex().to_string()),
            test_config(),
            attestor,
            &keys,
        )
        .unwrap();

        let result = client
            .fetch_proof(
                "https://api.example.com/data",
                FetchOptions::default(),
                SecretOptions::default(),
            )
            .await;

        match result {
            Err(ClientError::Protocol(message)) => assert_eq!(message, "provider refused"),
            other => panic!("expected Protocol error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_signature_data_exposed_in_token_mode() {
        let key = KeyIdentity::generate();
        let keys = EphemeralKeyManager::in_memory();
        let attestor = Arc::new(StubAttestor::succeeding());
        let client = token_client(&key, &["https://api.example.com/*"], attestor, &keys);

        let data = client.signature_data().unwrap();
        assert_eq!(
            data.allowed_urls,
            vec!["https://api.example.com/*".to_string()]
        );
    }
}

//! Application-registration lookup.

use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// Looks up registered applications by id.
///
/// Resolved names are cached per instance (last-writer-wins, no TTL);
/// the cache is owned by the directory rather than a module global so
/// each client - and each test - gets its own.
pub struct AppDirectory {
    http: Client,
    base_url: String,
    names: RwLock<HashMap<String, String>>,
}

#[derive(Deserialize)]
struct DirectoryResponse {
    application: DirectoryApplication,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectoryApplication {
    application_name: String,
}

impl AppDirectory {
    /// Create a directory client.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            names: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve an application id to its registered name.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ApplicationNotFound`] on a clean 404,
    /// [`ClientError::Application`] on any other non-success status, and
    /// [`ClientError::Network`] on transport failure.
    pub async fn application_name(&self, application_id: &str) -> ClientResult<String> {
        if let Ok(names) = self.names.read() {
            if let Some(name) = names.get(application_id) {
                return Ok(name.clone());
            }
        }

        let url = format!(
            "{}/applications/{application_id}",
            self.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::ApplicationNotFound(application_id.to_string()));
        }
        if !status.is_success() {
            return Err(ClientError::Application(format!(
                "directory returned HTTP {status}"
            )));
        }

        let body: DirectoryResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Application(format!("unreadable directory response: {e}")))?;

        debug!(
            application_id,
            application_name = %body.application.application_name,
            "resolved application"
        );
        if let Ok(mut names) = self.names.write() {
            names.insert(
                application_id.to_string(),
                body.application.application_name.clone(),
            );
        }

        Ok(body.application.application_name)
    }
}

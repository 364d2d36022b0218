use std::time::Duration;

use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{error::LockupError, helpers::decode_collection, models::Config};

/// HTTP access to the LockUp backend and the identity provider.
#[derive(Debug, Clone)]
pub struct ApiClient {
    pub http: Client,
    pub api_base_url: String,
    pub userinfo_endpoint: String,
}

impl ApiClient {
    pub fn new(http: Client, config: &Config) -> Self {
        ApiClient {
            http,
            api_base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            userinfo_endpoint: config.userinfo_endpoint.to_owned(),
        }
    }

    /// Builds the HTTP client with the connect and request timeouts from `config`.
    pub fn from_config(config: &Config) -> Result<Self, LockupError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LockupError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(ApiClient::new(http, config))
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }

    /// GET a collection endpoint and decode it with the array-or-`data` contract.
    pub async fn get_collection<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Vec<T>, LockupError> {
        let request_url = self.endpoint(path);
        debug!("GET {}", request_url);
        let response = self
            .http
            .get(&request_url)
            .send()
            .await?
            .error_for_status()?;
        let body: Value = response.json().await?;
        decode_collection(body)
    }
}

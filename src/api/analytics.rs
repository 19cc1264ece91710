use crate::config::config::ExportConfig;
use crate::data::data_exporter::ExportPayload;
use crate::data::data_provider::ExportSink;
use crate::error::ExportError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Credentials resolved from [`ExportConfig`]; all three must be present
struct Credentials<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    dataset_id: &'a str,
}

/// Replaces the contents of a dataset in the external analytics store
pub struct AnalyticsSink {
    config: ExportConfig,
    client: reqwest::Client,
}

impl AnalyticsSink {
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn credentials(&self) -> Result<Credentials<'_>, ExportError> {
        fn required<'a>(value: &'a Option<String>, what: &str) -> Result<&'a str, ExportError> {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    ExportError::Configuration(format!(
                        "export {} is missing. Check [export] in the config file or the environment.",
                        what
                    ))
                })
        }

        Ok(Credentials {
            client_id: required(&self.config.client_id, "client id")?,
            client_secret: required(&self.config.client_secret, "client secret")?,
            dataset_id: required(&self.config.dataset_id, "dataset id")?,
        })
    }

    fn dataset_url(&self, dataset_id: &str) -> String {
        format!(
            "{}/datasets/{}/data",
            self.config.api_base_url.trim_end_matches('/'),
            dataset_id
        )
    }

    async fn access_token(&self, credentials: &Credentials<'_>) -> Result<String, ExportError> {
        debug!(target: "export", "Requesting access token from {}", self.config.auth_url);
        let response = self
            .client
            .post(&self.config.auth_url)
            .basic_auth(credentials.client_id, Some(credentials.client_secret))
            .json(&json!({ "grant_type": "client_credentials", "scope": "data" }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExportError::Http {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl ExportSink for AnalyticsSink {
    fn name(&self) -> &str {
        "analytics"
    }

    async fn push(&self, payload: &ExportPayload) -> Result<(), ExportError> {
        let credentials = self.credentials()?;
        let token = self.access_token(&credentials).await?;
        let url = self.dataset_url(credentials.dataset_id);

        info!(target: "export", "Pushing {} rows to dataset {}", payload.len(), credentials.dataset_id);
        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .json(&payload.records)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExportError::Http {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

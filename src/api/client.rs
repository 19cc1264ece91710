use crate::data::data_provider::{Account, DataProvider};
use crate::data::model::{Column, Document, Page, Row, Table};
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, trace};

/// List endpoints wrap their results in `{"items": [...]}`
#[derive(Debug, Deserialize)]
struct ItemList<T> {
    items: Vec<T>,
}

/// REST client for the hierarchical document store
#[derive(Clone)]
pub struct RestProvider {
    base_url: String,
    browser_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl RestProvider {
    pub fn new(base_url: &str, browser_url: &str, token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            browser_url: browser_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            client: reqwest::Client::new(),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn token(&self) -> Result<&str, ProviderError> {
        self.token.as_deref().ok_or_else(|| {
            ProviderError::Configuration(
                "API token is missing. Set GRID_SYNC_API_TOKEN or [api].token in the config file."
                    .to_string(),
            )
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn table_path(document_id: &str, table_id: &str) -> String {
        format!("/docs/{}/tables/{}", document_id, table_id)
    }

    pub fn document_link(&self, document_id: &str) -> String {
        format!("{}/d/{}", self.browser_url, document_id)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        let token = self.token()?;
        let url = self.url(path);
        debug!(target: "api", "GET {}", url);

        let response = self.client.get(&url).bearer_auth(token).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        trace!(target: "api", "GET {} -> {} bytes", url, body.len());
        decode(&body)
    }

    async fn get_items<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ProviderError> {
        let list: ItemList<T> = self.get(path).await?;
        Ok(list.items)
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))
}

/// Request body for a single-cell update
fn cell_update_body(column_id: &str, value: &str) -> serde_json::Value {
    json!({
        "row": {
            "cells": [{ "column": column_id, "value": value }]
        }
    })
}

#[async_trait]
impl DataProvider for RestProvider {
    async fn whoami(&self) -> Result<Account, ProviderError> {
        self.get("/whoami").await
    }

    async fn list_documents(&self) -> Result<Vec<Document>, ProviderError> {
        let mut documents: Vec<Document> = self.get_items("/docs").await?;
        for doc in &mut documents {
            doc.browser_url = Some(self.document_link(&doc.id));
        }
        Ok(documents)
    }

    async fn get_pages(&self, document_id: &str) -> Result<Vec<Page>, ProviderError> {
        self.get_items(&format!("/docs/{}/pages", document_id)).await
    }

    async fn list_tables(&self, document_id: &str) -> Result<Vec<Table>, ProviderError> {
        self.get_items(&format!("/docs/{}/tables", document_id)).await
    }

    async fn get_table_metadata(
        &self,
        document_id: &str,
        table_id: &str,
    ) -> Result<Table, ProviderError> {
        self.get(&Self::table_path(document_id, table_id)).await
    }

    async fn get_columns(
        &self,
        document_id: &str,
        table_id: &str,
    ) -> Result<Vec<Column>, ProviderError> {
        let path = format!("{}/columns", Self::table_path(document_id, table_id));
        self.get_items(&path).await
    }

    async fn get_rows(&self, document_id: &str, table_id: &str) -> Result<Vec<Row>, ProviderError> {
        let path = format!("{}/rows", Self::table_path(document_id, table_id));
        self.get_items(&path).await
    }

    async fn get_row(
        &self,
        document_id: &str,
        table_id: &str,
        row_id: &str,
    ) -> Result<Row, ProviderError> {
        let path = format!("{}/rows/{}", Self::table_path(document_id, table_id), row_id);
        self.get(&path).await
    }

    async fn update_cell(
        &self,
        document_id: &str,
        table_id: &str,
        row_id: &str,
        column_id: &str,
        value: &str,
    ) -> Result<(), ProviderError> {
        let token = self.token()?;
        let url = self.url(&format!(
            "{}/rows/{}",
            Self::table_path(document_id, table_id),
            row_id
        ));
        debug!(target: "api", "PUT {} ({})", url, column_id);

        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .json(&cell_update_body(column_id, value))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

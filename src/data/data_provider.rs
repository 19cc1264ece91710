//! Collaborator traits for the remote stores
//!
//! The sync core only talks to the outside world through these two traits.
//! HTTP implementations live in [`crate::api`]; tests use in-memory fakes.

use crate::data::data_exporter::ExportPayload;
use crate::data::model::{Column, Document, Page, Row, Table};
use crate::error::{ExportError, ProviderError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identity behind the configured credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    #[serde(rename = "loginId", default, skip_serializing_if = "Option::is_none")]
    pub login_id: Option<String>,
}

/// Read access to documents, pages, tables, columns and rows, plus single-cell writes.
///
/// Every method is one network round-trip.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Check that the credential is accepted
    async fn whoami(&self) -> Result<Account, ProviderError>;

    async fn list_documents(&self) -> Result<Vec<Document>, ProviderError>;

    async fn get_pages(&self, document_id: &str) -> Result<Vec<Page>, ProviderError>;

    /// Tables of a document. Entries usually lack `parent`.
    async fn list_tables(&self, document_id: &str) -> Result<Vec<Table>, ProviderError>;

    /// Full table metadata, including the resolved parent page
    async fn get_table_metadata(
        &self,
        document_id: &str,
        table_id: &str,
    ) -> Result<Table, ProviderError>;

    async fn get_columns(
        &self,
        document_id: &str,
        table_id: &str,
    ) -> Result<Vec<Column>, ProviderError>;

    async fn get_rows(&self, document_id: &str, table_id: &str)
        -> Result<Vec<Row>, ProviderError>;

    async fn get_row(
        &self,
        document_id: &str,
        table_id: &str,
        row_id: &str,
    ) -> Result<Row, ProviderError>;

    /// Write one cell. `value` is already coerced to text.
    async fn update_cell(
        &self,
        document_id: &str,
        table_id: &str,
        row_id: &str,
        column_id: &str,
        value: &str,
    ) -> Result<(), ProviderError>;
}

/// Destination for a denormalized table export
#[async_trait]
pub trait ExportSink: Send + Sync {
    /// Short label used in status messages
    fn name(&self) -> &str;

    async fn push(&self, payload: &ExportPayload) -> Result<(), ExportError>;
}

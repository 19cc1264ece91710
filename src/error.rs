//! Error types shared across the sync core
//!
//! Load-path errors are terminal for the operation that raised them, edit-path
//! errors never touch the in-memory snapshot.

use thiserror::Error;

/// Failure reported by a [`DataProvider`](crate::data::data_provider::DataProvider) call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// A required credential or setting is missing. Raised before any request is sent.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The remote store answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl ProviderError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Which of the three snapshot fetches failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Metadata,
    Columns,
    Rows,
}

impl std::fmt::Display for LoadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stage = match self {
            LoadStage::Metadata => "metadata",
            LoadStage::Columns => "columns",
            LoadStage::Rows => "rows",
        };
        f.write_str(stage)
    }
}

/// A table snapshot could not be assembled. No partial snapshot exists.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to load {stage} for table {table_id}: {source}")]
pub struct LoadError {
    pub table_id: String,
    pub stage: LoadStage,
    #[source]
    pub source: ProviderError,
}

/// The document structure (documents, pages or tables list) could not be fetched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to build structure for document {document_id}: {source}")]
pub struct StructureError {
    pub document_id: String,
    #[source]
    pub source: ProviderError,
}

/// A background cell write failed. The optimistic local value is kept.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to save cell {row_id}/{column_id}: {source}")]
pub struct PersistError {
    pub row_id: String,
    pub column_id: String,
    #[source]
    pub source: ProviderError,
}

/// An optimistic edit was rejected before touching the snapshot.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("no table is loaded")]
    NoSnapshot,

    #[error("table {shown} is being replaced by {selected}; wait for it to load")]
    SelectionChanged { shown: String, selected: String },

    #[error("row {0} is not part of the loaded table")]
    UnknownRow(String),

    #[error("column {0} is not part of the loaded table")]
    UnknownColumn(String),

    #[error("cell {row_id}/{column_id} holds a structured value and cannot be edited")]
    NotEditable { row_id: String, column_id: String },
}

/// Pushing a snapshot to an export sink failed.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no table is loaded, nothing to export")]
    NothingToExport,

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<reqwest::Error> for ExportError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_names_stage_and_table() {
        let err = LoadError {
            table_id: "grid-1".to_string(),
            stage: LoadStage::Columns,
            source: ProviderError::Http {
                status: 404,
                message: "not found".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "failed to load columns for table grid-1: HTTP 404: not found"
        );
    }

    #[test]
    fn test_configuration_is_detectable() {
        assert!(ProviderError::Configuration("token".into()).is_configuration());
        assert!(!ProviderError::Transport("reset".into()).is_configuration());
    }
}

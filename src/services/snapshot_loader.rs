use crate::data::column_order::{order_columns, ColumnPins};
use crate::data::data_provider::DataProvider;
use crate::data::snapshot::TableSnapshot;
use crate::error::{LoadError, LoadStage, ProviderError};
use std::sync::Arc;
use tracing::{debug, info};

/// Service responsible for assembling one consistent table snapshot.
///
/// Metadata, columns and rows are fetched together; the first failure aborts
/// the load and nothing partial is returned.
#[derive(Clone)]
pub struct SnapshotLoader {
    provider: Arc<dyn DataProvider>,
    pins: ColumnPins,
}

impl SnapshotLoader {
    pub fn new(provider: Arc<dyn DataProvider>, pins: ColumnPins) -> Self {
        Self { provider, pins }
    }

    pub fn pins(&self) -> &ColumnPins {
        &self.pins
    }

    pub async fn load(
        &self,
        document_id: &str,
        table_id: &str,
    ) -> Result<TableSnapshot, LoadError> {
        info!(target: "snapshot", "Loading table {} from document {}", table_id, document_id);
        let start = std::time::Instant::now();

        let fail_at = |stage: LoadStage| {
            move |source: ProviderError| LoadError {
                table_id: table_id.to_string(),
                stage,
                source,
            }
        };

        let (metadata, columns, rows) = tokio::try_join!(
            async {
                self.provider
                    .get_table_metadata(document_id, table_id)
                    .await
                    .map_err(fail_at(LoadStage::Metadata))
            },
            async {
                self.provider
                    .get_columns(document_id, table_id)
                    .await
                    .map_err(fail_at(LoadStage::Columns))
            },
            async {
                self.provider
                    .get_rows(document_id, table_id)
                    .await
                    .map_err(fail_at(LoadStage::Rows))
            },
        )?;

        let columns = order_columns(&columns, self.pins.for_table(table_id));
        debug!(
            target: "snapshot",
            "Table {} loaded: {} columns, {} rows in {:?}",
            table_id,
            columns.len(),
            rows.len(),
            start.elapsed()
        );

        Ok(TableSnapshot::new(document_id, metadata, columns, rows))
    }
}

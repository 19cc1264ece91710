//! Navigation controller: which document and table are shown, and their load state
//!
//! Every navigation action bumps a generation number before it suspends. A
//! continuation only commits if the generation is still the one it started
//! with, so a slow response for an earlier selection can never overwrite a
//! newer one.

use crate::data::column_order::ColumnPins;
use crate::data::data_exporter::ExportPayload;
use crate::data::data_provider::{DataProvider, ExportSink};
use crate::data::model::{ActiveSelection, CellValue};
use crate::data::snapshot::TableSnapshot;
use crate::error::{EditError, ExportError, PersistError};
use crate::services::edit_service::{apply_edit, CellEdit, EditEngine, PersistTracker};
use crate::services::snapshot_loader::SnapshotLoader;
use crate::services::structure_service::{StructureTree, StructureTreeBuilder};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NavPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// How a navigation action ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The action committed and left the controller in this phase
    Applied(NavPhase),
    /// A newer action started meanwhile; this result was discarded
    Superseded,
}

/// The `(documentId, tableId)` opened on mount
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationDefaults {
    pub document_id: String,
    pub table_id: String,
}

/// All shared navigation state, mutated only through the controller
#[derive(Debug, Clone, Default)]
pub struct NavState {
    pub phase: NavPhase,
    pub selection: ActiveSelection,
    pub snapshot: Option<TableSnapshot>,
    pub tree: Option<StructureTree>,
    /// Set when the last structure build failed; navigation is unavailable
    pub structure_error: Option<String>,
    pub generation: u64,
    /// Bumped by every structure build; only the newest build may commit
    pub structure_generation: u64,
}

impl NavState {
    fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.phase = NavPhase::Loading;
        self.generation
    }

    fn begin_structure(&mut self) -> u64 {
        self.structure_generation += 1;
        self.structure_generation
    }

    /// Whether a tree built for `document_id` under `structure` may be committed
    fn accepts_structure(&self, document_id: &str, structure: u64) -> bool {
        self.shows_document(document_id) && self.structure_generation == structure
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    fn shows_document(&self, document_id: &str) -> bool {
        self.selection.document_id.as_deref() == Some(document_id)
    }

    /// Whether `snapshot` is the table the selection points at
    fn selection_shows(&self, snapshot: &TableSnapshot) -> bool {
        self.shows_document(snapshot.document_id())
            && self.selection.table_id.as_deref() == Some(snapshot.table_id())
    }
}

#[derive(Clone)]
pub struct NavigationController {
    provider: Arc<dyn DataProvider>,
    tree_builder: StructureTreeBuilder,
    loader: SnapshotLoader,
    edits: EditEngine,
    defaults: NavigationDefaults,
    state: Arc<Mutex<NavState>>,
}

impl NavigationController {
    pub fn new(
        provider: Arc<dyn DataProvider>,
        defaults: NavigationDefaults,
        pins: ColumnPins,
    ) -> Self {
        Self {
            tree_builder: StructureTreeBuilder::new(Arc::clone(&provider)),
            loader: SnapshotLoader::new(Arc::clone(&provider), pins),
            edits: EditEngine::new(Arc::clone(&provider)),
            provider,
            defaults,
            state: Arc::new(Mutex::new(NavState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NavState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn provider(&self) -> &Arc<dyn DataProvider> {
        &self.provider
    }

    pub fn state(&self) -> NavState {
        self.lock().clone()
    }

    pub fn phase(&self) -> NavPhase {
        self.lock().phase.clone()
    }

    pub fn selection(&self) -> ActiveSelection {
        self.lock().selection.clone()
    }

    pub fn snapshot(&self) -> Option<TableSnapshot> {
        self.lock().snapshot.clone()
    }

    pub fn tree(&self) -> Option<StructureTree> {
        self.lock().tree.clone()
    }

    pub fn structure_error(&self) -> Option<String> {
        self.lock().structure_error.clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn persist_tracker(&self) -> &PersistTracker {
        self.edits.tracker()
    }

    /// First navigation: open the configured default document and table
    pub async fn mount(&self) -> Transition {
        if self.phase() != NavPhase::Idle {
            debug!(target: "navigation", "mount() called again, reopening defaults");
        }
        let NavigationDefaults {
            document_id,
            table_id,
        } = self.defaults.clone();
        info!(target: "navigation", "Mounting with {}/{}", document_id, table_id);
        self.open(&document_id, &table_id).await
    }

    /// Load a table by id, switching document if needed.
    ///
    /// The structure tree is rebuilt alongside when the document changes.
    /// Works for tables that are not attached to any page.
    pub async fn open(&self, document_id: &str, table_id: &str) -> Transition {
        let document_changed = {
            let mut state = self.lock();
            let changed = !state.shows_document(document_id);
            if changed {
                state.selection.document_id = Some(document_id.to_string());
                state.snapshot = None;
                state.tree = None;
                state.structure_error = None;
            }
            changed
        };

        if document_changed {
            let (_, transition) =
                tokio::join!(self.reload_structure(document_id), self.select_table(table_id));
            transition
        } else {
            self.select_table(table_id).await
        }
    }

    /// Switch document: clear the table, rebuild the tree and open its first table
    pub async fn select_document(&self, document_id: &str) -> Transition {
        let (generation, structure) = {
            let mut state = self.lock();
            state.selection = ActiveSelection {
                document_id: Some(document_id.to_string()),
                table_id: None,
            };
            state.snapshot = None;
            state.tree = None;
            state.structure_error = None;
            (state.begin(), state.begin_structure())
        };
        info!(target: "navigation", "Selecting document {}", document_id);

        let first_table = {
            let tree = self.tree_builder.build(document_id).await;
            let mut state = self.lock();
            if !state.accepts_structure(document_id, structure) {
                debug!(target: "navigation", "Structure for {} arrived after a document switch", document_id);
                return Transition::Superseded;
            }
            match tree {
                Ok(tree) => {
                    let first = tree.first_table().map(|t| t.id.clone());
                    state.tree = Some(tree);
                    first
                }
                Err(e) => {
                    warn!(target: "navigation", "{}", e);
                    state.structure_error = Some(e.to_string());
                    None
                }
            }
        };

        match first_table {
            Some(table_id) => {
                if !self.lock().is_current(generation) {
                    return Transition::Superseded;
                }
                self.select_table(&table_id).await
            }
            None => {
                let mut state = self.lock();
                if !state.is_current(generation) {
                    return Transition::Superseded;
                }
                info!(target: "navigation", "Document {} has no table to show", document_id);
                state.phase = NavPhase::Ready;
                Transition::Applied(NavPhase::Ready)
            }
        }
    }

    /// Load a table of the current document, replacing the snapshot on success
    /// and clearing it on failure
    pub async fn select_table(&self, table_id: &str) -> Transition {
        let (generation, document_id) = {
            let mut state = self.lock();
            let Some(document_id) = state.selection.document_id.clone() else {
                state.begin();
                state.snapshot = None;
                state.phase = NavPhase::Failed("no document selected".to_string());
                return Transition::Applied(state.phase.clone());
            };
            state.selection.table_id = Some(table_id.to_string());
            (state.begin(), document_id)
        };

        let result = self.loader.load(&document_id, table_id).await;

        let mut state = self.lock();
        if !state.is_current(generation) {
            debug!(
                target: "navigation",
                "Discarding stale load of {} (generation {}, now {})",
                table_id,
                generation,
                state.generation
            );
            return Transition::Superseded;
        }

        match result {
            Ok(snapshot) => {
                info!(
                    target: "navigation",
                    "Showing table {} ({} rows)",
                    snapshot.metadata().name,
                    snapshot.row_count()
                );
                state.snapshot = Some(snapshot);
                state.phase = NavPhase::Ready;
            }
            Err(e) => {
                error!(target: "navigation", "{}", e);
                state.snapshot = None;
                state.phase = NavPhase::Failed(e.to_string());
            }
        }
        Transition::Applied(state.phase.clone())
    }

    /// Reload the active table from the store, dropping local state
    pub async fn refresh(&self) -> Transition {
        let selection = self.selection();
        match (selection.document_id, selection.table_id) {
            (_, Some(table_id)) => self.select_table(&table_id).await,
            (Some(document_id), None) => self.select_document(&document_id).await,
            (None, None) => self.mount().await,
        }
    }

    /// Rebuild the structure tree of `document_id` without touching the table view
    pub async fn reload_structure(&self, document_id: &str) {
        let structure = self.lock().begin_structure();
        let tree = self.tree_builder.build(document_id).await;
        let mut state = self.lock();
        if !state.accepts_structure(document_id, structure) {
            debug!(target: "navigation", "Dropping stale structure for {}", document_id);
            return;
        }
        match tree {
            Ok(tree) => {
                state.tree = Some(tree);
                state.structure_error = None;
            }
            Err(e) => {
                warn!(target: "navigation", "{}", e);
                state.tree = None;
                state.structure_error = Some(e.to_string());
            }
        }
    }

    /// Apply an edit to the shown table now and persist it in the background.
    ///
    /// Refused while a different table is being loaded over the shown one.
    /// The returned handle may be dropped; failures are also recorded in the
    /// [`PersistTracker`] and never revert the local value.
    pub fn edit_cell(
        &self,
        row_id: &str,
        column_id: &str,
        value: CellValue,
    ) -> Result<JoinHandle<Result<(), PersistError>>, EditError> {
        let edit = {
            let mut state = self.lock();
            let snapshot = state.snapshot.as_ref().ok_or(EditError::NoSnapshot)?;
            if !state.selection_shows(snapshot) {
                return Err(EditError::SelectionChanged {
                    shown: snapshot.table_id().to_string(),
                    selected: state.selection.table_id.clone().unwrap_or_default(),
                });
            }
            let updated = apply_edit(snapshot, row_id, column_id, value.clone())?;
            let edit = CellEdit {
                document_id: updated.document_id().to_string(),
                table_id: updated.table_id().to_string(),
                row_id: row_id.to_string(),
                column_id: column_id.to_string(),
                value,
            };
            state.snapshot = Some(updated);
            edit
        };
        debug!(target: "navigation", "Edited {}/{}", edit.row_id, edit.column_id);
        Ok(self.edits.spawn_persist(edit))
    }

    /// Push the shown table, as it is locally, to `sink`
    pub async fn export(&self, sink: &dyn ExportSink) -> Result<usize, ExportError> {
        let snapshot = self.snapshot().ok_or(ExportError::NothingToExport)?;
        let payload = ExportPayload::from_snapshot(&snapshot);
        sink.push(&payload).await?;
        info!(
            target: "export",
            "Exported {} rows of {} to {}",
            payload.len(),
            snapshot.metadata().name,
            sink.name()
        );
        Ok(payload.len())
    }
}

pub mod edit_service;
pub mod snapshot_loader;
pub mod structure_service;

pub use edit_service::{
    apply_edit, CellEdit, EditEngine, PersistCounts, PersistFailurePolicy, PersistNotice,
    PersistTracker, KEEP_OPTIMISTIC_ON_PERSIST_FAILURE,
};
pub use snapshot_loader::SnapshotLoader;
pub use structure_service::{
    EntryKind, OrphanPolicy, OutlineEntry, PageWithTables, StructureTree, StructureTreeBuilder,
    TreeOptions,
};

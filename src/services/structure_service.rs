//! Document structure: pages with their tables, and the outline shown for navigation
//!
//! The table list does not say which page a table lives on, so every table's
//! metadata is fetched to resolve its parent. A failed metadata fetch leaves
//! that table without a parent instead of failing the whole build.

use crate::data::data_provider::DataProvider;
use crate::data::model::{Document, Page, Table};
use crate::error::StructureError;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A page together with the tables whose parent resolved to it
#[derive(Debug, Clone, PartialEq)]
pub struct PageWithTables {
    pub page: Page,
    pub tables: Vec<Table>,
}

/// What to do with pages and tables whose parent cannot be placed in the tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanPolicy {
    /// Leave them out of the outline. They stay loadable by id.
    #[default]
    Hide,
    /// Collect them under a synthetic "Unfiled" node
    Unfiled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeOptions {
    /// Deepest page level rendered, root pages are level 0. `None` renders everything.
    pub max_depth: Option<usize>,
    pub orphans: OrphanPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Page,
    Table,
    Unfiled,
}

/// One line of the rendered outline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub depth: usize,
    pub kind: EntryKind,
    pub id: String,
    pub name: String,
}

impl OutlineEntry {
    fn page(page: &Page, depth: usize) -> Self {
        Self {
            depth,
            kind: EntryKind::Page,
            id: page.id.clone(),
            name: page.name.clone(),
        }
    }

    fn table(table: &Table, depth: usize) -> Self {
        Self {
            depth,
            kind: EntryKind::Table,
            id: table.id.clone(),
            name: table.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructureTree {
    pub document_id: String,
    pub documents: Vec<Document>,
    /// Pages in fetch order, each with its resolved tables
    pub pages: Vec<PageWithTables>,
    /// Tables whose parent did not resolve to a page of this document
    pub orphan_tables: Vec<Table>,
}

impl StructureTree {
    /// Group tables under pages by resolved parent id
    pub fn assemble(
        document_id: impl Into<String>,
        documents: Vec<Document>,
        pages: Vec<Page>,
        tables: Vec<Table>,
    ) -> Self {
        let page_ids: HashSet<&str> = pages.iter().map(|p| p.id.as_str()).collect();
        let mut by_parent: HashMap<String, Vec<Table>> = HashMap::new();
        let mut orphan_tables = Vec::new();

        for table in tables {
            let parent_id = table
                .parent
                .as_ref()
                .filter(|parent| parent.is_page() && page_ids.contains(parent.id.as_str()))
                .map(|parent| parent.id.clone());
            match parent_id {
                Some(id) => by_parent.entry(id).or_default().push(table),
                None => orphan_tables.push(table),
            }
        }

        let pages = pages
            .into_iter()
            .map(|page| {
                let tables = by_parent.remove(&page.id).unwrap_or_default();
                PageWithTables { page, tables }
            })
            .collect();

        Self {
            document_id: document_id.into(),
            documents,
            pages,
            orphan_tables,
        }
    }

    /// First table of the first page that has one, in page fetch order
    pub fn first_table(&self) -> Option<&Table> {
        self.pages.iter().find_map(|p| p.tables.first())
    }

    pub fn table_count(&self) -> usize {
        self.pages.iter().map(|p| p.tables.len()).sum::<usize>() + self.orphan_tables.len()
    }

    pub fn find_table(&self, table_id: &str) -> Option<&Table> {
        self.pages
            .iter()
            .flat_map(|p| p.tables.iter())
            .chain(self.orphan_tables.iter())
            .find(|t| t.id == table_id)
    }

    fn is_root(&self, page: &Page) -> bool {
        match page.parent.as_ref() {
            None => true,
            Some(parent) => !parent.is_page(),
        }
    }

    /// Flatten the tree for display.
    ///
    /// Root pages are those without a page parent. Under each page its
    /// subpages come first, then its own tables. Pages reachable from no root
    /// (dangling parent or a cycle) are orphans.
    pub fn outline(&self, options: &TreeOptions) -> Vec<OutlineEntry> {
        let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, entry) in self.pages.iter().enumerate() {
            if let Some(parent_id) = entry.page.parent_page_id() {
                children.entry(parent_id).or_default().push(i);
            }
        }

        let mut out = Vec::new();
        let mut visited = vec![false; self.pages.len()];

        for (i, entry) in self.pages.iter().enumerate() {
            if self.is_root(&entry.page) {
                self.walk(i, 0, &children, options, &mut visited, &mut out);
            }
        }

        if options.orphans == OrphanPolicy::Unfiled {
            let orphan_pages: Vec<usize> =
                (0..self.pages.len()).filter(|&i| !visited[i]).collect();
            if !orphan_pages.is_empty() || !self.orphan_tables.is_empty() {
                out.push(OutlineEntry {
                    depth: 0,
                    kind: EntryKind::Unfiled,
                    id: String::new(),
                    name: "Unfiled".to_string(),
                });
                for i in orphan_pages {
                    let entry = &self.pages[i];
                    out.push(OutlineEntry::page(&entry.page, 1));
                    out.extend(entry.tables.iter().map(|t| OutlineEntry::table(t, 2)));
                }
                out.extend(self.orphan_tables.iter().map(|t| OutlineEntry::table(t, 1)));
            }
        }

        out
    }

    fn walk(
        &self,
        index: usize,
        depth: usize,
        children: &HashMap<&str, Vec<usize>>,
        options: &TreeOptions,
        visited: &mut [bool],
        out: &mut Vec<OutlineEntry>,
    ) {
        if visited[index] {
            return;
        }
        visited[index] = true;

        let within_depth = options.max_depth.map_or(true, |max| depth <= max);
        let entry = &self.pages[index];
        if within_depth {
            out.push(OutlineEntry::page(&entry.page, depth));
        }

        if let Some(kids) = children.get(entry.page.id.as_str()) {
            for &child in kids {
                self.walk(child, depth + 1, children, options, visited, out);
            }
        }

        if within_depth {
            out.extend(entry.tables.iter().map(|t| OutlineEntry::table(t, depth + 1)));
        }
    }
}

/// Builds the [`StructureTree`] of one document
#[derive(Clone)]
pub struct StructureTreeBuilder {
    provider: Arc<dyn DataProvider>,
}

impl StructureTreeBuilder {
    pub fn new(provider: Arc<dyn DataProvider>) -> Self {
        Self { provider }
    }

    pub async fn build(&self, document_id: &str) -> Result<StructureTree, StructureError> {
        info!(target: "structure", "Building structure for document {}", document_id);
        let wrap = |source| StructureError {
            document_id: document_id.to_string(),
            source,
        };

        let (documents, pages, tables) = tokio::try_join!(
            self.provider.list_documents(),
            self.provider.get_pages(document_id),
            self.provider.list_tables(document_id),
        )
        .map_err(wrap)?;

        let resolved = join_all(tables.into_iter().map(|table| async move {
            match self.provider.get_table_metadata(document_id, &table.id).await {
                Ok(metadata) => Table {
                    parent: metadata.parent,
                    ..table
                },
                Err(e) => {
                    warn!(
                        target: "structure",
                        "Metadata for table {} unavailable, leaving it unattached: {}",
                        table.id,
                        e
                    );
                    table
                }
            }
        }))
        .await;

        let tree = StructureTree::assemble(document_id, documents, pages, resolved);
        debug!(
            target: "structure",
            "Document {}: {} pages, {} tables ({} unattached)",
            document_id,
            tree.pages.len(),
            tree.table_count(),
            tree.orphan_tables.len()
        );
        Ok(tree)
    }
}

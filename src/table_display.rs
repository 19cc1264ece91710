use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use crossterm::style::Stylize;
use grid_sync::data::model::{Document, Row};
use grid_sync::data::snapshot::TableSnapshot;
use grid_sync::services::{EntryKind, OutlineEntry, PersistTracker};

pub fn display_snapshot(snapshot: &TableSnapshot, tracker: &PersistTracker) {
    let metadata = snapshot.metadata();
    let page = metadata
        .parent
        .as_ref()
        .and_then(|p| p.name.as_deref())
        .unwrap_or("-");
    println!(
        "{} {}  {} {}",
        "Table:".yellow(),
        metadata.name.as_str().bold(),
        "Page:".yellow(),
        page
    );

    if snapshot.columns().is_empty() {
        println!("{}", "Table has no columns.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let mut headers = vec![Cell::new("row").add_attribute(Attribute::Dim)];
    headers.extend(
        snapshot
            .columns()
            .iter()
            .map(|c| Cell::new(&c.name).add_attribute(Attribute::Bold)),
    );
    table.set_header(headers);

    for row in snapshot.sorted_rows() {
        let mut cells = vec![Cell::new(&row.id).add_attribute(Attribute::Dim)];
        for column in snapshot.columns() {
            let text = row.value(&column.id).map(ToString::to_string).unwrap_or_default();
            let cell = if tracker.in_flight_for(&row.id, &column.id) > 0 {
                Cell::new(format!("{text} *")).add_attribute(Attribute::Italic)
            } else {
                Cell::new(text)
            };
            cells.push(cell);
        }
        table.add_row(cells);
    }

    println!("{table}");
    let columns: Vec<String> = snapshot
        .columns()
        .iter()
        .map(|c| format!("{}={}", c.name, c.id))
        .collect();
    println!(
        "{}",
        format!("{} rows. Columns: {}", snapshot.row_count(), columns.join(", ")).green()
    );
}

/// One line per snapshot column: name, stored text, local text
pub(crate) struct RowComparison {
    pub column: String,
    pub stored: String,
    pub local: String,
}

impl RowComparison {
    pub fn differs(&self) -> bool {
        self.stored != self.local
    }
}

pub(crate) fn compare_row(
    stored: &Row,
    local: Option<&Row>,
    snapshot: &TableSnapshot,
) -> Vec<RowComparison> {
    let text = |row: Option<&Row>, column_id: &str| {
        row.and_then(|row| row.value(column_id))
            .map(ToString::to_string)
            .unwrap_or_default()
    };
    snapshot
        .columns()
        .iter()
        .map(|column| RowComparison {
            column: column.name.clone(),
            stored: text(Some(stored), &column.id),
            local: text(local, &column.id),
        })
        .collect()
}

/// Store copy of a row next to the local one; differing cells are highlighted
pub fn display_row(stored: &Row, snapshot: &TableSnapshot) {
    let local = snapshot.row(&stored.id).map(|row| row.as_ref());
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("column").add_attribute(Attribute::Bold),
        Cell::new("store").add_attribute(Attribute::Bold),
        Cell::new("local").add_attribute(Attribute::Bold),
    ]);

    for line in compare_row(stored, local, snapshot) {
        let differs = line.differs();
        let cells = [line.column, line.stored, line.local].map(|text| {
            let cell = Cell::new(text);
            if differs {
                cell.add_attribute(Attribute::Bold)
            } else {
                cell
            }
        });
        table.add_row(cells);
    }

    println!("{table}");
    if local.is_none() {
        println!("{}", "Row is not part of the local table.".yellow());
    }
}

pub fn display_documents(documents: &[Document], current: Option<&str>) {
    if documents.is_empty() {
        println!("{}", "No documents available.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("").add_attribute(Attribute::Bold),
        Cell::new("id").add_attribute(Attribute::Bold),
        Cell::new("name").add_attribute(Attribute::Bold),
        Cell::new("link").add_attribute(Attribute::Bold),
    ]);
    for doc in documents {
        let marker = if current == Some(doc.id.as_str()) { ">" } else { "" };
        table.add_row(vec![
            marker,
            doc.id.as_str(),
            doc.name.as_str(),
            doc.browser_url.as_deref().unwrap_or(""),
        ]);
    }
    println!("{table}");
}

pub fn display_outline(entries: &[OutlineEntry], current_table: Option<&str>) {
    if entries.is_empty() {
        println!("{}", "No pages to show.".yellow());
        return;
    }

    for entry in entries {
        let indent = "  ".repeat(entry.depth);
        let line = match entry.kind {
            EntryKind::Page => format!("{indent}{} ({})", entry.name, entry.id).blue().to_string(),
            EntryKind::Unfiled => format!("{indent}{}", entry.name).dark_grey().to_string(),
            EntryKind::Table if current_table == Some(entry.id.as_str()) => {
                format!("{indent}> {} ({})", entry.name, entry.id).green().bold().to_string()
            }
            EntryKind::Table => format!("{indent}  {} ({})", entry.name, entry.id),
        };
        println!("{line}");
    }
}

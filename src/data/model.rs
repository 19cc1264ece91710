//! Entities of the remote hierarchical store
//!
//! Field names follow the REST payloads so the same types deserialize straight
//! from the wire and serve as the in-memory projection.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Top-level container of pages and tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    /// Link to open the document in a browser, derived by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_url: Option<String>,
}

/// Reference to a parent node as carried by pages and tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PageRef {
    pub fn page(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: Some("page".to_string()),
            name: None,
        }
    }

    /// A parent without a type is assumed to be a page
    pub fn is_page(&self) -> bool {
        self.kind.as_deref().map_or(true, |kind| kind == "page")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<PageRef>,
}

impl Page {
    /// Id of the parent page, if the parent is a page at all
    pub fn parent_page_id(&self) -> Option<&str> {
        self.parent
            .as_ref()
            .filter(|parent| parent.is_page())
            .map(|parent| parent.id.as_str())
    }
}

/// A grid attached to one page. The table list endpoint omits `parent`,
/// only the per-table metadata carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<PageRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub name: String,
}

/// Contents of one cell.
///
/// Only the scalar variants are editable; `Structured` values are shown raw.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(Number),
    Text(String),
    Structured(Value),
}

impl CellValue {
    /// Typed input is kept verbatim as text; only blank input becomes empty.
    /// Numbers only come from the wire.
    pub fn from_input(input: &str) -> Self {
        if input.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(input.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    pub fn is_editable(&self) -> bool {
        !matches!(self, CellValue::Structured(_))
    }

    /// Text sent to the store. Empty never becomes null.
    pub fn to_transport_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(number) => number.to_string(),
            CellValue::Text(text) => text.clone(),
            CellValue::Structured(value) => value.to_string(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Empty => Value::Null,
            CellValue::Number(number) => Value::Number(number.clone()),
            CellValue::Text(text) => Value::String(text.clone()),
            CellValue::Structured(value) => value.clone(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(number) => write!(f, "{number}"),
            CellValue::Text(text) => f.write_str(text),
            CellValue::Structured(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(text: &str) -> Self {
        CellValue::Text(text.to_string())
    }
}

impl From<String> for CellValue {
    fn from(text: String) -> Self {
        CellValue::Text(text)
    }
}

impl From<i64> for CellValue {
    fn from(number: i64) -> Self {
        CellValue::Number(number.into())
    }
}

impl From<i32> for CellValue {
    fn from(number: i32) -> Self {
        CellValue::Number(number.into())
    }
}

impl From<f64> for CellValue {
    fn from(number: f64) -> Self {
        Number::from_f64(number).map_or(CellValue::Empty, CellValue::Number)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Empty, Into::into)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: String,
    /// Display position, ascending
    pub index: i64,
    /// Sparse: a missing column id is an empty cell
    #[serde(default)]
    pub values: BTreeMap<String, CellValue>,
}

impl Row {
    pub fn new(id: impl Into<String>, index: i64) -> Self {
        Self {
            id: id.into(),
            index,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, column_id: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.values.insert(column_id.into(), value.into());
        self
    }

    pub fn value(&self, column_id: &str) -> Option<&CellValue> {
        self.values.get(column_id)
    }
}

/// The `(documentId, tableId)` pair that decides which snapshot is loaded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveSelection {
    pub document_id: Option<String>,
    pub table_id: Option<String>,
}

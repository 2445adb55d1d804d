//! Editable record tables.
//!
//! A table is an ordered list of rows, each row an ordered list of cell
//! strings. Which cell holds which field is decided by a [`TableSchema`]
//! shared by rendering ([`TableRecord::field_text`]) and collecting
//! ([`TableRecord::from_cells`]), so reordering the schema moves both sides
//! together.
//!
//! ```
//! use mirror_console::models::Fact;
//! use mirror_console::table::EditableTable;
//!
//! let mut table = EditableTable::<Fact>::new();
//! let row = table.add_row(None);
//! table.set_cell(row, "type", "employer").unwrap();
//! table.set_cell(row, "confidence", "0.9").unwrap();
//!
//! let facts = table.collect();
//! assert_eq!(facts[0].kind, "employer");
//! assert_eq!(facts[0].confidence, 0.9);
//! ```

use anyhow::{bail, Result};
use std::marker::PhantomData;

use crate::models::{Fact, Preference, DEFAULT_CONFIDENCE};

/// Ordered field names, one per column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    fields: &'static [&'static str],
}

impl TableSchema {
    pub const fn new(fields: &'static [&'static str]) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &'static [&'static str] {
        self.fields
    }

    pub fn position(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| *f == field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

pub const FACT_SCHEMA: TableSchema = TableSchema::new(&["type", "value", "confidence", "source"]);
pub const PREFERENCE_SCHEMA: TableSchema =
    TableSchema::new(&["category", "value", "confidence", "source"]);

/// Coerces confidence cell text to a number.
///
/// Empty, non-numeric, and non-finite text all yield [`DEFAULT_CONFIDENCE`].
pub fn parse_confidence(text: &str) -> f64 {
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => DEFAULT_CONFIDENCE,
    }
}

/// A record that can be shown as a table row and read back from one.
pub trait TableRecord: Default {
    const SCHEMA: TableSchema;

    /// Cell text for `field`. Unknown fields render empty.
    fn field_text(&self, field: &str) -> String;

    /// Builds a record from cell text looked up by field name.
    fn from_cells(cell: impl Fn(&str) -> String) -> Self;

    fn to_cells(&self) -> Vec<String> {
        Self::SCHEMA
            .fields()
            .iter()
            .map(|f| self.field_text(f))
            .collect()
    }
}

impl TableRecord for Fact {
    const SCHEMA: TableSchema = FACT_SCHEMA;

    fn field_text(&self, field: &str) -> String {
        match field {
            "type" => self.kind.clone(),
            "value" => self.value.clone(),
            "confidence" => self.confidence.to_string(),
            "source" => self.source.clone(),
            _ => String::new(),
        }
    }

    fn from_cells(cell: impl Fn(&str) -> String) -> Self {
        Self {
            kind: cell("type"),
            value: cell("value"),
            confidence: parse_confidence(&cell("confidence")),
            source: cell("source"),
        }
    }
}

impl TableRecord for Preference {
    const SCHEMA: TableSchema = PREFERENCE_SCHEMA;

    fn field_text(&self, field: &str) -> String {
        match field {
            "category" => self.category.clone(),
            "value" => self.value.clone(),
            "confidence" => self.confidence.to_string(),
            "source" => self.source.clone(),
            _ => String::new(),
        }
    }

    fn from_cells(cell: impl Fn(&str) -> String) -> Self {
        Self {
            category: cell("category"),
            value: cell("value"),
            confidence: parse_confidence(&cell("confidence")),
            source: cell("source"),
        }
    }
}

/// Handle to a row; stays valid while other rows are added or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(u64);

impl RowId {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: RowId,
    pub cells: Vec<String>,
}

/// Rows of `R` in display order.
#[derive(Debug, Clone)]
pub struct EditableTable<R> {
    rows: Vec<Row>,
    next_id: u64,
    _record: PhantomData<R>,
}

impl<R: TableRecord> Default for EditableTable<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: TableRecord> EditableTable<R> {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 0,
            _record: PhantomData,
        }
    }

    pub fn schema(&self) -> TableSchema {
        R::SCHEMA
    }

    /// Appends a row rendered from `record`, or from `R::default()` when `None`.
    pub fn add_row(&mut self, record: Option<&R>) -> RowId {
        let cells = match record {
            Some(r) => r.to_cells(),
            None => R::default().to_cells(),
        };
        let id = RowId(self.next_id);
        self.next_id += 1;
        self.rows.push(Row { id, cells });
        id
    }

    /// Removes the row; returns `false` if it was already gone.
    pub fn remove_row(&mut self, id: RowId) -> bool {
        let before = self.rows.len();
        self.rows.retain(|r| r.id != id);
        self.rows.len() != before
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn set_cell(&mut self, id: RowId, field: &str, text: &str) -> Result<()> {
        let Some(col) = R::SCHEMA.position(field) else {
            bail!("unknown column '{}' (expected one of: {})", field, R::SCHEMA.fields().join(", "));
        };
        let Some(row) = self.rows.iter_mut().find(|r| r.id == id) else {
            bail!("row {} not found", id.get());
        };
        row.cells[col] = text.to_string();
        Ok(())
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Id of the row at display position `index`.
    pub fn row_at(&self, index: usize) -> Option<RowId> {
        self.rows.get(index).map(|r| r.id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Reads every row back into a record, in display order. Cell text is trimmed.
    pub fn collect(&self) -> Vec<R> {
        self.rows
            .iter()
            .map(|row| {
                R::from_cells(|field| {
                    R::SCHEMA
                        .position(field)
                        .and_then(|i| row.cells.get(i))
                        .map(|s| s.trim().to_string())
                        .unwrap_or_default()
                })
            })
            .collect()
    }
}

//! In-memory tables flowing through the remapping pipeline.
//!
//! [`RawTable`] is what the tabular readers produce: row-major text cells in source
//! column order. [`NormalizedTable`] is the fixed-layout result: one column vector per
//! destination position, named from the configured header list.

use crate::{
    data::{Value, display_cell},
    normalize::unique_headers,
};

pub type RawCell = Option<String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawCell>>,
    pub provenance: Option<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<RawCell>>) -> Self {
        Self {
            headers,
            rows,
            provenance: None,
        }
    }

    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(self.headers.len())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .and_then(|cell| cell.as_deref())
    }

    pub fn tag_rows(&mut self, file_id: &str) {
        self.provenance = Some(vec![file_id.to_string(); self.rows.len()]);
    }

    pub fn concat(parts: Vec<(String, RawTable)>) -> RawTable {
        let mut headers: Vec<String> = Vec::new();
        let mut rows = Vec::new();
        let mut provenance = Vec::new();
        for (file_id, part) in parts {
            if part.headers.len() > headers.len() {
                headers.extend(part.headers[headers.len()..].iter().cloned());
            }
            provenance.extend(std::iter::repeat_n(file_id, part.rows.len()));
            rows.extend(part.rows);
        }
        RawTable {
            headers,
            rows,
            provenance: Some(provenance),
        }
    }

    pub fn display_rows(&self, limit: usize) -> Vec<Vec<String>> {
        let width = self.width();
        self.rows
            .iter()
            .take(limit)
            .map(|row| {
                (0..width)
                    .map(|idx| row.get(idx).cloned().flatten().unwrap_or_default())
                    .collect()
            })
            .collect()
    }

    pub fn display_headers(&self) -> Vec<String> {
        (0..self.width())
            .map(|idx| match self.headers.get(idx) {
                Some(name) if !name.is_empty() => name.clone(),
                _ => format!("column_{}", idx + 1),
            })
            .collect()
    }
}

pub type Column = Vec<Option<Value>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedTable {
    headers: Vec<String>,
    columns: Vec<Column>,
    row_count: usize,
    provenance: Option<Vec<String>>,
}

impl NormalizedTable {
    pub(crate) fn from_columns(
        headers: Vec<String>,
        columns: Vec<Column>,
        row_count: usize,
        provenance: Option<Vec<String>>,
    ) -> Self {
        debug_assert_eq!(headers.len(), columns.len());
        debug_assert!(columns.iter().all(|column| column.len() == row_count));
        Self {
            headers,
            columns,
            row_count,
            provenance,
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn unique_headers(&self) -> Vec<String> {
        unique_headers(&self.headers)
    }

    pub fn column(&self, position: usize) -> Option<&[Option<Value>]> {
        self.columns.get(position).map(Vec::as_slice)
    }

    pub(crate) fn column_mut(&mut self, position: usize) -> Option<&mut Column> {
        self.columns.get_mut(position)
    }

    pub fn cell(&self, row: usize, position: usize) -> Option<&Value> {
        self.columns
            .get(position)
            .and_then(|column| column.get(row))
            .and_then(Option::as_ref)
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn provenance(&self) -> Option<&[String]> {
        self.provenance.as_deref()
    }

    pub fn tag_rows(&mut self, file_id: &str) {
        self.provenance = Some(vec![file_id.to_string(); self.row_count]);
    }

    pub fn append(&mut self, other: NormalizedTable) {
        let width = self.width().max(other.width());
        if other.headers.len() > self.headers.len() {
            let start = self.headers.len();
            self.headers.extend(other.headers[start..].iter().cloned());
        }
        while self.columns.len() < width {
            self.columns.push(vec![None; self.row_count]);
        }
        let mut incoming = other.columns.into_iter();
        for column in &mut self.columns {
            match incoming.next() {
                Some(values) => column.extend(values),
                None => column.extend(std::iter::repeat_n(None, other.row_count)),
            }
        }
        self.provenance = match (self.provenance.take(), other.provenance) {
            (None, None) => None,
            (mine, theirs) => {
                let mut merged = mine.unwrap_or_else(|| vec![String::new(); self.row_count]);
                merged.extend(theirs.unwrap_or_else(|| vec![String::new(); other.row_count]));
                Some(merged)
            }
        };
        self.row_count += other.row_count;
    }

    pub fn output_headers(&self, provenance_header: &str) -> Vec<String> {
        let mut headers = self.unique_headers();
        if self.provenance.is_some() {
            headers.push(provenance_header.to_string());
        }
        headers
    }

    pub fn output_row(&self, row: usize) -> Vec<String> {
        let mut cells = self
            .columns
            .iter()
            .map(|column| display_cell(column.get(row).and_then(Option::as_ref)))
            .collect::<Vec<_>>();
        if let Some(tags) = &self.provenance {
            cells.push(tags.get(row).cloned().unwrap_or_default());
        }
        cells
    }

    pub fn display_rows(&self, limit: usize) -> Vec<Vec<String>> {
        (0..self.row_count.min(limit))
            .map(|row| self.output_row(row))
            .collect()
    }
}

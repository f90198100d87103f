use std::collections::HashMap;

use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::Value,
    error::RemapError,
    frame::{Column, NormalizedTable, RawTable},
    movement::{Movement, max_destination},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum WidthPolicy {
    /// Always exactly one column per header: extra targets dropped, missing ones null.
    #[default]
    Pad,
    /// Drop extra targets but keep a narrower table when movements stop early.
    Truncate,
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    movements: Vec<Movement>,
    headers: Vec<String>,
    policy: WidthPolicy,
    target_width: usize,
}

impl Normalizer {
    pub fn new(
        movements: Vec<Movement>,
        headers: Vec<String>,
        policy: WidthPolicy,
    ) -> Result<Self, RemapError> {
        let target_width = max_destination(&movements).ok_or(RemapError::EmptyMapping)? + 1;
        Ok(Self {
            movements,
            headers,
            policy,
            target_width,
        })
    }

    pub fn movements(&self) -> &[Movement] {
        &self.movements
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn policy(&self) -> WidthPolicy {
        self.policy
    }

    pub fn target_width(&self) -> usize {
        self.target_width
    }

    pub fn output_width(&self) -> usize {
        match self.policy {
            WidthPolicy::Pad => self.headers.len(),
            WidthPolicy::Truncate => self.target_width.min(self.headers.len()),
        }
    }

    pub fn normalize(&self, raw: &RawTable) -> NormalizedTable {
        let rows = raw.row_count();
        let source_width = raw.width();
        let mut destination: Vec<Column> = vec![vec![None; rows]; self.target_width];

        for movement in &self.movements {
            let target = &mut destination[movement.destination];
            if movement.source < source_width {
                for (row, cell) in target.iter_mut().enumerate() {
                    *cell = raw
                        .cell(row, movement.source)
                        .map(|text| Value::Text(text.to_string()));
                }
            } else {
                debug!(
                    "Source column {} is beyond the input width {}; destination {} stays empty",
                    movement.source, source_width, movement.destination
                );
                target.iter_mut().for_each(|cell| *cell = None);
            }
        }

        let width = self.output_width();
        destination.truncate(width);
        destination.resize(width, vec![None; rows]);
        let headers = self.headers[..width].to_vec();

        NormalizedTable::from_columns(headers, destination, rows, raw.provenance.clone())
    }
}

/// Disambiguates repeated names: later occurrences get ` (n)`, counted per name from 1.
pub fn unique_headers<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            match seen.get_mut(name) {
                None => {
                    seen.insert(name, 0);
                    name.to_string()
                }
                Some(count) => {
                    *count += 1;
                    format!("{name} ({count})")
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::build_movements;

    fn raw(rows: &[&[&str]]) -> RawTable {
        let width = rows.iter().map(|row| row.len()).max().unwrap_or(0);
        RawTable::new(
            (0..width).map(|idx| format!("src{idx}")).collect(),
            rows.iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                        .collect()
                })
                .collect(),
        )
    }

    fn headers(count: usize) -> Vec<String> {
        (0..count).map(|idx| format!("H{idx}")).collect()
    }

    fn text_at(table: &NormalizedTable, row: usize, position: usize) -> Option<&str> {
        table.cell(row, position).and_then(Value::as_text)
    }

    #[test]
    fn later_movement_wins_on_shared_destination() {
        let movements = build_movements(&[("A", "C"), ("B", "C")]).unwrap();
        let normalizer = Normalizer::new(movements, headers(3), WidthPolicy::Pad).unwrap();
        let table = normalizer.normalize(&raw(&[&["x", "y"]]));
        assert_eq!(text_at(&table, 0, 2), Some("y"));
        assert_eq!(text_at(&table, 0, 0), None);
    }

    #[test]
    fn fan_out_copies_one_source_to_many_destinations() {
        let movements = build_movements(&[("A", "A"), ("A", "B")]).unwrap();
        let normalizer = Normalizer::new(movements, headers(2), WidthPolicy::Pad).unwrap();
        let table = normalizer.normalize(&raw(&[&["x"], &["z"]]));
        assert_eq!(text_at(&table, 1, 0), Some("z"));
        assert_eq!(text_at(&table, 1, 1), Some("z"));
    }

    #[test]
    fn missing_source_column_yields_nulls() {
        let movements = build_movements(&[("A", "A"), ("D", "B")]).unwrap();
        let normalizer = Normalizer::new(movements, headers(2), WidthPolicy::Pad).unwrap();
        let table = normalizer.normalize(&raw(&[&["x", "y"], &["u", "v"]]));
        assert!(table.column(1).unwrap().iter().all(Option::is_none));
        assert_eq!(text_at(&table, 1, 0), Some("u"));
    }

    #[test]
    fn missing_source_clears_earlier_write() {
        let movements = build_movements(&[("A", "A"), ("Z", "A")]).unwrap();
        let normalizer = Normalizer::new(movements, headers(1), WidthPolicy::Pad).unwrap();
        let table = normalizer.normalize(&raw(&[&["x"]]));
        assert_eq!(text_at(&table, 0, 0), None);
    }

    #[test]
    fn pad_policy_always_matches_header_count() {
        let narrow = build_movements(&[("A", "B")]).unwrap();
        let wide = build_movements(&[("A", "J")]).unwrap();
        for movements in [narrow, wide] {
            let normalizer = Normalizer::new(movements, headers(5), WidthPolicy::Pad).unwrap();
            let table = normalizer.normalize(&raw(&[&["1", "2", "3", "4", "5", "6", "7"]]));
            assert_eq!(table.width(), 5);
            assert_eq!(table.headers(), headers(5).as_slice());
        }
    }

    #[test]
    fn truncate_policy_keeps_narrow_tables_narrow() {
        let movements = build_movements(&[("B", "A"), ("A", "B")]).unwrap();
        let normalizer = Normalizer::new(movements, headers(4), WidthPolicy::Truncate).unwrap();
        let table = normalizer.normalize(&raw(&[&["left", "right"]]));
        assert_eq!(table.width(), 2);
        assert_eq!(table.headers(), &["H0".to_string(), "H1".to_string()]);
        assert_eq!(text_at(&table, 0, 0), Some("right"));
        assert_eq!(text_at(&table, 0, 1), Some("left"));
    }

    #[test]
    fn truncate_policy_drops_targets_past_header_list() {
        let movements = build_movements(&[("A", "A"), ("B", "E")]).unwrap();
        let normalizer = Normalizer::new(movements, headers(2), WidthPolicy::Truncate).unwrap();
        assert_eq!(normalizer.target_width(), 5);
        let table = normalizer.normalize(&raw(&[&["a", "b"]]));
        assert_eq!(table.width(), 2);
    }

    #[test]
    fn empty_mapping_is_rejected() {
        let err = Normalizer::new(Vec::new(), headers(3), WidthPolicy::Pad).unwrap_err();
        assert_eq!(err, RemapError::EmptyMapping);
    }

    #[test]
    fn raw_table_is_left_untouched() {
        let movements = build_movements(&[("A", "B")]).unwrap();
        let normalizer = Normalizer::new(movements, headers(2), WidthPolicy::Pad).unwrap();
        let source = raw(&[&["keep"]]);
        let before = source.clone();
        let _ = normalizer.normalize(&source);
        assert_eq!(source, before);
    }

    #[test]
    fn zero_rows_still_produce_named_columns() {
        let movements = build_movements(&[("A", "B")]).unwrap();
        let normalizer = Normalizer::new(movements, headers(3), WidthPolicy::Pad).unwrap();
        let table = normalizer.normalize(&RawTable::new(vec!["only".into()], Vec::new()));
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.width(), 3);
    }

    #[test]
    fn unique_headers_counts_per_name() {
        assert_eq!(
            unique_headers(&["Zn", "Cu", "Zn", "Zn"]),
            vec!["Zn", "Cu", "Zn (1)", "Zn (2)"]
        );
        assert_eq!(
            unique_headers(&["Zn (Zinc)", "Cu", "Cu", "Zn (Zinc)"]),
            vec!["Zn (Zinc)", "Cu", "Cu (1)", "Zn (Zinc) (1)"]
        );
    }
}

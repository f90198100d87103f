use clap::ValueEnum;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    config::Pipeline,
    error::RemapError,
    frame::{NormalizedTable, RawTable},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum ConsolidationMode {
    /// Concatenate raw tables, then normalize and coerce once.
    #[default]
    Batch,
    /// Normalize and coerce each file, then concatenate.
    PerFile,
}

#[derive(Debug, Clone)]
pub struct Upload {
    pub file_id: String,
    pub table: RawTable,
}

impl Upload {
    pub fn new(file_id: impl Into<String>, table: RawTable) -> Self {
        Self {
            file_id: file_id.into(),
            table,
        }
    }
}

pub fn consolidate(
    uploads: Vec<Upload>,
    pipeline: &Pipeline,
    mode: ConsolidationMode,
) -> Result<NormalizedTable, RemapError> {
    if uploads.is_empty() {
        return Err(RemapError::NoUsableInput);
    }
    info!("Consolidating {} file(s) in {:?} mode", uploads.len(), mode);
    let table = match mode {
        ConsolidationMode::Batch => {
            let parts = uploads
                .into_iter()
                .map(|upload| (upload.file_id, upload.table))
                .collect();
            let merged = RawTable::concat(parts);
            let (table, report) = pipeline.run(&merged);
            debug!("Batch coercion nulled {} cell(s)", report.total_nulled());
            table
        }
        ConsolidationMode::PerFile => {
            let mut combined: Option<NormalizedTable> = None;
            for upload in uploads {
                let (mut table, report) = pipeline.run(&upload.table);
                debug!(
                    "{}: coercion nulled {} cell(s)",
                    upload.file_id,
                    report.total_nulled()
                );
                table.tag_rows(&upload.file_id);
                match combined.as_mut() {
                    Some(existing) => existing.append(table),
                    None => combined = Some(table),
                }
            }
            combined.ok_or(RemapError::NoUsableInput)?
        }
    };
    Ok(table)
}

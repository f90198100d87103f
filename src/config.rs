use std::{fs, path::Path};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    coerce::{CoercionReport, Coercer, ColumnClasses, StatusRule},
    error::RemapError,
    frame::{NormalizedTable, RawTable},
    movement::build_movements,
    normalize::{Normalizer, WidthPolicy},
};

const BUILTIN_CONFIG: &str = include_str!("default_config.yaml");

pub const DEFAULT_PROVENANCE_HEADER: &str = "Source File";
pub const DEFAULT_DATE_FORMAT: &str = "yyyy-mm-dd";
pub const DEFAULT_COLUMN_WIDTH: f64 = 18.0;
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemapConfig {
    pub movements: Vec<(String, String)>,
    pub headers: Vec<String>,
    #[serde(default)]
    pub date_columns: Vec<String>,
    #[serde(default)]
    pub integer_columns: Vec<String>,
    #[serde(default)]
    pub decimal_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_rule: Option<StatusRule>,
    #[serde(default)]
    pub width_policy: WidthPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_headers: Option<Vec<String>>,
    #[serde(default = "default_provenance_header")]
    pub provenance_header: String,
    #[serde(default)]
    pub export: ExportOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub date_format: String,
    pub column_width: f64,
    pub sheet_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            column_width: DEFAULT_COLUMN_WIDTH,
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
        }
    }
}

fn default_provenance_header() -> String {
    DEFAULT_PROVENANCE_HEADER.to_string()
}

impl RemapConfig {
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_CONFIG).context("Parsing built-in configuration")
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening configuration file {path:?}"))?;
        Self::from_yaml(&raw).with_context(|| format!("Parsing configuration file {path:?}"))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_yaml::to_string(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Writing configuration file {path:?}"))?;
        Ok(())
    }

    pub fn compile(&self) -> Result<Pipeline, RemapError> {
        let movements = build_movements(&self.movements)?;
        let normalizer = Normalizer::new(movements, self.headers.clone(), self.width_policy)?;
        let classes = ColumnClasses::resolve(
            &self.headers,
            &self.date_columns,
            &self.integer_columns,
            &self.decimal_columns,
        )?;
        debug!(
            "Compiled {} movement(s) onto {} header(s) (destination width {})",
            normalizer.movements().len(),
            self.headers.len(),
            normalizer.target_width()
        );
        Ok(Pipeline {
            normalizer,
            coercer: Coercer::new(classes, self.status_rule.clone()),
            source_headers: self.source_headers.clone(),
            provenance_header: self.provenance_header.clone(),
            export: self.export.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    pub normalizer: Normalizer,
    pub coercer: Coercer,
    pub source_headers: Option<Vec<String>>,
    pub provenance_header: String,
    pub export: ExportOptions,
}

impl Pipeline {
    pub fn run(&self, raw: &RawTable) -> (NormalizedTable, CoercionReport) {
        let mut table = self.normalizer.normalize(raw);
        let report = self.coercer.apply(&mut table);
        (table, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{coerce::ColumnClass, column::locate};

    const SMALL: &str = r#"
movements:
  - [A, B]
  - [B, A]
headers: [First, Second, Third]
integer_columns: [B]
"#;

    #[test]
    fn builtin_configuration_compiles() {
        let config = RemapConfig::builtin().unwrap();
        assert_eq!(config.movements.len(), 58);
        assert_eq!(config.headers[0], "Sample Status");
        assert_eq!(config.width_policy, WidthPolicy::Pad);
        let pipeline = config.compile().unwrap();
        assert_eq!(pipeline.normalizer.output_width(), config.headers.len());
        let classes = pipeline.coercer.classes();
        assert_eq!(classes.class_at(locate("BB").unwrap()), ColumnClass::Integer);
        assert_eq!(classes.class_at(locate("DY").unwrap()), ColumnClass::Decimal);
        assert_eq!(classes.class_at(2), ColumnClass::Date);
        assert!(pipeline.coercer.status_rule().is_some());
    }

    #[test]
    fn missing_sections_take_defaults() {
        let config = RemapConfig::from_yaml(SMALL).unwrap();
        assert_eq!(config.provenance_header, DEFAULT_PROVENANCE_HEADER);
        assert_eq!(config.export, ExportOptions::default());
        assert!(config.status_rule.is_none());
        assert!(config.source_headers.is_none());
    }

    #[test]
    fn width_policy_reads_kebab_case() {
        let text = format!("{SMALL}width_policy: truncate\n");
        let config = RemapConfig::from_yaml(&text).unwrap();
        assert_eq!(config.width_policy, WidthPolicy::Truncate);
    }

    #[test]
    fn compile_rejects_empty_mapping() {
        let config = RemapConfig::from_yaml("movements: []\nheaders: [A]\n").unwrap();
        assert_eq!(config.compile().unwrap_err(), RemapError::EmptyMapping);
    }

    #[test]
    fn compile_rejects_invalid_labels() {
        let config = RemapConfig::from_yaml("movements: [[A, B2]]\nheaders: [A]\n").unwrap();
        assert!(matches!(
            config.compile().unwrap_err(),
            RemapError::InvalidLabel { label, .. } if label == "B2"
        ));
    }

    #[test]
    fn save_and_load_preserve_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remap.yaml");
        let config = RemapConfig::from_yaml(SMALL).unwrap();
        config.save(&path).unwrap();
        assert_eq!(RemapConfig::load(&path).unwrap(), config);
    }
}

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{consolidate::ConsolidationMode, normalize::WidthPolicy};

pub const DEFAULT_OUTPUT: &str = "mobilserv_reordered.xlsx";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Reorder spreadsheet exports into the MobilServ report layout",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Remap one or more exports into the destination layout and write the result
    Remap(RemapArgs),
    /// Preview the first rows of an input file as read
    Preview(PreviewArgs),
    /// List destination columns with their class and source columns
    Columns(ColumnsArgs),
    /// Check input files against the expected source headers
    Verify(VerifyArgs),
    /// Write the built-in configuration to a YAML file for editing
    InitConfig(InitConfigArgs),
}

#[derive(Debug, Args)]
pub struct RemapArgs {
    /// Input workbook(s) or CSV file(s), processed in the order given
    #[arg(short = 'i', long = "input", required = true, action = clap::ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// Output file (.xlsx, .csv or .tsv; '-' writes CSV to stdout)
    #[arg(short = 'o', long = "output", default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,
    /// Skip writing output; only show previews
    #[arg(long = "no-output", conflicts_with = "output")]
    pub no_output: bool,
    /// YAML configuration (defaults to the built-in MobilServ template)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Text file with `SOURCE DEST` column pairs replacing the configured movements
    #[arg(long = "mapping")]
    pub mapping: Option<PathBuf>,
    /// How multiple inputs are consolidated
    #[arg(long = "mode", value_enum, default_value = "batch")]
    pub mode: ConsolidationMode,
    /// Override how the destination table is fitted to the header list
    #[arg(long = "width-policy", value_enum)]
    pub width_policy: Option<WidthPolicy>,
    /// Number of result rows to preview (0 disables the preview)
    #[arg(long = "preview", default_value_t = 10)]
    pub preview: usize,
    /// Also preview the first rows of every input as read
    #[arg(long = "preview-source")]
    pub preview_source: bool,
    /// Reject inputs whose headers differ from the configured source headers
    #[arg(long = "check-headers")]
    pub check_headers: bool,
    /// Delimiter for CSV inputs and outputs (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of CSV inputs (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Character encoding of CSV output (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Input workbook or CSV file to preview
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    /// CSV delimiter character
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding for CSV input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    /// YAML configuration (defaults to the built-in MobilServ template)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Only list destination columns that receive data
    #[arg(long = "mapped-only")]
    pub mapped_only: bool,
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// One or more input files to check
    #[arg(short = 'i', long = "input", required = true, action = clap::ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// YAML configuration carrying `source_headers`
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// CSV delimiter character
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding for CSV inputs (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct InitConfigArgs {
    /// Destination YAML file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Overwrite the file if it exists
    #[arg(long)]
    pub force: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

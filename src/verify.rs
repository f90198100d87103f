use anyhow::{Result, ensure};
use log::{error, info};

use crate::{cli::VerifyArgs, column, error::RemapError, frame::RawTable, sheet_io};

pub fn execute(args: &VerifyArgs) -> Result<()> {
    let config = crate::load_config(args.config.as_deref())?;
    let Some(expected) = config.source_headers.as_deref() else {
        info!("Configuration defines no source headers; nothing to verify");
        return Ok(());
    };
    let options = sheet_io::ReadOptions::from_args(args.delimiter, args.input_encoding.as_deref())?;

    let mut failures = 0usize;
    for input in &args.inputs {
        let file_id = sheet_io::file_id(input);
        let outcome = sheet_io::read_input(input, &options)
            .and_then(|table| validate_headers(&file_id, &table, expected));
        match outcome {
            Ok(()) => info!("✓ {file_id} matches the expected source layout"),
            Err(err) => {
                error!("{err}");
                failures += 1;
            }
        }
    }
    ensure!(
        failures == 0,
        "{failures} of {} file(s) do not match the expected source layout",
        args.inputs.len()
    );
    Ok(())
}

/// Checks an input against the expected source header list.
///
/// Fewer columns than expected, or any expected column whose header text differs,
/// is a mismatch. Extra trailing columns are accepted.
pub fn validate_headers(
    file_id: &str,
    table: &RawTable,
    expected: &[String],
) -> Result<(), RemapError> {
    if table.headers.len() < expected.len() {
        return Err(RemapError::HeaderMismatch {
            file: file_id.to_string(),
            detail: format!(
                "expected at least {} column(s), found {}",
                expected.len(),
                table.headers.len()
            ),
        });
    }
    for (position, (want, found)) in expected.iter().zip(&table.headers).enumerate() {
        if want.trim() != found.trim() {
            return Err(RemapError::HeaderMismatch {
                file: file_id.to_string(),
                detail: format!(
                    "column {} should be '{}' but is '{}'",
                    column::label_of(position),
                    want.trim(),
                    found.trim()
                ),
            });
        }
    }
    Ok(())
}

pub fn check_source(
    expected: Option<&[String]>,
    file_id: &str,
    table: &RawTable,
) -> Result<(), RemapError> {
    match expected {
        Some(expected) => validate_headers(file_id, table, expected),
        None => Ok(()),
    }
}

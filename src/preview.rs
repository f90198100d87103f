use anyhow::Result;
use log::info;

use crate::{cli::PreviewArgs, sheet_io, table};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let options = sheet_io::ReadOptions::from_args(args.delimiter, args.input_encoding.as_deref())?;
    let raw = sheet_io::read_input(&args.input, &options)?;
    let rows = raw.display_rows(args.rows);
    table::print_preview(
        &format!("Source preview: {}", sheet_io::file_id(&args.input)),
        &raw.display_headers(),
        &rows,
        raw.row_count(),
    );
    info!(
        "Displayed {} of {} row(s) across {} column(s) from {:?}",
        rows.len(),
        raw.row_count(),
        raw.width(),
        args.input
    );
    Ok(())
}

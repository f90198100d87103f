use std::{fs, path::Path};

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{debug, info, warn};

use crate::{
    cli::RemapArgs,
    config::{Pipeline, RemapConfig},
    consolidate::{Upload, consolidate},
    error::RemapError,
    frame::{NormalizedTable, RawTable},
    movement::parse_mapping_text,
    sheet_io::{self, ReadOptions, WriteOptions},
    table, verify,
};

pub fn execute(args: &RemapArgs) -> Result<()> {
    let config = effective_config(args)?;
    let pipeline = config.compile()?;
    info!(
        "Remapping {} input(s) with {} movement(s) onto {} destination column(s)",
        args.inputs.len(),
        pipeline.normalizer.movements().len(),
        pipeline.normalizer.output_width()
    );

    let read_options = ReadOptions::from_args(args.delimiter, args.input_encoding.as_deref())?;
    let (uploads, failures) = read_uploads(args, &pipeline, &read_options);
    if !failures.is_empty() {
        warn!(
            "Skipped {} of {} file(s): {}",
            failures.len(),
            args.inputs.len(),
            failures
                .iter()
                .map(|failure| failure.file().unwrap_or("?"))
                .join(", ")
        );
    }

    let table = build_table(uploads, &pipeline, args)?;

    if args.preview > 0 {
        let headers = table.output_headers(&pipeline.provenance_header);
        let rows = table.display_rows(args.preview);
        show_preview(args, "Reordered preview", &headers, &rows, table.row_count());
    }

    if args.no_output {
        info!("Output disabled; {} row(s) not written", table.row_count());
        return Ok(());
    }
    let write_options = WriteOptions {
        export: pipeline.export.clone(),
        provenance_header: pipeline.provenance_header.clone(),
        delimiter: args.delimiter,
        encoding: sheet_io::resolve_encoding(args.output_encoding.as_deref())?,
    };
    sheet_io::write_output(&table, &args.output, &write_options)
        .with_context(|| format!("Writing output to {:?}", args.output))?;
    info!(
        "Wrote {} row(s) across {} column(s) to {:?}",
        table.row_count(),
        table.output_headers(&pipeline.provenance_header).len(),
        args.output
    );
    Ok(())
}

fn effective_config(args: &RemapArgs) -> Result<RemapConfig> {
    let mut config = crate::load_config(args.config.as_deref())?;
    if let Some(path) = &args.mapping {
        config.movements = load_mapping(path)?;
        debug!(
            "Using {} movement(s) from mapping file {:?}",
            config.movements.len(),
            path
        );
    }
    if let Some(policy) = args.width_policy {
        config.width_policy = policy;
    }
    Ok(config)
}

fn load_mapping(path: &Path) -> Result<Vec<(String, String)>> {
    let text = fs::read_to_string(path).with_context(|| format!("Reading mapping file {path:?}"))?;
    parse_mapping_text(&text).with_context(|| format!("Parsing mapping file {path:?}"))
}

fn read_uploads(
    args: &RemapArgs,
    pipeline: &Pipeline,
    options: &ReadOptions,
) -> (Vec<Upload>, Vec<RemapError>) {
    let expected = if args.check_headers {
        if pipeline.source_headers.is_none() {
            warn!("--check-headers given but the configuration defines no source_headers");
        }
        pipeline.source_headers.as_deref()
    } else {
        None
    };

    let mut uploads = Vec::with_capacity(args.inputs.len());
    let mut failures = Vec::new();
    for input in &args.inputs {
        let file_id = sheet_io::file_id(input);
        let outcome = sheet_io::read_input(input, options).and_then(|raw| {
            verify::check_source(expected, &file_id, &raw)?;
            Ok(raw)
        });
        match outcome {
            Ok(raw) => {
                info!(
                    "Loaded {file_id}: {} row(s), {} column(s)",
                    raw.row_count(),
                    raw.width()
                );
                if args.preview_source {
                    preview_source(args, &file_id, &raw);
                }
                uploads.push(Upload::new(file_id, raw));
            }
            Err(err) => {
                warn!("Skipping {err}");
                failures.push(err);
            }
        }
    }
    (uploads, failures)
}

fn preview_source(args: &RemapArgs, file_id: &str, raw: &RawTable) {
    show_preview(
        args,
        &format!("Source preview: {file_id}"),
        &raw.display_headers(),
        &raw.display_rows(args.preview.max(1)),
        raw.row_count(),
    );
}

fn writes_to_stdout(args: &RemapArgs) -> bool {
    !args.no_output && sheet_io::is_dash(&args.output)
}

fn show_preview(
    args: &RemapArgs,
    title: &str,
    headers: &[String],
    rows: &[Vec<String>],
    total_rows: usize,
) {
    if writes_to_stdout(args) {
        table::eprint_preview(title, headers, rows, total_rows);
    } else {
        table::print_preview(title, headers, rows, total_rows);
    }
}

fn build_table(
    uploads: Vec<Upload>,
    pipeline: &Pipeline,
    args: &RemapArgs,
) -> Result<NormalizedTable, RemapError> {
    match <[Upload; 1]>::try_from(uploads) {
        Ok([upload]) => {
            let (table, report) = pipeline.run(&upload.table);
            debug!(
                "{}: coercion nulled {} cell(s), status rule set {} row(s)",
                upload.file_id,
                report.total_nulled(),
                report.status_rows
            );
            Ok(table)
        }
        Err(uploads) => consolidate(uploads, pipeline, args.mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::io::Write;

    fn remap_args(extra: &[&str]) -> RemapArgs {
        let mut argv = vec!["sheet-remap", "remap"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Remap(args) => args,
            _ => panic!("expected remap command"),
        }
    }

    #[test]
    fn mapping_file_and_policy_override_configuration() {
        let mut mapping = tempfile::NamedTempFile::new().unwrap();
        writeln!(mapping, "# source dest\nA C\nB A").unwrap();
        let path = mapping.path().to_string_lossy().to_string();
        let args = remap_args(&["-i", "in.csv", "--mapping", &path, "--width-policy", "truncate"]);

        let config = effective_config(&args).unwrap();
        assert_eq!(
            config.movements,
            vec![
                ("A".to_string(), "C".to_string()),
                ("B".to_string(), "A".to_string())
            ]
        );
        assert_eq!(config.width_policy, crate::normalize::WidthPolicy::Truncate);
    }

    #[test]
    fn unreadable_inputs_are_skipped_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.csv");
        fs::write(&good, "a,b\n1,2\n").unwrap();
        let missing = dir.path().join("missing.csv");
        let args = remap_args(&[
            "-i",
            good.to_str().unwrap(),
            "-i",
            missing.to_str().unwrap(),
            "--no-output",
        ]);
        let pipeline = RemapConfig::from_yaml("movements: [[A, B]]\nheaders: [x, y]\n")
            .unwrap()
            .compile()
            .unwrap();
        let options = ReadOptions::from_args(None, None).unwrap();

        let (uploads, failures) = read_uploads(&args, &pipeline, &options);
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].file_id, "good.csv");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].file(), Some("missing.csv"));
    }

    #[test]
    fn only_dash_output_counts_as_stdout() {
        assert!(writes_to_stdout(&remap_args(&["-i", "a.csv", "-o", "-"])));
        assert!(!writes_to_stdout(&remap_args(&["-i", "a.csv", "-o", "out.csv"])));
        assert!(!writes_to_stdout(&remap_args(&["-i", "a.csv"])));
        assert!(!writes_to_stdout(&remap_args(&["-i", "a.csv", "--no-output"])));
    }

    #[test]
    fn no_surviving_upload_is_fatal() {
        let args = remap_args(&["-i", "x.csv"]);
        let pipeline = RemapConfig::from_yaml("movements: [[A, A]]\nheaders: [x]\n")
            .unwrap()
            .compile()
            .unwrap();
        let err = build_table(Vec::new(), &pipeline, &args).unwrap_err();
        assert_eq!(err, RemapError::NoUsableInput);
    }
}

//! Tabular I/O: reading uploads into raw text tables and writing normalized tables.
//!
//! - **Workbooks** (`.xlsx`, `.xlsm`, `.xls`, `.ods`, …) are read with `calamine`;
//!   the first worksheet is used and its first row is the header.
//! - **Delimited text** (`.csv`, `.tsv`, `.txt`) is read with `csv` and decoded via
//!   `encoding_rs`, defaulting to UTF-8.
//! - Output goes to `.xlsx` through `rust_xlsxwriter` (column widths and a date
//!   number format applied) or to delimited text. The `-` path writes CSV to stdout.
//!
//! Every cell is read as text; typing happens later in the coercion pass.

use std::{
    fs,
    io::{Cursor, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow, bail};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::{Datelike, NaiveDate};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

use crate::{
    config::ExportOptions,
    data::Value,
    error::RemapError,
    frame::{NormalizedTable, RawCell, RawTable},
};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';
const DELIMITED_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];
const WHOLE_FLOAT_LIMIT: f64 = 1e15;
const MAX_WORKBOOK_COLUMNS: usize = 16_384;
const MAX_WORKBOOK_ROWS: u32 = 1_048_576;

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn file_id(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn is_delimited(path: &Path) -> bool {
    extension(path).is_some_and(|ext| DELIMITED_EXTENSIONS.contains(&ext.as_str()))
}

pub fn resolve_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match extension(path).as_deref() {
        Some("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
        }
    }
}

impl ReadOptions {
    pub fn from_args(delimiter: Option<u8>, encoding: Option<&str>) -> Result<Self> {
        Ok(Self {
            delimiter,
            encoding: resolve_encoding(encoding)?,
        })
    }
}

pub fn read_input(path: &Path, options: &ReadOptions) -> Result<RawTable, RemapError> {
    let id = file_id(path);
    let bytes = fs::read(path).map_err(|err| RemapError::unreadable(&id, err))?;
    if is_delimited(path) {
        let delimiter = resolve_delimiter(path, options.delimiter);
        read_delimited(bytes.as_slice(), delimiter, options.encoding, &id)
    } else {
        read_workbook(bytes, &id)
    }
}

pub fn read_workbook(bytes: Vec<u8>, file_id: &str) -> Result<RawTable, RemapError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|err| RemapError::unreadable(file_id, err))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| RemapError::unreadable(file_id, "workbook contains no worksheets"))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|err| RemapError::unreadable(file_id, err))?;

    // Keep positions absolute when the used range does not start in column A.
    let leading = range.start().map(|(_, col)| col as usize).unwrap_or(0);
    let mut rows = range.rows().map(|cells| {
        std::iter::repeat_n(None, leading)
            .chain(cells.iter().map(cell_text))
            .collect::<Vec<RawCell>>()
    });
    let headers = rows
        .next()
        .map(|cells| cells.into_iter().map(Option::unwrap_or_default).collect())
        .unwrap_or_default();
    Ok(RawTable::new(headers, rows.collect()))
}

fn cell_text(cell: &Data) -> RawCell {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(s.clone()),
        Data::Float(n) if n.fract() == 0.0 && n.abs() < WHOLE_FLOAT_LIMIT => {
            Some(format!("{}", *n as i64))
        }
        Data::Float(n) => Some(n.to_string()),
        Data::Int(n) => Some(n.to_string()),
        Data::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => Some(
            dt.as_datetime()
                .map(|value| value.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| dt.as_f64().to_string()),
        ),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::Error(err) => Some(format!("#{err:?}")),
    }
}

pub fn read_delimited(
    bytes: &[u8],
    delimiter: u8,
    encoding: &'static Encoding,
    file_id: &str,
) -> Result<RawTable, RemapError> {
    // Decoded as a whole so UTF-16 works; a byte order mark overrides `encoding`.
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(RemapError::unreadable(
            file_id,
            format!("text is not valid {}", used.name()),
        ));
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|err| RemapError::unreadable(file_id, err))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record.map_err(|err| {
            RemapError::unreadable(file_id, format!("row {}: {err}", row_idx + 2))
        })?;
        rows.push(
            record
                .iter()
                .map(|field| (!field.is_empty()).then(|| field.to_string()))
                .collect(),
        );
    }
    Ok(RawTable::new(headers, rows))
}

#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub export: ExportOptions,
    pub provenance_header: String,
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

/// Writes the table to `path`, or CSV to stdout for `-`.
///
/// The whole file is rendered in memory first so a failure never leaves partial output.
pub fn write_output(table: &NormalizedTable, path: &Path, options: &WriteOptions) -> Result<()> {
    if is_dash(path) {
        let delimiter = options.delimiter.unwrap_or(DEFAULT_CSV_DELIMITER);
        let bytes = write_delimited(table, delimiter, options.encoding, &options.provenance_header)?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&bytes)?;
        stdout.flush()?;
        return Ok(());
    }
    let bytes = match extension(path).as_deref() {
        Some("xlsx") => write_workbook(table, &options.export, &options.provenance_header)?,
        Some(ext) if DELIMITED_EXTENSIONS.contains(&ext) => {
            let delimiter = resolve_delimiter(path, options.delimiter);
            write_delimited(table, delimiter, options.encoding, &options.provenance_header)?
        }
        _ => bail!("Unsupported output format for {path:?}; use .xlsx, .csv or .tsv"),
    };
    fs::write(path, bytes).with_context(|| format!("Creating output file {path:?}"))?;
    Ok(())
}

pub fn write_workbook(
    table: &NormalizedTable,
    options: &ExportOptions,
    provenance_header: &str,
) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(&options.sheet_name)
        .with_context(|| format!("Naming worksheet '{}'", options.sheet_name))?;

    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format(&options.date_format);

    let headers = table.output_headers(provenance_header);
    if headers.len() > MAX_WORKBOOK_COLUMNS {
        bail!(
            "{} columns exceed the workbook limit of {MAX_WORKBOOK_COLUMNS}",
            headers.len()
        );
    }
    for (col, header) in headers.iter().enumerate() {
        let col = sheet_column(col)?;
        worksheet.write_string_with_format(0, col, header, &header_format)?;
        worksheet.set_column_width(col, options.column_width)?;
    }

    for row in 0..table.row_count() {
        let excel_row = u32::try_from(row + 1)
            .ok()
            .filter(|row| *row < MAX_WORKBOOK_ROWS)
            .ok_or_else(|| anyhow!("Row {} exceeds the workbook row limit", row + 1))?;
        for position in 0..table.width() {
            let col = sheet_column(position)?;
            match table.cell(row, position) {
                None => {}
                Some(Value::Text(text)) => {
                    worksheet.write_string(excel_row, col, text)?;
                }
                Some(Value::Integer(value)) => {
                    worksheet.write_number(excel_row, col, *value as f64)?;
                }
                Some(Value::Decimal(value)) => match value.to_f64() {
                    Some(number) => {
                        worksheet.write_number(excel_row, col, number)?;
                    }
                    None => {
                        worksheet.write_string(excel_row, col, value.normalize().to_string())?;
                    }
                },
                Some(Value::Date(date)) => match excel_date(date) {
                    Some(excel_date) => {
                        worksheet.write_datetime_with_format(
                            excel_row,
                            col,
                            &excel_date,
                            &date_format,
                        )?;
                    }
                    None => {
                        // Excel has no serial number for it; keep the ISO text instead.
                        worksheet.write_string(excel_row, col, date.format("%Y-%m-%d").to_string())?;
                    }
                },
            }
        }
        if let Some(tags) = table.provenance() {
            let tag = tags.get(row).map(String::as_str).unwrap_or_default();
            worksheet.write_string(excel_row, sheet_column(table.width())?, tag)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn sheet_column(index: usize) -> Result<u16> {
    u16::try_from(index)
        .ok()
        .filter(|col| usize::from(*col) < MAX_WORKBOOK_COLUMNS)
        .ok_or_else(|| anyhow!("Column {} exceeds the workbook column limit", index.saturating_add(1)))
}

fn excel_date(date: &NaiveDate) -> Option<ExcelDateTime> {
    let year = u16::try_from(date.year()).ok()?;
    ExcelDateTime::from_ymd(year, date.month() as u8, date.day() as u8).ok()
}

pub fn write_delimited(
    table: &NormalizedTable,
    delimiter: u8,
    encoding: &'static Encoding,
    provenance_header: &str,
) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Always)
        .double_quote(true)
        .from_writer(Vec::new());
    writer
        .write_record(table.output_headers(provenance_header))
        .context("Writing output headers")?;
    for row in 0..table.row_count() {
        writer
            .write_record(table.output_row(row))
            .with_context(|| format!("Writing output row {}", row + 2))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow!("Flushing delimited output: {}", err.error()))?;
    if encoding == UTF_8 {
        return Ok(bytes);
    }
    let text = String::from_utf8(bytes).context("Delimited output is not valid UTF-8")?;
    let (encoded, _, had_errors) = encoding.encode(&text);
    if had_errors {
        bail!("Output contains characters that cannot be encoded as {}", encoding.name());
    }
    Ok(encoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{UTF_16LE, WINDOWS_1252};

    #[test]
    fn delimited_reader_maps_empty_fields_to_null() {
        let input = "a,b,c\n1,,3\n4,5\n";
        let table = read_delimited(input.as_bytes(), b',', UTF_8, "in.csv").unwrap();
        assert_eq!(table.headers, vec!["a", "b", "c"]);
        assert_eq!(
            table.rows[0],
            vec![Some("1".to_string()), None, Some("3".to_string())]
        );
        assert_eq!(table.rows[1].len(), 2);
        assert_eq!(table.width(), 3);
    }

    #[test]
    fn delimited_reader_decodes_legacy_encodings() {
        let (bytes, _, _) = WINDOWS_1252.encode("Muestra,Año\nX1,2024\n");
        let table = read_delimited(bytes.as_ref(), b',', WINDOWS_1252, "in.csv").unwrap();
        assert_eq!(table.headers[1], "Año");
    }

    #[test]
    fn delimited_reader_decodes_utf16_files() {
        let mut bytes = Vec::new();
        for unit in "ID,Lab\n7,Nörd\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let table = read_delimited(&bytes, b',', UTF_16LE, "in.csv").unwrap();
        assert_eq!(table.headers, vec!["ID", "Lab"]);
        assert_eq!(table.cell(0, 1), Some("Nörd"));
    }

    #[test]
    fn delimited_reader_rejects_invalid_bytes() {
        let err = read_delimited(b"a,b\n\xff\xfe\xfd,1\n", b',', UTF_8, "bad.csv").unwrap_err();
        assert!(matches!(err, RemapError::UnreadableFile { ref reason, .. } if reason.contains("UTF-8")));
    }

    #[test]
    fn garbage_is_not_a_workbook() {
        let err = read_workbook(b"definitely not a spreadsheet".to_vec(), "bad.xlsx").unwrap_err();
        assert!(matches!(err, RemapError::UnreadableFile { ref file, .. } if file == "bad.xlsx"));
    }

    #[test]
    fn float_cells_render_like_the_source() {
        assert_eq!(cell_text(&Data::Float(12.0)), Some("12".to_string()));
        assert_eq!(cell_text(&Data::Float(0.25)), Some("0.25".to_string()));
        assert_eq!(cell_text(&Data::String(String::new())), None);
        assert_eq!(cell_text(&Data::Bool(true)), Some("TRUE".to_string()));
    }

    #[test]
    fn dates_outside_excel_range_are_written_as_text() {
        let date = |y, m, d| Some(Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap()));
        let table = NormalizedTable::from_columns(
            vec!["Date Sampled".to_string()],
            vec![vec![
                date(202, 5, 6),
                date(1899, 12, 31),
                date(2024, 5, 6),
                date(-5, 1, 1),
            ]],
            4,
            None,
        );
        let bytes = write_workbook(&table, &ExportOptions::default(), "Source File").unwrap();
        let read_back = read_workbook(bytes, "dates.xlsx").unwrap();
        assert_eq!(read_back.cell(0, 0), Some("0202-05-06"));
        assert_eq!(read_back.cell(1, 0), Some("1899-12-31"));
        assert_eq!(read_back.cell(2, 0), Some("2024-05-06 00:00:00"));
        assert_eq!(read_back.row_count(), 4);
    }

    #[test]
    fn workbook_columns_are_range_checked() {
        assert_eq!(sheet_column(0).unwrap(), 0);
        assert_eq!(sheet_column(16_383).unwrap(), 16_383);
        assert!(sheet_column(16_384).is_err());
        assert!(sheet_column(70_000).is_err());
    }

    #[test]
    fn delimiter_follows_extension() {
        assert_eq!(resolve_delimiter(Path::new("a.tsv"), None), b'\t');
        assert_eq!(resolve_delimiter(Path::new("a.CSV"), None), b',');
        assert_eq!(resolve_delimiter(Path::new("a.csv"), Some(b';')), b';');
        assert_eq!(file_id(Path::new("/tmp/uploads/lab.xlsx")), "lab.xlsx");
    }
}

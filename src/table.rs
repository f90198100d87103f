use std::{borrow::Cow, fmt::Write as _};

const MAX_CELL_WIDTH: usize = 32;
const COLUMN_GAP: &str = "  ";

pub fn render_preview(headers: &[String], rows: &[Vec<String>], total_rows: usize) -> String {
    let header_cells = headers.iter().map(|h| clip(h)).collect::<Vec<_>>();
    let body = rows
        .iter()
        .map(|row| row.iter().map(|cell| clip(cell)).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    let mut widths = header_cells
        .iter()
        .map(|cell| visible_width(cell).max(1))
        .collect::<Vec<_>>();
    for row in &body {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(visible_width(cell));
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", join_padded(&header_cells, &widths));
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", join_padded(&rule, &widths));
    for row in &body {
        let _ = writeln!(output, "{}", join_padded(row, &widths));
    }
    let hidden = total_rows.saturating_sub(rows.len());
    if hidden > 0 {
        let _ = writeln!(output, "… {hidden} more row(s)");
    }
    output
}

pub fn print_preview(title: &str, headers: &[String], rows: &[Vec<String>], total_rows: usize) {
    println!("{title}");
    print!("{}", render_preview(headers, rows, total_rows));
}

pub fn eprint_preview(title: &str, headers: &[String], rows: &[Vec<String>], total_rows: usize) {
    eprintln!("{title}");
    eprint!("{}", render_preview(headers, rows, total_rows));
}

fn join_padded<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let cell = cell.as_ref();
            let padding = width.saturating_sub(visible_width(cell));
            format!("{cell}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join(COLUMN_GAP);
    line.trim_end().to_string()
}

fn visible_width(value: &str) -> usize {
    let mut width = 0usize;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            width += 1;
        }
    }
    width
}

fn clip(value: &str) -> Cow<'_, str> {
    let flattened: Cow<'_, str> = if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    };
    if flattened.contains('\u{1b}') || flattened.chars().count() <= MAX_CELL_WIDTH {
        return flattened;
    }
    let mut shortened = flattened
        .chars()
        .take(MAX_CELL_WIDTH - 1)
        .collect::<String>();
    shortened.push('…');
    Cow::Owned(shortened)
}

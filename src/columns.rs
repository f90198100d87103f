//! Destination column listing.
//!
//! Shows, for every destination position, its label, configured name, the unique
//! name used in output files, its coercion class and the source column(s) feeding it.

use anyhow::Result;
use itertools::Itertools;
use log::info;

use crate::{cli::ColumnsArgs, column::label_of, config::Pipeline, normalize::unique_headers, table};

pub fn execute(args: &ColumnsArgs) -> Result<()> {
    let config = crate::load_config(args.config.as_deref())?;
    let pipeline = config.compile()?;
    let rows = describe_columns(&pipeline, args.mapped_only);

    let headers = ["#", "label", "name", "output", "class", "source"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    table::print_preview("Destination columns", &headers, &rows, rows.len());
    info!(
        "Listed {} of {} destination column(s)",
        rows.len(),
        pipeline.normalizer.output_width()
    );
    Ok(())
}

pub fn describe_columns(pipeline: &Pipeline, mapped_only: bool) -> Vec<Vec<String>> {
    let normalizer = &pipeline.normalizer;
    let width = normalizer.output_width();
    let names = &normalizer.headers()[..width];
    let unique = unique_headers(names);

    (0..width)
        .filter_map(|position| {
            // Listed in movement order; the last source is the one that ends up in the column.
            let sources = normalizer
                .movements()
                .iter()
                .filter(|movement| movement.destination == position)
                .map(|movement| label_of(movement.source))
                .join(" > ");
            if mapped_only && sources.is_empty() {
                return None;
            }
            let rename = if unique[position] != names[position] {
                unique[position].clone()
            } else {
                String::new()
            };
            Some(vec![
                (position + 1).to_string(),
                label_of(position),
                names[position].clone(),
                rename,
                pipeline.coercer.classes().class_at(position).to_string(),
                sources,
            ])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemapConfig;

    #[test]
    fn describe_columns_lists_sources_and_renames() {
        let config = RemapConfig::from_yaml(
            "movements: [[A, C], [B, C], [D, A]]\nheaders: [Zn, Cu, Zn, Fe]\ndecimal_columns: [C]\n",
        )
        .unwrap();
        let pipeline = config.compile().unwrap();
        let rows = describe_columns(&pipeline, false);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], vec!["1", "A", "Zn", "", "plain", "D"]);
        assert_eq!(rows[2], vec!["3", "C", "Zn", "Zn (1)", "decimal", "A > B"]);

        let mapped = describe_columns(&pipeline, true);
        assert_eq!(mapped.len(), 2);
    }
}

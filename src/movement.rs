use anyhow::{Result, anyhow};

use crate::{column, error::RemapError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Movement {
    pub source: usize,
    pub destination: usize,
}

impl Movement {
    pub fn from_labels(source: &str, destination: &str) -> Result<Self, RemapError> {
        Ok(Movement {
            source: column::locate(source)?,
            destination: column::locate(destination)?,
        })
    }
}

/// Resolves configured label pairs into movements, keeping their order.
///
/// Order is significant: when two movements share a destination, the later one wins.
pub fn build_movements<S: AsRef<str>>(pairs: &[(S, S)]) -> Result<Vec<Movement>, RemapError> {
    pairs
        .iter()
        .map(|(source, destination)| Movement::from_labels(source.as_ref(), destination.as_ref()))
        .collect()
}

pub fn max_destination(movements: &[Movement]) -> Option<usize> {
    movements.iter().map(|movement| movement.destination).max()
}

pub fn parse_mapping_text(text: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for (line_idx, line) in text.lines().enumerate() {
        let content = line.split('#').next().unwrap_or_default();
        let mut tokens = content.split_whitespace();
        let Some(source) = tokens.next() else {
            continue;
        };
        let destination = tokens.next().ok_or_else(|| {
            anyhow!(
                "Mapping line {} has a source column '{source}' but no destination",
                line_idx + 1
            )
        })?;
        pairs.push((source.to_string(), destination.to_string()));
    }
    Ok(pairs)
}

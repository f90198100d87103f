//! Spreadsheet column addresses.
//!
//! Labels are bijective base-26 numbers (`A` = 1 … `Z` = 26) shifted to a zero-based
//! position, so `A` is 0, `Z` is 25 and `AA` is 26.

use crate::error::RemapError;

pub fn locate(label: &str) -> Result<usize, RemapError> {
    if label.is_empty() {
        return Err(invalid(label, "label is empty"));
    }
    let mut position = 0usize;
    for ch in label.chars() {
        if !ch.is_ascii_alphabetic() {
            return Err(invalid(label, "labels may only contain letters A-Z"));
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A' + 1) as usize;
        position = position
            .checked_mul(26)
            .and_then(|value| value.checked_add(digit))
            .ok_or_else(|| invalid(label, "column position is out of range"))?;
    }
    Ok(position - 1)
}

pub fn label_of(position: usize) -> String {
    let mut remaining = position;
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (remaining % 26) as u8);
        if remaining < 26 {
            break;
        }
        remaining = remaining / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

fn invalid(label: &str, reason: &'static str) -> RemapError {
    RemapError::InvalidLabel {
        label: label.to_string(),
        reason,
    }
}

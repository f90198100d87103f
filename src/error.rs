use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemapError {
    #[error("Invalid column label '{label}': {reason}")]
    InvalidLabel { label: String, reason: &'static str },

    #[error("No column movements configured")]
    EmptyMapping,

    #[error("Column {label} is configured as both {first} and {second}")]
    ClassConflict {
        label: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("{file}: not a readable spreadsheet ({reason})")]
    UnreadableFile { file: String, reason: String },

    #[error("{file}: header mismatch, {detail}")]
    HeaderMismatch { file: String, detail: String },

    #[error("No input file could be processed")]
    NoUsableInput,
}

impl RemapError {
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RemapError::UnreadableFile { .. } | RemapError::HeaderMismatch { .. }
        )
    }

    pub fn file(&self) -> Option<&str> {
        match self {
            RemapError::UnreadableFile { file, .. } | RemapError::HeaderMismatch { file, .. } => {
                Some(file)
            }
            _ => None,
        }
    }

    pub(crate) fn unreadable(file: &str, reason: impl ToString) -> Self {
        RemapError::UnreadableFile {
            file: file.to_string(),
            reason: reason.to_string(),
        }
    }
}

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Minimal configuration used by the command-line tests.
///
/// Source A feeds two destinations, C is moved to the front, and the status rule
/// fires on the `Report Status` column.
pub const LAB_CONFIG: &str = r#"
movements:
  - [A, B]
  - [A, E]
  - [C, A]
  - [D, C]
  - [E, D]
headers: [Sample Status, Sample ID, Date Sampled, Report Status, Sample ID]
date_columns: [Date Sampled]
integer_columns: [B]
status_rule:
  trigger: Report Status
  target: Sample Status
  value: Completed
source_headers: [ID, Lab, Status, Sampled, Report]
"#;

pub const LAB_EXPORT: &str = "ID,Lab,Status,Sampled,Report\n\
17,North,Pending,2024-03-05,Final\n\
18.9,South,Pending,not a date,\n";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn lab_config(&self) -> PathBuf {
        self.write("lab.yaml", LAB_CONFIG)
    }
}

pub fn str_path(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

//! Append-only log of pins.
//!
//! One line per pin: `<cid-or-path>\t<label>\n`. The file is created once at startup;
//! every write opens it in append mode, writes the whole line with one call and closes
//! it again, so concurrent pins never interleave within a line.

use crate::error::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default log file name.
pub const DEFAULT_PIN_LOG: &str = "pins.log";

/// Handle on the pin log file.
#[derive(Debug, Clone)]
pub struct PinLog {
    path: PathBuf,
}

impl PinLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file empty if it does not exist yet.
    pub fn ensure_exists(&self) -> Result<()> {
        if !self.path.exists() {
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(false)
                .open(&self.path)?;
            info!(path = ?self.path, "created pin log");
        }
        Ok(())
    }

    /// Append one entry. The file must already exist.
    pub async fn append(&self, pin: &str, label: &str) -> Result<()> {
        let line = format_entry(pin, label);
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut file = OpenOptions::new().append(true).open(&path)?;
            file.write_all(line.as_bytes())?;
            Ok(())
        })
        .await
        .map_err(std::io::Error::other)??;
        debug!(pin, label, "recorded pin");
        Ok(())
    }
}

/// Tabs and line breaks inside a field would split the record, so they become spaces.
fn format_entry(pin: &str, label: &str) -> String {
    let clean = |s: &str| s.replace(['\t', '\n', '\r'], " ");
    format!("{}\t{}\n", clean(pin), clean(label))
}

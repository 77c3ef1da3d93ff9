//! All-or-nothing file replacement

use crate::traits::StorageResult;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Replaces a file's contents in one step.
///
/// Data goes to a hidden staging file in the same directory, is synced, then
/// renamed over the target. A reader sees either the old file or the new one.
#[derive(Debug, Clone)]
pub struct AtomicWriter {
    target: PathBuf,
}

impl AtomicWriter {
    pub fn new<P: AsRef<Path>>(target: P) -> Self {
        Self {
            target: target.as_ref().to_path_buf(),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// `<dir>/.<name>.tmp-<pid>`; same filesystem as the target so rename is atomic
    fn staging_path(&self) -> PathBuf {
        let name = self
            .target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "state".to_string());
        self.target
            .with_file_name(format!(".{}.tmp-{}", name, std::process::id()))
    }

    /// Write `contents` to the target, creating missing parent directories
    pub fn replace(&self, contents: &[u8]) -> StorageResult<()> {
        if let Some(dir) = self.target.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }

        let staging = self.staging_path();
        let outcome = stage_and_swap(&staging, &self.target, contents);
        if outcome.is_err() {
            // Leave no half-written staging file behind
            let _ = fs::remove_file(&staging);
        }
        Ok(outcome?)
    }
}

fn stage_and_swap(staging: &Path, target: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(staging)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);
    fs::rename(staging, target)
}

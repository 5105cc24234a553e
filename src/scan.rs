//! Resume filter: discovery of input files that still need processing
//!
//! Walks the source tree and yields one [`WorkItem`] per accepted file whose
//! corresponding output does not exist yet. The skip decision is
//! presence-only; output content is never compared. Because a timed-out task
//! writes nothing, its file is re-offered on the next run automatically.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::WorkItem;

/// Extensions the service accepts; requesting anything else is a
/// configuration error
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png"];

/// Normalize a requested extension list
///
/// Lower-cases each entry and ensures a leading `.`, then rejects anything
/// outside [`SUPPORTED_EXTENSIONS`]. An empty request yields the full
/// supported set. Runs before any file I/O.
pub fn normalize_extensions(requested: &[String]) -> Result<Vec<String>> {
    if requested.is_empty() {
        return Ok(SUPPORTED_EXTENSIONS.iter().map(|s| s.to_string()).collect());
    }

    let mut normalized = Vec::with_capacity(requested.len());
    for ext in requested {
        let lower = ext.to_lowercase();
        let with_dot = if lower.starts_with('.') {
            lower
        } else {
            format!(".{}", lower)
        };
        if !SUPPORTED_EXTENSIONS.contains(&with_dot.as_str()) {
            return Err(Error::config(
                format!(
                    "unsupported file extension {:?} (supported: {})",
                    ext,
                    SUPPORTED_EXTENSIONS.join(", ")
                ),
                Some("extensions"),
            ));
        }
        if !normalized.contains(&with_dot) {
            normalized.push(with_dot);
        }
    }
    Ok(normalized)
}

/// Walks a source tree and yields the files still needing processing
///
/// Restartable: each [`pending`](Scanner::pending) call starts a fresh walk,
/// so a scanner built once can drive repeated runs.
#[derive(Clone, Debug)]
pub struct Scanner {
    input_root: PathBuf,
    output_root: PathBuf,
    extensions: Vec<String>,
    recursive: bool,
}

impl Scanner {
    /// Create a scanner over `input_root`, skipping files whose counterpart
    /// under `output_root` already exists
    ///
    /// `extensions` must already be normalized via [`normalize_extensions`].
    pub fn new(
        input_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        extensions: Vec<String>,
        recursive: bool,
    ) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
            extensions,
            recursive,
        }
    }

    /// Start a lazy walk of the pending files
    ///
    /// An unreadable source root fails immediately; unreadable subdirectories
    /// surface as `Err` items during iteration. Both are fatal to the run.
    pub fn pending(&self) -> Result<PendingFiles<'_>> {
        let root_dir = fs::read_dir(&self.input_root).map_err(|e| Error::SourceDir {
            path: self.input_root.clone(),
            source: e,
        })?;
        Ok(PendingFiles {
            scanner: self,
            stack: vec![(PathBuf::new(), root_dir)],
        })
    }

    /// Case-insensitive extension check against the accepted set
    fn accepts(&self, path: &Path) -> bool {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => {
                let dotted = format!(".{}", ext.to_lowercase());
                self.extensions.iter().any(|e| e == &dotted)
            }
            None => false,
        }
    }

    /// Presence-only resume probe for one candidate file
    ///
    /// `NotFound` means the file needs processing. Any other probe error is
    /// logged and drops the file from this run; it stays eligible for the
    /// next one.
    fn needs_processing(&self, relative_path: &Path) -> bool {
        let output_path = self.output_root.join(relative_path);
        match fs::metadata(&output_path) {
            Ok(_) => {
                tracing::info!(
                    file = %relative_path.display(),
                    output = %output_path.display(),
                    "skipping file, output already exists"
                );
                false
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                tracing::warn!(
                    file = %relative_path.display(),
                    output = %output_path.display(),
                    error = %e,
                    "could not probe output path, leaving file for a later run"
                );
                false
            }
        }
    }
}

/// Lazy iterator over the pending [`WorkItem`]s of one walk
///
/// Yields `Err` only for unreadable directories, which abort the run.
pub struct PendingFiles<'a> {
    scanner: &'a Scanner,
    stack: Vec<(PathBuf, fs::ReadDir)>,
}

impl Iterator for PendingFiles<'_> {
    type Item = Result<WorkItem>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (rel_dir, dir) = self.stack.last_mut()?;
            let rel_dir = rel_dir.clone();

            let entry = match dir.next() {
                Some(Ok(entry)) => entry,
                Some(Err(e)) => {
                    return Some(Err(Error::SourceDir {
                        path: self.scanner.input_root.join(rel_dir),
                        source: e,
                    }));
                }
                None => {
                    self.stack.pop();
                    continue;
                }
            };

            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(e) => {
                    return Some(Err(Error::SourceDir {
                        path: self.scanner.input_root.join(rel_dir),
                        source: e,
                    }));
                }
            };

            let relative_path = rel_dir.join(entry.file_name());

            if file_type.is_dir() {
                if self.scanner.recursive {
                    match fs::read_dir(entry.path()) {
                        Ok(sub) => self.stack.push((relative_path, sub)),
                        Err(e) => {
                            return Some(Err(Error::SourceDir {
                                path: entry.path(),
                                source: e,
                            }));
                        }
                    }
                }
                continue;
            }

            if !file_type.is_file() || !self.scanner.accepts(&relative_path) {
                continue;
            }

            if self.scanner.needs_processing(&relative_path) {
                tracing::debug!(file = %relative_path.display(), "queued for processing");
                return Some(Ok(WorkItem {
                    source_root: self.scanner.input_root.clone(),
                    relative_path,
                }));
            }
        }
    }
}

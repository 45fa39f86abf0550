//! Upload queue: size/type validation and de-duplication of candidate files.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::limits::Limits;

/// A file the user asked to process.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFile {
    pub name: String,
    pub size: u64,
    pub mime: String,
    pub path: PathBuf,
}

impl CandidateFile {
    /// Describe a file on disk, guessing its MIME type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string();
        Ok(Self {
            name,
            size: meta.len(),
            mime,
            path: path.to_path_buf(),
        })
    }

    fn same_file(&self, other: &CandidateFile) -> bool {
        self.name == other.name && self.size == other.size
    }
}

/// Why a candidate was refused. The message is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("file \"{name}\" exceeds the {limit_mb} MB limit ({size} bytes)")]
    TooLarge {
        name: String,
        size: u64,
        limit_mb: u64,
    },
    #[error("file \"{name}\" has unsupported type {mime}")]
    UnsupportedType { name: String, mime: String },
}

/// Outcome of one [`UploadQueue::select`] call.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Selection {
    pub accepted: Vec<String>,
    pub duplicates: Vec<String>,
    pub rejected: Vec<Rejection>,
}

/// Ordered set of files waiting to be processed.
#[derive(Debug, Default)]
pub struct UploadQueue {
    files: Vec<CandidateFile>,
    limits: Limits,
}

impl UploadQueue {
    pub fn new(limits: Limits) -> Self {
        Self {
            files: Vec::new(),
            limits,
        }
    }

    /// Validate and enqueue candidates.
    ///
    /// Oversized or unsupported files are rejected individually; the rest of
    /// the selection is still considered. Files already queued under the
    /// same (name, size) are skipped.
    pub fn select(&mut self, candidates: impl IntoIterator<Item = CandidateFile>) -> Selection {
        let mut selection = Selection::default();

        for file in candidates {
            if file.size > self.limits.max_file_bytes {
                warn!(name = %file.name, size = file.size, "rejecting oversized file");
                selection.rejected.push(Rejection::TooLarge {
                    name: file.name,
                    size: file.size,
                    limit_mb: self.limits.max_file_bytes / (1024 * 1024),
                });
                continue;
            }
            if !self.limits.accepts_mime(&file.mime) {
                warn!(name = %file.name, mime = %file.mime, "rejecting unsupported file type");
                selection.rejected.push(Rejection::UnsupportedType {
                    name: file.name,
                    mime: file.mime,
                });
                continue;
            }
            if self.files.iter().any(|queued| queued.same_file(&file)) {
                debug!(name = %file.name, "skipping duplicate file");
                selection.duplicates.push(file.name);
                continue;
            }
            selection.accepted.push(file.name.clone());
            self.files.push(file);
        }

        selection
    }

    /// Drop a queued file by (name, size). Returns whether it was present.
    pub fn remove(&mut self, name: &str, size: u64) -> bool {
        let before = self.files.len();
        self.files.retain(|f| !(f.name == name && f.size == size));
        self.files.len() != before
    }

    /// Drop every queued file matching one of `processed` by (name, size).
    pub fn remove_processed(&mut self, processed: &[CandidateFile]) {
        self.files
            .retain(|f| !processed.iter().any(|done| done.same_file(f)));
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &CandidateFile> {
        self.files.iter()
    }

    pub fn files(&self) -> &[CandidateFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

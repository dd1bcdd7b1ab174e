//! Client-supplied files referenced by an upload.

use super::EncodeError;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// A file to upload: where it lives locally and the name the client gave it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    path: PathBuf,
    original_name: String,
}

impl UploadFile {
    pub fn new(path: impl Into<PathBuf>, original_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            original_name: original_name.into(),
        }
    }

    /// Uses the last path component as the client-supplied name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            original_name,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Opens the backing file for reading. Ownership of the handle passes to
    /// the caller.
    pub(crate) fn open(&self) -> Result<File, EncodeError> {
        if !self.path.exists() {
            return Err(EncodeError::FileNotFound {
                path: self.path.clone(),
            });
        }
        File::open(&self.path).map_err(|source| match source.kind() {
            // Removed between the check and the open.
            io::ErrorKind::NotFound => EncodeError::FileNotFound {
                path: self.path.clone(),
            },
            _ => EncodeError::Io {
                path: self.path.clone(),
                source,
            },
        })
    }
}

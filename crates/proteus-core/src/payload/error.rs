//! Encoder error type.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    /// A file handle's backing path no longer exists.
    #[error("file does not exist at path: {}", path.display())]
    FileNotFound { path: PathBuf },
    /// A collection mixes file handles with other values.
    #[error("collection `{key}` mixes files with other values")]
    MixedCollection { key: String },
    /// A file handle sits where the value would be JSON-serialized.
    #[error("file handle inside nested value `{name}` cannot be encoded")]
    NestedFile { name: String },
    /// Two distinct input paths flatten to the same field name.
    #[error("field name `{name}` produced by more than one input path")]
    DuplicateName { name: String },
    /// Opening a file failed for a reason other than it being missing.
    #[error("cannot open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

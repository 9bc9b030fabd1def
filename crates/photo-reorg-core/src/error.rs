use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error types for the photo-reorg library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decode or encode error
    #[error("Image processing error: {0}")]
    Image(String),

    /// Embedded metadata could not be read or written
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// File not found error
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Safety check failure
    #[error("Safety check failed: {0}")]
    SafetyCheck(String),

    /// Unsupported image format
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// A source file could not be moved to its temporary holder
    #[error("Failed to stage {}: {source}", .path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every suffixed variant of a destination name is taken
    #[error("No free destination name for '{candidate}' in {}", .directory.display())]
    AllocationExhausted { directory: PathBuf, candidate: String },

    /// The final move or write into the destination failed
    #[error("Failed to commit {} -> {}: {source}", .from.display(), .to.display())]
    Commit {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directory level was aborted and rolled back
    #[error("Failed to process directory {}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err.to_string())
    }
}

impl From<exif::Error> for Error {
    fn from(err: exif::Error) -> Self {
        Error::Metadata(err.to_string())
    }
}

impl Error {
    /// The directory whose batch was rolled back, if this error aborted one.
    pub fn directory(&self) -> Option<&std::path::Path> {
        match self {
            Error::Directory { path, .. } => Some(path),
            _ => None,
        }
    }

    /// The innermost error, looking through any directory wrapper.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Directory { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

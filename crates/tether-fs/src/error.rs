use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open {path}: {source}")]
    Open {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("path has no parent directory: {0}")]
    NoParent(PathBuf),
}

impl Error {
    /// The path the failed operation was acting on.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Error::CreateDir { path, .. }
            | Error::Open { path, .. }
            | Error::Write { path, .. }
            | Error::NoParent(path) => path,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

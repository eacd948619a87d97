use crate::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::path::Path;

/// How an existing destination file is treated when opened as a sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SinkMode {
    /// Create the file or cut an existing one to zero length.
    #[default]
    Truncate,
    /// Create the file or continue writing after its current end.
    Append,
}

/// Creates every missing directory above `path`.
///
/// A bare file name (empty parent) needs nothing and succeeds.
pub fn ensure_parent(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| Error::CreateDir {
                path:   parent.to_path_buf(),
                source: e,
            })
        }
        _ => Ok(()),
    }
}

/// Opens `path` for writing a download into, creating parent directories.
pub fn open_sink(path: impl AsRef<Path>, mode: SinkMode) -> Result<File> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let mut options = OpenOptions::new();
    options.create(true);
    match mode {
        SinkMode::Truncate => options.write(true).truncate(true),
        SinkMode::Append => options.append(true),
    };

    options.open(path).map_err(|e| Error::Open {
        path:   path.to_path_buf(),
        source: e,
    })
}

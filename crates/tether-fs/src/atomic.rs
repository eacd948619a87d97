use crate::{Error, Result, ensure_parent};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Clone, Copy, Debug, Default)]
pub struct AtomicWriteOptions {
    pub sync: bool,
}

impl AtomicWriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }
}

/// Writes `content` to a temporary file next to `path`, then renames it over
/// `path`. Readers never observe a partially written file.
pub fn atomic_write(
    path: impl AsRef<Path>,
    content: &[u8],
    options: AtomicWriteOptions,
) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        Some(_) => Path::new("."),
        None => return Err(Error::NoParent(path.to_path_buf())),
    };

    let write_err = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(content).map_err(write_err)?;
    if options.sync {
        tmp.as_file().sync_all().map_err(write_err)?;
    }

    // the temporary file is removed on drop if persisting fails
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}

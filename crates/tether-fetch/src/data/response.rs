use std::path::Path;

use serde::de::DeserializeOwned;
use tether_fs::{AtomicWriteOptions, atomic_write};

use crate::error::{Error, Result};

/// A response body read fully into memory.
///
/// Meant for small metadata payloads such as manifests and version lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedResponse {
    data: Vec<u8>,
}

impl BufferedResponse {
    pub(crate) fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decodes the body as UTF-8, failing on invalid sequences.
    pub fn as_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.data).map_err(|e| Error::Decoding {
            format: "utf-8",
            source: Box::new(e),
        })
    }

    /// Decodes the body as UTF-8, replacing invalid sequences.
    pub fn as_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    pub fn as_json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.data).map_err(|e| Error::Decoding {
            format: "json",
            source: Box::new(e),
        })
    }

    #[cfg(feature = "xml")]
    pub fn as_xml<T: DeserializeOwned>(&self) -> Result<T> {
        quick_xml::de::from_str(self.as_str()?).map_err(|e| Error::Decoding {
            format: "xml",
            source: Box::new(e),
        })
    }

    /// Writes the body to `path`, creating parent directories.
    pub fn save_content(&self, path: impl AsRef<Path>) -> Result<&Self> {
        atomic_write(path, &self.data, AtomicWriteOptions::new())?;
        Ok(self)
    }
}

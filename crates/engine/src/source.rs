use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, TimelineError};

/// Raw file-like handle: bytes plus the metadata that identifies them.
#[derive(Debug, Clone)]
pub struct FileBlob {
    name: String,
    modified_ms: Option<u64>,
    bytes: Arc<[u8]>,
}

impl FileBlob {
    pub fn new(name: impl Into<String>, modified: Option<SystemTime>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            modified_ms: modified.and_then(epoch_millis),
            bytes: bytes.into(),
        }
    }

    /// Reads a local file into memory, keeping its name and modification time.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let resource = path.display().to_string();
        let bytes = std::fs::read(path).map_err(|err| TimelineError::resource_load(&resource, err))?;
        let modified = std::fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or(resource);
        Ok(Self::new(name, modified, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// A video resource reference handed to the widget.
#[derive(Debug, Clone)]
pub enum VideoSource {
    Url(String),
    Path(PathBuf),
    File(FileBlob),
}

impl VideoSource {
    pub fn identity(&self) -> SourceIdentity {
        match self {
            Self::Url(url) => SourceIdentity::Url(url.clone()),
            Self::Path(path) => SourceIdentity::Path(path.clone()),
            Self::File(blob) => SourceIdentity::File {
                name: blob.name.clone(),
                size: blob.size(),
                modified_ms: blob.modified_ms,
            },
        }
    }

    /// Human-readable name used in logs and error messages.
    pub fn display_name(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Path(path) => path.display().to_string(),
            Self::File(blob) => blob.name.clone(),
        }
    }
}

impl From<PathBuf> for VideoSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

/// Two sources with equal identity are the same resource for the widget.
///
/// Blobs compare by name, size and modification time, never by content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceIdentity {
    Url(String),
    Path(PathBuf),
    File {
        name: String,
        size: u64,
        modified_ms: Option<u64>,
    },
}

/// Where the media backend reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaLocation {
    Url(String),
    Path(PathBuf),
}

impl MediaLocation {
    pub fn as_os_str(&self) -> &OsStr {
        match self {
            Self::Url(url) => OsStr::new(url),
            Self::Path(path) => path.as_os_str(),
        }
    }
}

/// Temporary on-disk copy of a blob source; deleted when dropped.
#[derive(Debug)]
pub(crate) struct TempResource {
    file: NamedTempFile,
}

impl TempResource {
    pub(crate) fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Drop for TempResource {
    fn drop(&mut self) {
        debug!(path = ?self.file.path(), "releasing temporary video resource");
    }
}

/// Resolves a source into a backend location, spilling blobs to a temp file.
pub(crate) fn materialize(source: &VideoSource) -> Result<(MediaLocation, Option<TempResource>)> {
    match source {
        VideoSource::Url(url) => Ok((MediaLocation::Url(url.clone()), None)),
        VideoSource::Path(path) => Ok((MediaLocation::Path(path.clone()), None)),
        VideoSource::File(blob) => {
            let resource = blob.name.clone();
            let suffix = Path::new(&blob.name)
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default();
            let mut file = tempfile::Builder::new()
                .prefix("cliprange-")
                .suffix(&suffix)
                .tempfile()
                .map_err(|err| TimelineError::resource_load(&resource, err))?;
            file.write_all(blob.bytes())
                .and_then(|()| file.flush())
                .map_err(|err| TimelineError::resource_load(&resource, err))?;
            debug!(name = %blob.name, size = blob.size(), path = ?file.path(), "materialized blob source");
            let temp = TempResource { file };
            Ok((MediaLocation::Path(temp.path().to_path_buf()), Some(temp)))
        }
    }
}

fn epoch_millis(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH)
        .ok()
        .map(|elapsed| elapsed.as_millis() as u64)
}

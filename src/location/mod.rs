//! Storage locations (local disk or in-process object store)
//!
//! A [`LocationConfig`] is plain configuration: a URI plus backend options.
//! Opening it yields an [`OpenLocation`], a scoped handle that owns the
//! backend for as long as the caller needs it and releases it on drop.
//!
//! Supported URIs:
//! - plain paths and `file://` URLs (local disk)
//! - `memory://<bucket>/<prefix>` (in-process object store, flat keys)
//!
//! Any other scheme fails fast with [`Error::LocationUnreachable`]. There
//! is no internal retry.
//!
//! ```rust
//! use expdash::location::{with_location, LocationConfig};
//!
//! # fn main() -> expdash::Result<()> {
//! let config = LocationConfig::new("memory://doc-bucket/runs");
//! with_location(&config, |location| {
//!     location.write("a/info.yaml", b"x: 1")?;
//!     assert!(location.is_dir("a")?);
//!     assert_eq!(location.list_dir("")?, vec!["a".to_string()]);
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```

mod local;
mod memory;

pub use local::LocalFileSystem;
pub use memory::MemoryFileSystem;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::{Error, Result};

/// Local option: create parent directories on write (default `true`).
pub const AUTO_MKDIR_OPTION: &str = "auto_mkdir";

/// Backend operations a location needs.
///
/// Paths handed to a backend are always produced by [`OpenLocation::join`],
/// so they already include the location root.
pub trait FileSystem: Send + Sync + fmt::Debug {
    /// Short backend name used in logs.
    fn scheme(&self) -> &'static str;

    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &Path) -> Result<bool>;

    /// Whether `path` is a directory.
    fn is_dir(&self, path: &Path) -> Result<bool>;

    /// Names of the entries directly below `path`.
    ///
    /// Fails with [`Error::NotFound`] if `path` does not exist.
    fn list_dir(&self, path: &Path) -> Result<Vec<String>>;

    /// Read the whole file at `path`.
    ///
    /// Fails with [`Error::NotFound`] if `path` does not exist.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write `data` to `path`, replacing any previous content.
    fn write(&self, path: &Path, data: &[u8]) -> Result<()>;
}

/// URI plus backend options identifying a storage root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Root URI (plain path, `file://` or `memory://`).
    pub uri: String,
    /// Backend-specific options.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

impl LocationConfig {
    /// Create a location config without options.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            options: BTreeMap::new(),
        }
    }

    /// Set a backend option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Scope this location to a sub-path of its root.
    ///
    /// Options are carried over unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] if `path` climbs out of the root.
    pub fn join(&self, path: &str) -> Result<Self> {
        let path = path.trim_matches('/');
        check_relative(Path::new(path))?;
        if path.is_empty() {
            return Ok(self.clone());
        }
        let uri = if self.uri.contains("://") {
            format!("{}/{path}", self.uri.trim_end_matches('/'))
        } else {
            Path::new(&self.uri).join(path).to_string_lossy().into_owned()
        };
        Ok(Self {
            uri,
            options: self.options.clone(),
        })
    }

    /// Resolve the backend and root for this location.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LocationUnreachable`] for malformed URIs and
    /// unsupported schemes.
    pub fn open(&self) -> Result<OpenLocation> {
        let (fs, root): (Arc<dyn FileSystem>, PathBuf) = match parse_target(&self.uri)? {
            Target::Local(root) => {
                let auto_mkdir = self.bool_option(AUTO_MKDIR_OPTION, true)?;
                (Arc::new(LocalFileSystem::new(auto_mkdir)), root)
            }
            Target::Memory { bucket, prefix } => (MemoryFileSystem::bucket(&bucket), prefix),
        };
        debug!(uri = %self.uri, scheme = fs.scheme(), "location opened");
        Ok(OpenLocation {
            uri: self.uri.clone(),
            fs,
            root,
        })
    }

    fn bool_option(&self, key: &str, default: bool) -> Result<bool> {
        self.options.get(key).map_or(Ok(default), |value| {
            value.parse().map_err(|_| Error::LocationUnreachable {
                uri: self.uri.clone(),
                reason: format!("option '{key}' must be true or false, got '{value}'"),
            })
        })
    }
}

impl From<&str> for LocationConfig {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl From<&Path> for LocationConfig {
    fn from(path: &Path) -> Self {
        Self::new(path.to_string_lossy().into_owned())
    }
}

enum Target {
    Local(PathBuf),
    Memory { bucket: String, prefix: PathBuf },
}

fn parse_target(uri: &str) -> Result<Target> {
    let unreachable = |reason: String| Error::LocationUnreachable {
        uri: uri.to_string(),
        reason,
    };

    if uri.trim().is_empty() {
        return Err(unreachable("empty URI".to_string()));
    }
    if !uri.contains("://") {
        return Ok(Target::Local(PathBuf::from(uri)));
    }

    let url = Url::parse(uri).map_err(|e| unreachable(e.to_string()))?;
    match url.scheme() {
        "file" => url
            .to_file_path()
            .map(Target::Local)
            .map_err(|()| unreachable("not a valid file path".to_string())),
        "memory" => {
            // Raw split keeps folder names free of percent-encoding.
            let rest = uri.split_once("://").map_or("", |(_, rest)| rest);
            let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                return Err(unreachable("memory URI needs a bucket name".to_string()));
            }
            Ok(Target::Memory {
                bucket: bucket.to_string(),
                prefix: PathBuf::from(prefix.trim_matches('/')),
            })
        }
        other => Err(unreachable(format!("unsupported scheme '{other}'"))),
    }
}

/// Scoped handle to an opened location.
///
/// All path arguments are relative to the location root. The backend is
/// released when the handle is dropped.
pub struct OpenLocation {
    uri: String,
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl OpenLocation {
    /// URI this handle was opened from.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Resolved root path within the backend.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Underlying backend.
    #[must_use]
    pub fn file_system(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// Compose a backend path from the root and relative parts.
    ///
    /// Empty parts are skipped, so `join([""])` is the root itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] for absolute parts or `..` segments.
    pub fn join<I, P>(&self, parts: I) -> Result<PathBuf>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut path = self.root.clone();
        for part in parts {
            let part = part.as_ref();
            check_relative(part)?;
            if !part.as_os_str().is_empty() {
                path.push(part);
            }
        }
        Ok(path)
    }

    /// Whether `relative` exists under the root.
    ///
    /// # Errors
    ///
    /// Returns backend I/O errors.
    pub fn exists(&self, relative: impl AsRef<Path>) -> Result<bool> {
        self.fs.exists(&self.join([relative])?)
    }

    /// Whether `relative` is a directory under the root.
    ///
    /// # Errors
    ///
    /// Returns backend I/O errors.
    pub fn is_dir(&self, relative: impl AsRef<Path>) -> Result<bool> {
        self.fs.is_dir(&self.join([relative])?)
    }

    /// Entry names directly below `relative`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `relative` does not exist.
    pub fn list_dir(&self, relative: impl AsRef<Path>) -> Result<Vec<String>> {
        self.fs.list_dir(&self.join([relative])?)
    }

    /// Read the file at `relative`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the file does not exist.
    pub fn read(&self, relative: impl AsRef<Path>) -> Result<Vec<u8>> {
        self.fs.read(&self.join([relative])?)
    }

    /// Write `data` to `relative`.
    ///
    /// # Errors
    ///
    /// Returns backend I/O errors.
    pub fn write(&self, relative: impl AsRef<Path>, data: &[u8]) -> Result<()> {
        self.fs.write(&self.join([relative])?, data)
    }
}

impl fmt::Debug for OpenLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenLocation")
            .field("uri", &self.uri)
            .field("scheme", &self.fs.scheme())
            .field("root", &self.root)
            .finish()
    }
}

impl Drop for OpenLocation {
    fn drop(&mut self) {
        debug!(uri = %self.uri, "location released");
    }
}

/// Open `config`, run `f` inside the scope and release the location.
///
/// The handle is released whether `f` succeeds or fails.
///
/// # Errors
///
/// Returns the open error or whatever `f` returns.
pub fn with_location<T>(
    config: &LocationConfig,
    f: impl FnOnce(&OpenLocation) -> Result<T>,
) -> Result<T> {
    let location = config.open()?;
    f(&location)
}

/// Reject paths that would leave the root they are joined to.
pub(crate) fn check_relative(path: &Path) -> Result<()> {
    let escapes = path.components().any(|component| {
        matches!(
            component,
            Component::RootDir | Component::Prefix(_) | Component::ParentDir
        )
    });
    if escapes {
        return Err(Error::InvalidPath {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

pub(crate) fn map_io(path: &Path, err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        Error::Io(err)
    }
}

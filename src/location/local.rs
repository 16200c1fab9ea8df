//! Local disk backend.

use std::fs;
use std::path::Path;

use super::{map_io, FileSystem};
use crate::Result;

/// Local filesystem backend.
#[derive(Debug, Clone, Copy)]
pub struct LocalFileSystem {
    auto_mkdir: bool,
}

impl LocalFileSystem {
    /// Create a local backend.
    ///
    /// With `auto_mkdir`, writes create missing parent directories.
    #[must_use]
    pub const fn new(auto_mkdir: bool) -> Self {
        Self { auto_mkdir }
    }
}

impl Default for LocalFileSystem {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FileSystem for LocalFileSystem {
    fn scheme(&self) -> &'static str {
        "file"
    }

    fn exists(&self, path: &Path) -> Result<bool> {
        path.try_exists().map_err(|e| map_io(path, e))
    }

    fn is_dir(&self, path: &Path) -> Result<bool> {
        match fs::metadata(path) {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(map_io(path, e)),
        }
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>> {
        let entries = fs::read_dir(path).map_err(|e| map_io(path, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| map_io(path, e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| map_io(path, e))
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        if self.auto_mkdir {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| map_io(parent, e))?;
            }
        }
        fs::write(path, data).map_err(|e| map_io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFileSystem::default();
        let path = dir.path().join("a/b/c.bin");

        fs.write(&path, b"data").unwrap();

        assert!(fs.exists(&path).unwrap());
        assert!(fs.is_dir(&dir.path().join("a/b")).unwrap());
        assert_eq!(fs.read(&path).unwrap(), b"data");
    }

    #[test]
    fn test_write_without_auto_mkdir_fails_for_missing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFileSystem::new(false);
        let err = fs.write(&dir.path().join("missing/c.bin"), b"x").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_missing_dir_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalFileSystem::default()
            .list_dir(&dir.path().join("nope"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_is_dir_false_for_files_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFileSystem::default();
        let file = dir.path().join("f.txt");
        fs.write(&file, b"x").unwrap();

        assert!(!fs.is_dir(&file).unwrap());
        assert!(!fs.is_dir(&dir.path().join("missing")).unwrap());
    }
}

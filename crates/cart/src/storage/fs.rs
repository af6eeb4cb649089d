//! Filesystem storage backend.

use std::{
    fmt::Write as _,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use uuid::Uuid;

use super::{LocalStorage, StorageError};

/// [`LocalStorage`] keeping one file per key under `root`.
///
/// Writes land in a temporary sibling first and are renamed into place, so a
/// reader never observes a half-written record.
#[derive(Debug, Clone)]
pub struct FsLocalStorage {
    root: PathBuf,
}

impl FsLocalStorage {
    /// Store records under `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the records.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(file_name_for(key))
    }
}

impl LocalStorage for FsLocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;

        let path = self.path_for(key);
        let tmp = path.with_extension(format!("{}.tmp", Uuid::now_v7().simple()));

        fs::write(&tmp, value)?;

        if let Err(error) = fs::rename(&tmp, &path) {
            _ = fs::remove_file(&tmp);

            return Err(error.into());
        }

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

/// Encode `key` into a file name, escaping anything outside `[A-Za-z0-9._-]`
/// so distinct keys never share a file.
fn file_name_for(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + 5);

    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
            name.push(char::from(byte));
        } else {
            _ = write!(name, "%{byte:02X}");
        }
    }

    name.push_str(".json");

    name
}

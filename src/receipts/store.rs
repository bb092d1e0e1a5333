use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::ReceiptError;

/// Flat key/value blob storage addressed by slash-separated keys.
pub(crate) trait ObjectStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ReceiptError>;
    fn get(&self, key: &str) -> Result<Vec<u8>, ReceiptError>;
    /// Deleting a missing object succeeds.
    fn delete(&self, key: &str) -> Result<(), ReceiptError>;
    fn exists(&self, key: &str) -> Result<bool, ReceiptError>;
    /// Keys starting with `prefix`, sorted.
    fn list(&self, prefix: &str) -> Result<Vec<String>, ReceiptError>;
}

/// Object store backed by a directory tree.
pub(crate) struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub(crate) fn open(root: &Path) -> Result<Self, ReceiptError> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ReceiptError> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |p, part| p.join(part)))
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ReceiptError> {
        let path = self.path_for(key)?;
        let parent = path
            .parent()
            .ok_or_else(|| ReceiptError::InvalidKey(key.to_string()))?;
        fs::create_dir_all(parent)?;

        // Write next to the target, then rename so readers never see a partial file.
        let tmp = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        let written = fs::File::create(&tmp).and_then(|mut f| {
            f.write_all(bytes)?;
            f.sync_all()
        });
        if let Err(e) = written.and_then(|()| fs::rename(&tmp, &path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        tracing::debug!(%key, size = bytes.len(), "object stored");
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, ReceiptError> {
        let path = self.path_for(key)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ReceiptError::NotFound(key.to_string()),
            _ => e.into(),
        })
    }

    fn delete(&self, key: &str) -> Result<(), ReceiptError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(%key, "object deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, key: &str) -> Result<bool, ReceiptError> {
        Ok(self.path_for(key)?.is_file())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, ReceiptError> {
        let mut keys = Vec::new();
        collect_keys(&self.root, "", &mut keys)?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }
}

fn collect_keys(dir: &Path, prefix: &str, keys: &mut Vec<String>) -> Result<(), ReceiptError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let entry = entry?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        // Temporary files from in-flight writes.
        if name.starts_with('.') {
            continue;
        }
        let key = format!("{prefix}{name}");
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_keys(&entry.path(), &format!("{key}/"), keys)?;
        } else if file_type.is_file() {
            keys.push(key);
        }
    }
    Ok(())
}

/// Keys are relative, slash-separated and may not climb out of the store.
pub(crate) fn validate_key(key: &str) -> Result<(), ReceiptError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.contains('\0')
        || key
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == ".." || part.starts_with('.'));
    if bad {
        Err(ReceiptError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

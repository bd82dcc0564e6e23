//! Byte-level persistence of JSON documents keyed by identifier.
//!
//! Every public operation reports failure as `false` or `None`. I/O and
//! parse errors are logged and swallowed here; callers never see them.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use super::{validate_id, EntityKind, FileRole, StorageError};

const DOCUMENT_EXTENSION: &str = ".json";

/// File-based document store rooted at a base directory
#[derive(Debug, Clone)]
pub struct EntityStore {
    base_dir: PathBuf,
}

impl EntityStore {
    /// Create a store rooted at `base_dir`. Nothing is created on disk yet.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Get the directory holding documents of one kind
    pub fn kind_dir(&self, kind: EntityKind) -> PathBuf {
        self.base_dir.join(kind.dir_name())
    }

    /// Get the document path for an identifier
    pub fn document_path(&self, kind: EntityKind, id: &str) -> PathBuf {
        self.kind_dir(kind).join(format!("{}{}", id, DOCUMENT_EXTENSION))
    }

    /// Get the path of a binary artifact. Pure: no I/O.
    pub fn file_path(&self, id: &str, role: FileRole) -> PathBuf {
        self.base_dir.join(role.dir_name()).join(role.file_name(id))
    }

    /// Write a document, replacing any previous version
    pub fn save(&self, kind: EntityKind, id: &str, document: &Value) -> bool {
        match self.try_save(kind, id, document) {
            Ok(path) => {
                debug!(kind = %kind, id, path = %path.display(), "saved document");
                true
            }
            Err(e) => {
                warn!(kind = %kind, id, error = %e, "failed to save document");
                false
            }
        }
    }

    fn try_save(
        &self,
        kind: EntityKind,
        id: &str,
        document: &Value,
    ) -> Result<PathBuf, StorageError> {
        validate_id(id)?;

        let dir = self.kind_dir(kind);
        fs::create_dir_all(&dir)?;

        let content = serde_json::to_string_pretty(document)?;
        let path = self.document_path(kind, id);
        write_replacing(&path, content.as_bytes())?;

        Ok(path)
    }

    /// Read a document. Missing and corrupt files both yield `None`.
    pub fn load(&self, kind: EntityKind, id: &str) -> Option<Value> {
        if validate_id(id).is_err() {
            return None;
        }

        let path = self.document_path(kind, id);
        if !path.exists() {
            return None;
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read document");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt document");
                None
            }
        }
    }

    /// List identifiers present for a kind (order unspecified)
    pub fn list_ids(&self, kind: EntityKind) -> Vec<String> {
        let dir = self.kind_dir(kind);

        if !dir.exists() {
            return Vec::new();
        }

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "failed to list documents");
                return Vec::new();
            }
        };

        let mut ids = Vec::new();
        for entry in entries.flatten() {
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if let Some(id) = name.strip_suffix(DOCUMENT_EXTENSION) {
                    if validate_id(id).is_ok() {
                        ids.push(id.to_string());
                    }
                }
            }
        }

        ids
    }

    /// Remove a document. Returns `false` if there was nothing to remove.
    pub fn delete(&self, kind: EntityKind, id: &str) -> bool {
        if validate_id(id).is_err() {
            return false;
        }

        let path = self.document_path(kind, id);
        if !path.exists() {
            return false;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(kind = %kind, id, "deleted document");
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to delete document");
                false
            }
        }
    }

    /// Check whether a binary artifact exists
    pub fn file_exists(&self, id: &str, role: FileRole) -> bool {
        self.file_path(id, role).is_file()
    }

    /// Write a binary artifact, replacing any previous version
    pub fn write_file(&self, id: &str, role: FileRole, bytes: &[u8]) -> bool {
        let result = validate_id(id).and_then(|_| {
            let path = self.file_path(id, role);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            write_replacing(&path, bytes)?;
            Ok(path)
        });

        match result {
            Ok(path) => {
                debug!(path = %path.display(), bytes = bytes.len(), "wrote file");
                true
            }
            Err(e) => {
                warn!(id, ?role, error = %e, "failed to write file");
                false
            }
        }
    }

    /// Read a binary artifact
    pub fn read_file(&self, id: &str, role: FileRole) -> Option<Vec<u8>> {
        validate_id(id).ok()?;

        let path = self.file_path(id, role);
        if !path.exists() {
            return None;
        }

        match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read file");
                None
            }
        }
    }
}

/// Write to a sibling temp file, then rename over the target
fn write_replacing(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    Ok(())
}

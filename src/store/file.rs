//! File-based license store with atomic writes.
//!
//! Stores license documents under `dirs::data_dir()/<namespace>/`.
//! Uses temp file + rename for atomic writes.

use crate::store::format::StoredLicense;
use crate::KeywardenError;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Length of the hashed file stem.
const FILE_STEM_LEN: usize = 16;

/// File-based license store.
#[derive(Debug, Clone)]
pub struct FileStore {
    store_dir: PathBuf,
}

impl FileStore {
    /// Create a store with the given namespace.
    ///
    /// Files are stored under `dirs::data_dir()/<namespace>/`.
    pub fn new(namespace: &str) -> Result<Self, KeywardenError> {
        let base_dir = dirs::data_dir()
            .ok_or_else(|| KeywardenError::StoreIO("Could not find data directory".to_string()))?;

        Self::with_path(base_dir.join(namespace))
    }

    /// Create a store at a specific directory.
    pub fn with_path(store_dir: PathBuf) -> Result<Self, KeywardenError> {
        fs::create_dir_all(&store_dir)
            .map_err(|e| KeywardenError::StoreIO(format!("Failed to create store dir: {}", e)))?;
        Ok(Self { store_dir })
    }

    /// Directory holding the license files.
    pub fn dir(&self) -> &Path {
        &self.store_dir
    }

    /// File stem for a license key; the raw key never appears on disk.
    fn file_stem(license_key: &str) -> String {
        let mut stem = hash_license_key(license_key);
        stem.truncate(FILE_STEM_LEN);
        stem
    }

    fn license_path(&self, license_key: &str) -> PathBuf {
        self.store_dir
            .join(format!("{}.json", Self::file_stem(license_key)))
    }

    /// Save a license document atomically.
    pub fn save(&self, license_key: &str, record: &StoredLicense) -> Result<(), KeywardenError> {
        let target_path = self.license_path(license_key);
        let temp_path = self
            .store_dir
            .join(format!("{}.tmp", Self::file_stem(license_key)));

        let json = record.to_json()?;

        fs::write(&temp_path, &json)
            .map_err(|e| KeywardenError::StoreIO(format!("Failed to write temp file: {}", e)))?;

        fs::rename(&temp_path, &target_path)
            .map_err(|e| KeywardenError::StoreIO(format!("Failed to rename license file: {}", e)))?;

        debug!(path = %target_path.display(), "license saved");
        Ok(())
    }

    /// Load a license document, if one was saved for `license_key`.
    pub fn load(&self, license_key: &str) -> Result<Option<StoredLicense>, KeywardenError> {
        let path = self.license_path(license_key);

        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .map_err(|e| KeywardenError::StoreIO(format!("Failed to read license file: {}", e)))?;

        StoredLicense::from_json(&json).map(Some)
    }

    /// Delete the document for `license_key`.
    pub fn delete(&self, license_key: &str) -> Result<(), KeywardenError> {
        let path = self.license_path(license_key);

        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| KeywardenError::StoreIO(format!("Failed to delete license: {}", e)))?;
        }

        Ok(())
    }

    /// Delete every stored document.
    pub fn clear(&self) -> Result<(), KeywardenError> {
        let entries = fs::read_dir(&self.store_dir)
            .map_err(|e| KeywardenError::StoreIO(format!("Failed to read store dir: {}", e)))?;

        for entry in entries {
            let path = entry
                .map_err(|e| KeywardenError::StoreIO(format!("Failed to read entry: {}", e)))?
                .path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(&path)
                    .map_err(|e| KeywardenError::StoreIO(format!("Failed to delete: {}", e)))?;
            }
        }
        Ok(())
    }
}

/// Lowercase hex SHA-256 of a license key.
pub fn hash_license_key(license_key: &str) -> String {
    hex::encode(Sha256::digest(license_key.as_bytes()))
}

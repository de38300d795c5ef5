//! Whole-file JSON store for evidence records.
//!
//! Every operation loads the full record array, applies one change, and
//! rewrites the file. That costs O(n) per mutation, which is fine at the
//! record counts a single user accumulates. There is exactly one writer;
//! overlapping calls against the same file are last-writer-wins.
//!
//! Errors never escape an operation: `load` falls back to an empty list, and
//! mutating operations return a [`StoreError`] for the caller to report.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::hashing::is_sha256_hex;
use crate::record::{EvidenceRecord, RecordStatus};

/// File name of the record store inside the data directory.
pub(crate) const STORE_FILE: &str = "evidence-records.json";

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("record not found: {id}")]
    NotFound { id: String },
    #[error("invalid transaction id {0:?}: must be non-empty and not \"pending\"")]
    InvalidTransactionId(String),
}

/// Outcome of a boundary operation, shaped as `{success, record?, error?}`.
#[derive(Serialize, Debug)]
pub(crate) struct OpResult {
    pub(crate) success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) record: Option<EvidenceRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

impl OpResult {
    pub(crate) fn ok() -> Self {
        Self {
            success: true,
            record: None,
            error: None,
        }
    }

    pub(crate) fn with_record(record: EvidenceRecord) -> Self {
        Self {
            success: true,
            record: Some(record),
            error: None,
        }
    }

    pub(crate) fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            record: None,
            error: Some(message.into()),
        }
    }
}

/// Arguments for a new record, as received from the shell.
#[derive(Debug)]
pub(crate) struct NewRecord<'a> {
    pub(crate) hash: &'a str,
    pub(crate) metadata: Option<&'a str>,
    pub(crate) transaction_id: Option<&'a str>,
    pub(crate) image_path: &'a str,
    pub(crate) base64_image: &'a str,
}

/// Record store bound to a single backing file.
pub(crate) struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub(crate) fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record; a missing or malformed file reads as empty.
    pub(crate) fn load(&self) -> Vec<EvidenceRecord> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "record store absent");
                return Vec::new();
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to read record store");
                return Vec::new();
            }
        };
        let mut records: Vec<EvidenceRecord> = match serde_json::from_slice(&bytes) {
            Ok(records) => records,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "record store is malformed, treating as empty");
                return Vec::new();
            }
        };
        for record in &mut records {
            record.normalize();
        }
        let odd_hashes = records.iter().filter(|r| !is_sha256_hex(&r.hash)).count();
        if odd_hashes > 0 {
            debug!(count = odd_hashes, "records with non-sha256 hash values");
        }
        records
    }

    /// Overwrite the backing file with the full record list.
    pub(crate) fn save(&self, records: &[EvidenceRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(records)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.write_error(source))?;
        }
        fs::write(&self.path, json).map_err(|source| self.write_error(source))?;
        debug!(path = %self.path.display(), count = records.len(), "record store saved");
        Ok(())
    }

    /// Build a record without persisting it.
    pub(crate) fn create(&self, new: &NewRecord<'_>) -> EvidenceRecord {
        EvidenceRecord::create(
            new.hash,
            new.metadata,
            new.transaction_id,
            new.image_path,
            new.base64_image,
        )
    }

    /// Append a freshly created record. Nothing is returned on save failure.
    pub(crate) fn add(&self, new: &NewRecord<'_>) -> Result<EvidenceRecord, StoreError> {
        let mut records = self.load();
        let record = self.create(new);
        records.push(record.clone());
        self.save(&records)?;
        debug!(id = %record.id, status = ?record.status(), "record added");
        Ok(record)
    }

    /// Remove the record with `id`. Unknown ids succeed without change.
    pub(crate) fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut records = self.load();
        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            debug!(id, "delete matched no record");
        }
        self.save(&records)
    }

    /// Set the transaction id of an existing record and mark it confirmed.
    /// Empty and `"pending"` ids are rejected before the file is touched.
    pub(crate) fn update_transaction_id(
        &self,
        id: &str,
        transaction_id: &str,
    ) -> Result<EvidenceRecord, StoreError> {
        if RecordStatus::for_transaction(transaction_id) != RecordStatus::Confirmed {
            return Err(StoreError::InvalidTransactionId(transaction_id.to_string()));
        }
        let mut records = self.load();
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        record.confirm(transaction_id);
        let updated = record.clone();
        self.save(&records)?;
        Ok(updated)
    }

    fn write_error(&self, source: io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

/// Boundary wrappers that turn store results into `{success, ...}` values.
impl RecordStore {
    pub(crate) fn add_result(&self, new: &NewRecord<'_>) -> OpResult {
        match self.add(new) {
            Ok(record) => OpResult::with_record(record),
            Err(err) => {
                warn!(error = %err, "failed to save record");
                OpResult::failure(format!("Failed to save record: {err}"))
            }
        }
    }

    pub(crate) fn delete_result(&self, id: &str) -> OpResult {
        match self.delete(id) {
            Ok(()) => OpResult::ok(),
            Err(err) => {
                warn!(error = %err, "failed to delete record");
                OpResult::failure(format!("Failed to delete record: {err}"))
            }
        }
    }

    pub(crate) fn update_result(&self, id: &str, transaction_id: &str) -> OpResult {
        match self.update_transaction_id(id, transaction_id) {
            Ok(record) => OpResult::with_record(record),
            Err(err) => {
                warn!(error = %err, "failed to update record");
                OpResult::failure(format!("Failed to update record: {err}"))
            }
        }
    }
}

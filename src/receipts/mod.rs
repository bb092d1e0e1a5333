//! Receipt uploads that are not attached to an expense yet.
//!
//! An upload is written to the object store and tracked by a pending record.
//! The record is removed either when the expense is committed (the artifact
//! stays, referenced by the expense) or when the upload is abandoned (the
//! artifact goes first, then the record). [`sweep`] collects whatever an
//! interrupted session left behind.

mod parser;
mod session;
mod store;

pub(crate) use parser::{parser_from_command, CommandParser, ParsedReceipt, ReceiptParser, TextParser};
pub(crate) use session::ReceiptSession;
pub(crate) use store::{FsObjectStore, ObjectStore};

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::db::Database;

/// Key prefix of every receipt object.
pub(crate) const RECEIPT_PREFIX: &str = "receipts/";

/// File types accepted for upload.
pub(crate) const ACCEPTED_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "gif", "webp", "heic", "pdf", "txt"];

#[derive(Debug, thiserror::Error)]
pub(crate) enum ReceiptError {
    #[error("invalid object key '{0}'")]
    InvalidKey(String),
    #[error("object '{0}' not found")]
    NotFound(String),
    #[error("receipt file is empty")]
    Empty,
    #[error("unsupported receipt type '{0}' (accepted: jpg, png, gif, webp, heic, pdf, txt)")]
    UnsupportedType(String),
    #[error("no receipt uploaded in this session")]
    NothingPending,
    #[error("pending receipt expired and was swept; upload it again")]
    Swept,
    #[error("receipt extraction failed: {0}")]
    Extraction(String),
    #[error("could not decode extraction output: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("nothing recognisable in receipt")]
    Unrecognized,
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

/// What a sweep removed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct SweepReport {
    pub(crate) stale_records: usize,
    pub(crate) orphan_objects: usize,
    /// Artifacts that could not be deleted. Their records are kept for the next sweep.
    pub(crate) failures: usize,
}

impl SweepReport {
    pub(crate) fn is_clean(&self) -> bool {
        self.stale_records == 0 && self.orphan_objects == 0 && self.failures == 0
    }
}

/// Remove pending records older than `max_age` together with their
/// artifacts, then delete receipt objects that neither a pending record nor
/// an expense refers to.
pub(crate) fn sweep(
    db: &Database,
    store: &dyn ObjectStore,
    max_age: chrono::Duration,
    now: DateTime<Utc>,
) -> Result<SweepReport, ReceiptError> {
    let mut report = SweepReport::default();

    for pending in db.get_pending_receipts()? {
        let stale = pending.age(now).map_or(true, |age| age > max_age);
        if !stale {
            continue;
        }
        if let Err(e) = store.delete(&pending.object_key) {
            tracing::warn!(key = %pending.object_key, error = %e, "could not delete stale receipt");
            report.failures += 1;
            continue;
        }
        if let Some(id) = pending.id {
            db.delete_pending_receipt(id)?;
        }
        report.stale_records += 1;
    }

    let mut referenced: HashSet<String> = db.receipt_keys_in_use()?;
    referenced.extend(db.get_pending_receipts()?.into_iter().map(|p| p.object_key));

    for key in store.list(RECEIPT_PREFIX)? {
        if referenced.contains(&key) {
            continue;
        }
        match store.delete(&key) {
            Ok(()) => report.orphan_objects += 1,
            Err(e) => {
                tracing::warn!(%key, error = %e, "could not delete orphan receipt");
                report.failures += 1;
            }
        }
    }

    if report.is_clean() {
        tracing::debug!("receipt sweep found nothing to do");
    } else {
        tracing::info!(
            stale_records = report.stale_records,
            orphan_objects = report.orphan_objects,
            failures = report.failures,
            "receipt sweep"
        );
    }
    Ok(report)
}

/// Lowercased extension of `file_name` if it is an accepted receipt type.
pub(crate) fn receipt_extension(file_name: &str) -> Result<String, ReceiptError> {
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(ReceiptError::UnsupportedType(file_name.to_string()))
    }
}

#[cfg(test)]
mod tests;

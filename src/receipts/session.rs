use super::{receipt_extension, ObjectStore, ParsedReceipt, ReceiptError, ReceiptParser, RECEIPT_PREFIX};
use crate::db::Database;
use crate::models::{Expense, PendingReceipt};

/// One expense form in progress. Holds at most one pending receipt.
#[derive(Debug)]
pub(crate) struct ReceiptSession {
    id: String,
    pending: Option<PendingReceipt>,
    parsed: Option<ParsedReceipt>,
}

impl ReceiptSession {
    pub(crate) fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            pending: None,
            parsed: None,
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn pending(&self) -> Option<&PendingReceipt> {
        self.pending.as_ref()
    }

    pub(crate) fn parsed(&self) -> Option<&ParsedReceipt> {
        self.parsed.as_ref()
    }

    /// Store `bytes` as this session's receipt, replacing the previous one.
    pub(crate) fn upload(
        &mut self,
        db: &Database,
        store: &dyn ObjectStore,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<&PendingReceipt, ReceiptError> {
        if bytes.is_empty() {
            return Err(ReceiptError::Empty);
        }
        let ext = receipt_extension(file_name)?;

        self.discard(db, store)?;

        let key = format!("{RECEIPT_PREFIX}{}.{ext}", uuid::Uuid::new_v4().simple());
        store.put(&key, bytes)?;

        let mut pending = PendingReceipt::new(self.id.clone(), key.clone(), file_name.to_string());
        match db.insert_pending_receipt(&pending) {
            Ok(id) => pending.id = Some(id),
            Err(e) => {
                if let Err(cleanup) = store.delete(&key) {
                    tracing::warn!(%key, error = %cleanup, "untracked receipt left for sweep");
                }
                return Err(e.into());
            }
        }

        tracing::info!(session = %self.id, %key, file_name, "receipt uploaded");
        Ok(self.pending.insert(pending))
    }

    /// Run extraction on the pending receipt. A failed extraction abandons
    /// the upload.
    pub(crate) fn parse(
        &mut self,
        db: &Database,
        store: &dyn ObjectStore,
        parser: &dyn ReceiptParser,
    ) -> Result<&ParsedReceipt, ReceiptError> {
        let pending = self.pending.as_ref().ok_or(ReceiptError::NothingPending)?;
        let result = store
            .get(&pending.object_key)
            .and_then(|bytes| parser.parse(&bytes, &pending.file_name));

        match result {
            Ok(parsed) => {
                tracing::info!(session = %self.id, items = parsed.items.len(), "receipt parsed");
                Ok(self.parsed.insert(parsed))
            }
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "receipt extraction failed");
                if let Err(cleanup) = self.discard(db, store) {
                    tracing::warn!(session = %self.id, error = %cleanup, "could not discard receipt");
                }
                Err(e)
            }
        }
    }

    /// Save the expense. With a pending receipt the expense takes over the
    /// artifact and the tracking record is dropped in the same transaction.
    pub(crate) fn commit(&mut self, db: &mut Database, draft: &Expense) -> Result<i64, ReceiptError> {
        let id = match &self.pending {
            Some(PendingReceipt { id: Some(pending_id), .. }) => {
                if db.get_pending_for_session(&self.id)?.is_none() {
                    self.pending = None;
                    return Err(ReceiptError::Swept);
                }
                db.commit_expense_with_receipt(draft, *pending_id)?
            }
            _ => db.insert_expense(draft)?,
        };
        self.pending = None;
        self.parsed = None;
        tracing::info!(session = %self.id, expense = id, "expense form committed");
        Ok(id)
    }

    /// Abandon the pending receipt, if any.
    pub(crate) fn cancel(&mut self, db: &Database, store: &dyn ObjectStore) -> Result<(), ReceiptError> {
        self.discard(db, store)
    }

    /// Cancel on the way out of a form. Failures are logged and left to the
    /// next sweep.
    pub(crate) fn teardown(&mut self, db: &Database, store: &dyn ObjectStore) {
        if let Err(e) = self.discard(db, store) {
            tracing::warn!(session = %self.id, error = %e, "receipt teardown incomplete");
        }
    }

    /// Artifact first, then the record. If the artifact cannot be deleted the
    /// record stays so the sweep can retry.
    fn discard(&mut self, db: &Database, store: &dyn ObjectStore) -> Result<(), ReceiptError> {
        self.parsed = None;
        let Some(pending) = &self.pending else {
            return Ok(());
        };
        store.delete(&pending.object_key)?;
        if let Some(id) = pending.id {
            db.delete_pending_receipt(id)?;
        }
        tracing::info!(session = %self.id, key = %pending.object_key, "pending receipt discarded");
        self.pending = None;
        Ok(())
    }
}

impl Default for ReceiptSession {
    fn default() -> Self {
        Self::new()
    }
}

//! Token-addressed views of the expense collection for whoever reimburses it.

use chrono::{DateTime, TimeDelta, Utc};

use crate::db::Database;
use crate::models::{Expense, ExpenseStatus, ExpenseTotals, ShareLink};

#[derive(Debug, thiserror::Error)]
pub(crate) enum ShareError {
    #[error("share link not found")]
    UnknownToken,
    #[error("share link has been revoked")]
    Revoked,
    #[error("share link expired")]
    Expired,
    #[error("expense {0} is not part of this collection")]
    UnknownExpense(i64),
    #[error("share link lifetime of {0} days is out of range")]
    TtlOutOfRange(i64),
    #[error("expense {id} is {status}; only submitted expenses can be marked reimbursed")]
    NotSubmitted { id: i64, status: ExpenseStatus },
    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

/// Create a link. `ttl_days` of `None` or zero never expires.
pub(crate) fn create(db: &Database, label: &str, ttl_days: Option<i64>) -> Result<ShareLink, ShareError> {
    let expires_at = match ttl_days.filter(|d| *d > 0) {
        Some(days) => Some(
            TimeDelta::try_days(days)
                .and_then(|ttl| Utc::now().checked_add_signed(ttl))
                .ok_or(ShareError::TtlOutOfRange(days))?,
        ),
        None => None,
    };
    let token = uuid::Uuid::new_v4().simple().to_string();
    let mut link = ShareLink::new(token, label.trim().to_string(), expires_at);
    link.id = Some(db.insert_share_link(&link)?);
    tracing::info!(id = link.id, label = %link.label, expires = link.expires_at.as_deref().unwrap_or("never"), "share link created");
    Ok(link)
}

fn load_live_link(db: &Database, token: &str, now: DateTime<Utc>) -> Result<ShareLink, ShareError> {
    let link = db
        .get_share_link_by_token(token)?
        .ok_or(ShareError::UnknownToken)?;
    if link.revoked {
        return Err(ShareError::Revoked);
    }
    if link.is_expired(now) {
        return Err(ShareError::Expired);
    }
    Ok(link)
}

/// What a token holder may see and do.
pub(crate) struct ShareView<'a> {
    db: &'a Database,
    link: ShareLink,
}

impl<'a> ShareView<'a> {
    pub(crate) fn open(db: &'a Database, token: &str, now: DateTime<Utc>) -> Result<Self, ShareError> {
        let link = load_live_link(db, token.trim(), now)?;
        Ok(Self { db, link })
    }

    pub(crate) fn link(&self) -> &ShareLink {
        &self.link
    }

    pub(crate) fn expenses(&self) -> Result<Vec<Expense>, ShareError> {
        Ok(self.db.get_expenses(None)?)
    }

    pub(crate) fn totals(&self) -> Result<ExpenseTotals, ShareError> {
        Ok(self.db.expense_totals()?)
    }

    /// The only write a share link allows.
    /// The link is checked again against the stored row, so a revoke or
    /// expiry after `open` blocks the write.
    pub(crate) fn mark_reimbursed(&self, id: i64) -> Result<(), ShareError> {
        load_live_link(self.db, &self.link.token, Utc::now())?;
        let expense = self
            .db
            .get_expense(id)?
            .ok_or(ShareError::UnknownExpense(id))?;
        if expense.status != ExpenseStatus::Submitted {
            return Err(ShareError::NotSubmitted {
                id,
                status: expense.status,
            });
        }
        self.db.update_expense_status(id, ExpenseStatus::Reimbursed)?;
        tracing::info!(id, link = self.link.id, "expense reimbursed through share link");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use rust_decimal_macros::dec;

    fn submitted_expense(db: &Database) -> i64 {
        let id = db
            .insert_expense(&Expense::new(
                "2024-04-02".into(),
                "Airline".into(),
                "Conference flight".into(),
                dec!(320),
            ))
            .unwrap();
        db.update_expense_status(id, ExpenseStatus::Submitted).unwrap();
        id
    }

    #[test]
    fn test_create_and_open() {
        let db = Database::open_in_memory().unwrap();
        let link = create(&db, "  Finance team ", Some(7)).unwrap();
        assert_eq!(link.label, "Finance team");
        assert_eq!(link.token.len(), 32);
        assert!(link.expires_at.is_some());

        let view = ShareView::open(&db, &link.token, Utc::now()).unwrap();
        assert_eq!(view.link().id, link.id);
    }

    #[test]
    fn test_tokens_are_unique() {
        let db = Database::open_in_memory().unwrap();
        let a = create(&db, "a", None).unwrap();
        let b = create(&db, "b", None).unwrap();
        assert_ne!(a.token, b.token);
        assert!(a.expires_at.is_none());
    }

    #[test]
    fn test_open_rejects_unknown_revoked_expired() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            ShareView::open(&db, "nope", Utc::now()),
            Err(ShareError::UnknownToken)
        ));

        let expiring = create(&db, "short", Some(1)).unwrap();
        assert!(matches!(
            ShareView::open(&db, &expiring.token, Utc::now() + TimeDelta::days(2)),
            Err(ShareError::Expired)
        ));

        let revoked = create(&db, "gone", None).unwrap();
        db.revoke_share_link(revoked.id.unwrap()).unwrap();
        assert!(matches!(
            ShareView::open(&db, &revoked.token, Utc::now()),
            Err(ShareError::Revoked)
        ));
    }

    #[test]
    fn test_view_reads_expenses_and_totals() {
        let db = Database::open_in_memory().unwrap();
        submitted_expense(&db);
        db.insert_expense(&Expense::new("2024-04-03".into(), "Cab".into(), String::new(), dec!(20)))
            .unwrap();
        let link = create(&db, "", None).unwrap();
        let view = ShareView::open(&db, &link.token, Utc::now()).unwrap();

        assert_eq!(view.expenses().unwrap().len(), 2);
        let totals = view.totals().unwrap();
        assert_eq!(totals.submitted, dec!(320));
        assert_eq!(totals.pending, dec!(20));
    }

    #[test]
    fn test_mark_reimbursed_only_from_submitted() {
        let db = Database::open_in_memory().unwrap();
        let submitted = submitted_expense(&db);
        let pending = db
            .insert_expense(&Expense::new("2024-04-03".into(), "Cab".into(), String::new(), dec!(20)))
            .unwrap();
        let link = create(&db, "", None).unwrap();
        let view = ShareView::open(&db, &link.token, Utc::now()).unwrap();

        view.mark_reimbursed(submitted).unwrap();
        assert_eq!(
            db.get_expense(submitted).unwrap().unwrap().status,
            ExpenseStatus::Reimbursed
        );

        assert!(matches!(
            view.mark_reimbursed(submitted),
            Err(ShareError::NotSubmitted { .. })
        ));
        assert!(matches!(
            view.mark_reimbursed(pending),
            Err(ShareError::NotSubmitted { .. })
        ));
        assert!(matches!(
            view.mark_reimbursed(9999),
            Err(ShareError::UnknownExpense(9999))
        ));
    }

    #[test]
    fn test_revoking_an_open_view_blocks_writes() {
        let db = Database::open_in_memory().unwrap();
        let submitted = submitted_expense(&db);
        let link = create(&db, "", None).unwrap();
        let view = ShareView::open(&db, &link.token, Utc::now()).unwrap();

        db.revoke_share_link(link.id.unwrap()).unwrap();
        assert!(matches!(
            view.mark_reimbursed(submitted),
            Err(ShareError::Revoked)
        ));
        assert_eq!(
            db.get_expense(submitted).unwrap().unwrap().status,
            ExpenseStatus::Submitted
        );
    }

    #[test]
    fn test_create_rejects_unrepresentable_ttl() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            create(&db, "forever-ish", Some(i64::MAX)),
            Err(ShareError::TtlOutOfRange(i64::MAX))
        ));
        assert!(db.get_share_links().unwrap().is_empty());
    }
}

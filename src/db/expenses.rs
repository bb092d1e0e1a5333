use anyhow::{anyhow, bail, Context, Result};
use rusqlite::{params, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;

use super::{decimal_at, Database};
use crate::models::*;

const EXPENSE_COLUMNS: &str =
    "id, date, vendor, description, amount, status, receipt_key, line_items, created_at";
const PENDING_COLUMNS: &str = "id, session_id, object_key, file_name, created_at";
const SHARE_COLUMNS: &str = "id, token, label, created_at, expires_at, revoked";

impl Database {
    // ── Expenses ──────────────────────────────────────────────

    pub(crate) fn insert_expense(&self, expense: &Expense) -> Result<i64> {
        let items = serde_json::to_string(&expense.line_items)?;
        self.conn.execute(
            "INSERT INTO expenses (date, vendor, description, amount, status, receipt_key, line_items, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                expense.date,
                expense.vendor,
                expense.description,
                expense.amount.to_string(),
                expense.status.as_str(),
                expense.receipt_key,
                items,
                expense.created_at,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, amount = %expense.amount, "expense created");
        Ok(id)
    }

    pub(crate) fn get_expenses(&self, status: Option<ExpenseStatus>) -> Result<Vec<Expense>> {
        let mut sql = format!("SELECT {EXPENSE_COLUMNS} FROM expenses");
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        if let Some(s) = status {
            sql.push_str(" WHERE status = ?1");
            param_values.push(Box::new(s.as_str()));
        }
        sql.push_str(" ORDER BY date DESC, id DESC");

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_ref.as_slice(), expense_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn get_expense(&self, id: i64) -> Result<Option<Expense>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?1"),
                params![id],
                expense_from_row,
            )
            .optional()?)
    }

    pub(crate) fn update_expense_status(&self, id: i64, status: ExpenseStatus) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE expenses SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            bail!("Expense {id} not found");
        }
        tracing::info!(id, %status, "expense status changed");
        Ok(())
    }

    /// Delete an expense. Returns the key of its receipt so the caller can
    /// remove the stored object.
    pub(crate) fn delete_expense(&self, id: i64) -> Result<Option<String>> {
        let key: Option<String> = self
            .conn
            .query_row(
                "SELECT receipt_key FROM expenses WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| anyhow!("Expense {id} not found"))?;
        self.conn
            .execute("DELETE FROM expenses WHERE id = ?1", params![id])?;
        tracing::info!(id, "expense deleted");
        Ok(key)
    }

    pub(crate) fn expense_totals(&self) -> Result<ExpenseTotals> {
        let mut totals = ExpenseTotals::default();
        for expense in self.get_expenses(None)? {
            match expense.status {
                ExpenseStatus::Pending => totals.pending += expense.amount,
                ExpenseStatus::Submitted => totals.submitted += expense.amount,
                ExpenseStatus::Reimbursed => totals.reimbursed += expense.amount,
            }
        }
        Ok(totals)
    }

    /// Receipt keys referenced by committed expenses.
    pub(crate) fn receipt_keys_in_use(&self) -> Result<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT receipt_key FROM expenses WHERE receipt_key IS NOT NULL")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<std::result::Result<HashSet<_>, _>>()?)
    }

    pub(crate) fn export_expenses_to_csv(
        &self,
        path: &str,
        status: Option<ExpenseStatus>,
    ) -> Result<usize> {
        let expenses = self.get_expenses(status)?;
        if expenses.is_empty() {
            return Ok(0);
        }

        let mut wtr = csv::Writer::from_path(Path::new(path))
            .with_context(|| format!("Failed to create export file: {path}"))?;
        wtr.write_record(["Date", "Vendor", "Description", "Amount", "Status", "Receipt"])?;
        for e in &expenses {
            wtr.write_record([
                e.date.as_str(),
                e.vendor.as_str(),
                e.description.as_str(),
                e.amount.to_string().as_str(),
                e.status.as_str(),
                e.receipt_key.as_deref().unwrap_or(""),
            ])?;
        }
        wtr.flush()?;
        tracing::info!(count = expenses.len(), %path, "expenses exported");
        Ok(expenses.len())
    }

    // ── Pending receipts ──────────────────────────────────────

    pub(crate) fn insert_pending_receipt(&self, pending: &PendingReceipt) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO pending_receipts (session_id, object_key, file_name, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    pending.session_id,
                    pending.object_key,
                    pending.file_name,
                    pending.created_at,
                ],
            )
            .with_context(|| {
                format!("Session {} already tracks a pending receipt", pending.session_id)
            })?;
        Ok(self.conn.last_insert_rowid())
    }

    pub(crate) fn get_pending_receipts(&self) -> Result<Vec<PendingReceipt>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PENDING_COLUMNS} FROM pending_receipts ORDER BY created_at, id"
        ))?;
        let rows = stmt.query_map([], pending_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn get_pending_for_session(&self, session_id: &str) -> Result<Option<PendingReceipt>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {PENDING_COLUMNS} FROM pending_receipts WHERE session_id = ?1"),
                params![session_id],
                pending_from_row,
            )
            .optional()?)
    }

    pub(crate) fn delete_pending_receipt(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM pending_receipts WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    /// Insert `expense` with the pending artifact attached and drop the
    /// tracking record, atomically.
    pub(crate) fn commit_expense_with_receipt(
        &mut self,
        expense: &Expense,
        pending_id: i64,
    ) -> Result<i64> {
        let tx = self.conn.transaction()?;
        let object_key: String = tx
            .query_row(
                "SELECT object_key FROM pending_receipts WHERE id = ?1",
                params![pending_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| anyhow!("Pending receipt {pending_id} is no longer tracked"))?;

        let items = serde_json::to_string(&expense.line_items)?;
        tx.execute(
            "INSERT INTO expenses (date, vendor, description, amount, status, receipt_key, line_items, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                expense.date,
                expense.vendor,
                expense.description,
                expense.amount.to_string(),
                expense.status.as_str(),
                object_key,
                items,
                expense.created_at,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "DELETE FROM pending_receipts WHERE id = ?1",
            params![pending_id],
        )?;
        tx.commit()?;

        tracing::info!(id, %object_key, "expense committed with receipt");
        Ok(id)
    }

    // ── Share links ───────────────────────────────────────────

    pub(crate) fn insert_share_link(&self, link: &ShareLink) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO share_links (token, label, created_at, expires_at, revoked)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                link.token,
                link.label,
                link.created_at,
                link.expires_at,
                link.revoked,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub(crate) fn get_share_links(&self) -> Result<Vec<ShareLink>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SHARE_COLUMNS} FROM share_links ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map([], share_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn get_share_link_by_token(&self, token: &str) -> Result<Option<ShareLink>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {SHARE_COLUMNS} FROM share_links WHERE token = ?1"),
                params![token],
                share_from_row,
            )
            .optional()?)
    }

    pub(crate) fn revoke_share_link(&self, id: i64) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE share_links SET revoked = 1 WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            bail!("Share link {id} not found");
        }
        tracing::info!(id, "share link revoked");
        Ok(())
    }
}

fn expense_from_row(row: &Row<'_>) -> rusqlite::Result<Expense> {
    let status: String = row.get(5)?;
    let items: String = row.get(7)?;
    Ok(Expense {
        id: Some(row.get(0)?),
        date: row.get(1)?,
        vendor: row.get(2)?,
        description: row.get(3)?,
        amount: decimal_at(row, 4)?,
        status: ExpenseStatus::parse(&status).unwrap_or(ExpenseStatus::Pending),
        receipt_key: row.get(6)?,
        line_items: serde_json::from_str(&items).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?,
        created_at: row.get(8)?,
    })
}

fn pending_from_row(row: &Row<'_>) -> rusqlite::Result<PendingReceipt> {
    Ok(PendingReceipt {
        id: Some(row.get(0)?),
        session_id: row.get(1)?,
        object_key: row.get(2)?,
        file_name: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn share_from_row(row: &Row<'_>) -> rusqlite::Result<ShareLink> {
    Ok(ShareLink {
        id: Some(row.get(0)?),
        token: row.get(1)?,
        label: row.get(2)?,
        created_at: row.get(3)?,
        expires_at: row.get(4)?,
        revoked: row.get(5)?,
    })
}

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use super::{decimal_at, Database};
use crate::models::*;

/// A stored aggregate that no longer matches the sum of its entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TotalsDrift {
    /// Category name, or `None` for the period total.
    pub(crate) category: Option<String>,
    pub(crate) stored: Decimal,
    pub(crate) actual: Decimal,
}

const CATEGORY_COLUMNS: &str = "id, month, name, goal, total, color";
const ENTRY_COLUMNS: &str =
    "e.id, e.category_id, e.date, e.description, e.amount, e.recurring_id, e.created_at";

impl Database {
    // ── Periods ───────────────────────────────────────────────

    /// Create a period, carrying over the categories of the latest earlier
    /// period and materializing every active recurring definition into it.
    pub(crate) fn create_period(&mut self, month: &str) -> Result<PeriodSummary> {
        let month =
            Period::normalize_month(month).ok_or_else(|| anyhow!("Invalid month: {month}"))?;

        let tx = self.conn.transaction()?;
        if period_exists(&tx, &month)? {
            bail!("Period {month} already exists");
        }

        let period = Period::new(month.clone());
        tx.execute(
            "INSERT INTO periods (month, total, created_at) VALUES (?1, '0', ?2)",
            params![period.month, period.created_at],
        )?;

        let copied_from: Option<String> = tx
            .query_row(
                "SELECT month FROM periods WHERE month < ?1 ORDER BY month DESC LIMIT 1",
                params![month],
                |row| row.get(0),
            )
            .optional()?;

        let categories_copied = match &copied_from {
            Some(source) => tx.execute(
                "INSERT INTO categories (month, name, goal, total, color)
                 SELECT ?1, name, goal, '0', color FROM categories WHERE month = ?2",
                params![month, source],
            )?,
            None => 0,
        };

        let recurring = query_recurring(&tx, true)?;
        let now = chrono::Utc::now().to_rfc3339();
        let mut entries_materialized = 0;
        for rec in &recurring {
            let Some(date) = rec.occurrence_date(&month) else {
                continue;
            };
            let category_id = find_or_create_category(&tx, &month, &rec.category_name)?;
            tx.execute(
                "INSERT INTO entries (category_id, date, description, amount, recurring_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    category_id,
                    date.format("%Y-%m-%d").to_string(),
                    rec.description,
                    rec.amount.to_string(),
                    rec.id,
                    now,
                ],
            )?;
            apply_delta(&tx, category_id, rec.amount)?;
            entries_materialized += 1;
        }

        tx.commit()?;

        tracing::info!(
            %month,
            copied_from = copied_from.as_deref().unwrap_or("-"),
            categories_copied,
            entries_materialized,
            "period created"
        );

        Ok(PeriodSummary {
            month,
            copied_from,
            categories_copied,
            entries_materialized,
        })
    }

    pub(crate) fn get_periods(&self) -> Result<Vec<Period>> {
        let mut stmt = self
            .conn
            .prepare("SELECT month, total, created_at FROM periods ORDER BY month DESC")?;
        let rows = stmt.query_map([], period_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn get_period(&self, month: &str) -> Result<Option<Period>> {
        Ok(self
            .conn
            .query_row(
                "SELECT month, total, created_at FROM periods WHERE month = ?1",
                params![month],
                period_from_row,
            )
            .optional()?)
    }

    /// Delete a period together with its categories and entries.
    pub(crate) fn delete_period(&self, month: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM periods WHERE month = ?1", params![month])?;
        if deleted > 0 {
            tracing::info!(%month, "period deleted");
        }
        Ok(deleted > 0)
    }

    // ── Categories ────────────────────────────────────────────

    pub(crate) fn get_categories(&self, month: &str) -> Result<Vec<Category>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE month = ?1 ORDER BY name COLLATE NOCASE"
        ))?;
        let rows = stmt.query_map(params![month], category_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn get_category_by_id(&self, id: i64) -> Result<Option<Category>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1"),
                params![id],
                category_from_row,
            )
            .optional()?)
    }

    /// Insert a category. Its total always starts at zero.
    pub(crate) fn insert_category(&self, cat: &Category) -> Result<i64> {
        if !period_exists(&self.conn, &cat.month)? {
            bail!("Period {} does not exist. Create it with :period {}", cat.month, cat.month);
        }
        let name = cat.name.trim();
        if name.is_empty() {
            bail!("Category name cannot be empty");
        }
        if find_category(&self.conn, &cat.month, name)?.is_some() {
            bail!("Category '{name}' already exists in {}", cat.month);
        }
        self.conn.execute(
            "INSERT INTO categories (month, name, goal, total, color) VALUES (?1, ?2, ?3, '0', ?4)",
            params![cat.month, name, cat.goal.to_string(), cat.color],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, month = %cat.month, %name, goal = %cat.goal, "category created");
        Ok(id)
    }

    pub(crate) fn update_category_goal(&self, id: i64, goal: Decimal) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE categories SET goal = ?1 WHERE id = ?2",
            params![goal.to_string(), id],
        )?;
        if changed == 0 {
            bail!("Category {id} not found");
        }
        Ok(())
    }

    pub(crate) fn rename_category(&self, id: i64, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Category name cannot be empty");
        }
        let changed = self
            .conn
            .execute(
                "UPDATE categories SET name = ?1 WHERE id = ?2",
                params![name, id],
            )
            .with_context(|| format!("Could not rename category to '{name}'"))?;
        if changed == 0 {
            bail!("Category {id} not found");
        }
        Ok(())
    }

    /// Delete a category and its entries, taking its total off the period.
    pub(crate) fn delete_category(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        let (month, total): (String, Decimal) = tx
            .query_row(
                "SELECT month, total FROM categories WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, decimal_at(row, 1)?)),
            )
            .optional()?
            .ok_or_else(|| anyhow!("Category {id} not found"))?;

        tx.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
        adjust_period(&tx, &month, -total)?;
        tx.commit()?;
        tracing::info!(id, %month, removed = %total, "category deleted");
        Ok(())
    }

    // ── Entries ───────────────────────────────────────────────

    pub(crate) fn insert_entry(&mut self, entry: &Entry) -> Result<i64> {
        let tx = self.conn.transaction()?;
        let month = category_month(&tx, entry.category_id)?;
        ensure_date_in_month(&entry.date, &month)?;

        tx.execute(
            "INSERT INTO entries (category_id, date, description, amount, recurring_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.category_id,
                entry.date,
                entry.description,
                entry.amount.to_string(),
                entry.recurring_id,
                entry.created_at,
            ],
        )?;
        let id = tx.last_insert_rowid();
        apply_delta(&tx, entry.category_id, entry.amount)?;
        tx.commit()?;

        tracing::debug!(id, category_id = entry.category_id, amount = %entry.amount, "entry created");
        Ok(id)
    }

    /// Update an entry. Moving it to another category takes the old amount off
    /// the old category and adds the new amount to the new one.
    pub(crate) fn update_entry(&mut self, id: i64, update: &EntryUpdate) -> Result<()> {
        let tx = self.conn.transaction()?;
        let old = tx
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries e WHERE e.id = ?1"),
                params![id],
                entry_from_row,
            )
            .optional()?
            .ok_or_else(|| anyhow!("Entry {id} not found"))?;

        let category_id = update.category_id.unwrap_or(old.category_id);
        let date = update.date.clone().unwrap_or_else(|| old.date.clone());
        let description = update
            .description
            .clone()
            .unwrap_or_else(|| old.description.clone());
        let amount = update.amount.unwrap_or(old.amount);

        let month = category_month(&tx, category_id)?;
        ensure_date_in_month(&date, &month)?;

        tx.execute(
            "UPDATE entries SET category_id = ?1, date = ?2, description = ?3, amount = ?4 WHERE id = ?5",
            params![category_id, date, description, amount.to_string(), id],
        )?;

        if category_id == old.category_id {
            apply_delta(&tx, category_id, amount - old.amount)?;
        } else {
            apply_delta(&tx, old.category_id, -old.amount)?;
            apply_delta(&tx, category_id, amount)?;
        }
        tx.commit()?;

        tracing::debug!(
            id,
            from_category = old.category_id,
            to_category = category_id,
            old_amount = %old.amount,
            new_amount = %amount,
            "entry updated"
        );
        Ok(())
    }

    pub(crate) fn delete_entry(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        let (category_id, amount): (i64, Decimal) = tx
            .query_row(
                "SELECT category_id, amount FROM entries WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, decimal_at(row, 1)?)),
            )
            .optional()?
            .ok_or_else(|| anyhow!("Entry {id} not found"))?;

        tx.execute("DELETE FROM entries WHERE id = ?1", params![id])?;
        apply_delta(&tx, category_id, -amount)?;
        tx.commit()?;

        tracing::debug!(id, category_id, amount = %amount, "entry deleted");
        Ok(())
    }

    pub(crate) fn get_entry(&self, id: i64) -> Result<Option<Entry>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries e WHERE e.id = ?1"),
                params![id],
                entry_from_row,
            )
            .optional()?)
    }

    pub(crate) fn get_entries(&self, category_id: i64) -> Result<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries e WHERE e.category_id = ?1
             ORDER BY e.date DESC, e.id DESC"
        ))?;
        let rows = stmt.query_map(params![category_id], entry_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn get_entries_for_period(&self, month: &str) -> Result<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries e
             JOIN categories c ON e.category_id = c.id
             WHERE c.month = ?1
             ORDER BY e.date DESC, e.id DESC"
        ))?;
        let rows = stmt.query_map(params![month], entry_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    // ── Totals ────────────────────────────────────────────────

    /// Compare stored totals of a period and its categories with the sums of
    /// their entries.
    pub(crate) fn verify_totals(&self, month: &str) -> Result<Vec<TotalsDrift>> {
        let period = self
            .get_period(month)?
            .ok_or_else(|| anyhow!("Period {month} not found"))?;

        let mut drifts = Vec::new();
        let mut period_actual = Decimal::ZERO;
        for cat in self.get_categories(month)? {
            let Some(id) = cat.id else { continue };
            let actual = sum_entries(&self.conn, id)?;
            period_actual += actual;
            if actual != cat.total {
                drifts.push(TotalsDrift {
                    category: Some(cat.name.clone()),
                    stored: cat.total,
                    actual,
                });
            }
        }
        if period_actual != period.total {
            drifts.push(TotalsDrift {
                category: None,
                stored: period.total,
                actual: period_actual,
            });
        }
        Ok(drifts)
    }

    /// Recompute every aggregate of a period from its entries. Returns the
    /// number of aggregates that had drifted.
    pub(crate) fn repair_totals(&mut self, month: &str) -> Result<usize> {
        let drifts = self.verify_totals(month)?;
        if drifts.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let ids: Vec<i64> = {
            let mut stmt = tx.prepare("SELECT id FROM categories WHERE month = ?1")?;
            let rows = stmt.query_map(params![month], |row| row.get(0))?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        };
        let mut period_total = Decimal::ZERO;
        for id in ids {
            let actual = sum_entries(&tx, id)?;
            period_total += actual;
            tx.execute(
                "UPDATE categories SET total = ?1 WHERE id = ?2",
                params![actual.to_string(), id],
            )?;
        }
        tx.execute(
            "UPDATE periods SET total = ?1 WHERE month = ?2",
            params![period_total.to_string(), month],
        )?;
        tx.commit()?;

        tracing::warn!(%month, repaired = drifts.len(), "totals repaired");
        Ok(drifts.len())
    }

    // ── Recurring expenses ────────────────────────────────────

    pub(crate) fn insert_recurring(&self, rec: &RecurringExpense) -> Result<i64> {
        if rec.category_name.trim().is_empty() {
            bail!("Recurring expense needs a category name");
        }
        self.conn.execute(
            "INSERT INTO recurring_expenses (description, amount, category_name, day_of_month, active)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                rec.description,
                rec.amount.to_string(),
                rec.category_name.trim(),
                rec.day_of_month,
                rec.active,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, description = %rec.description, "recurring expense created");
        Ok(id)
    }

    pub(crate) fn get_recurring(&self) -> Result<Vec<RecurringExpense>> {
        query_recurring(&self.conn, false)
    }

    pub(crate) fn set_recurring_active(&self, id: i64, active: bool) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE recurring_expenses SET active = ?1 WHERE id = ?2",
            params![active, id],
        )?;
        if changed == 0 {
            bail!("Recurring expense {id} not found");
        }
        Ok(())
    }

    /// Delete a definition. Entries already materialized from it are kept.
    pub(crate) fn delete_recurring(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM recurring_expenses WHERE id = ?1", params![id])?;
        if changed == 0 {
            bail!("Recurring expense {id} not found");
        }
        Ok(())
    }
}

// ── Helpers shared by transactions ───────────────────────────

fn period_exists(conn: &Connection, month: &str) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM periods WHERE month = ?1)",
        params![month],
        |row| row.get(0),
    )?)
}

fn category_month(conn: &Connection, category_id: i64) -> Result<String> {
    conn.query_row(
        "SELECT month FROM categories WHERE id = ?1",
        params![category_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| anyhow!("Category {category_id} not found"))
}

fn find_category(conn: &Connection, month: &str, name: &str) -> Result<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT id FROM categories WHERE month = ?1 AND name = ?2 COLLATE NOCASE",
            params![month, name.trim()],
            |row| row.get(0),
        )
        .optional()?)
}

fn find_or_create_category(conn: &Connection, month: &str, name: &str) -> Result<i64> {
    if let Some(id) = find_category(conn, month, name)? {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO categories (month, name, goal, total, color) VALUES (?1, ?2, '0', '0', '')",
        params![month, name.trim()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Apply a signed delta to a category total and to its period total.
fn apply_delta(conn: &Connection, category_id: i64, delta: Decimal) -> Result<()> {
    if delta.is_zero() {
        return Ok(());
    }
    let (month, total): (String, Decimal) = conn
        .query_row(
            "SELECT month, total FROM categories WHERE id = ?1",
            params![category_id],
            |row| Ok((row.get(0)?, decimal_at(row, 1)?)),
        )
        .optional()?
        .ok_or_else(|| anyhow!("Category {category_id} not found"))?;

    let new_total = total
        .checked_add(delta)
        .ok_or_else(|| anyhow!("Category total overflow"))?;
    conn.execute(
        "UPDATE categories SET total = ?1 WHERE id = ?2",
        params![new_total.to_string(), category_id],
    )?;
    adjust_period(conn, &month, delta)
}

fn adjust_period(conn: &Connection, month: &str, delta: Decimal) -> Result<()> {
    if delta.is_zero() {
        return Ok(());
    }
    let total: Decimal = conn.query_row(
        "SELECT total FROM periods WHERE month = ?1",
        params![month],
        |row| decimal_at(row, 0),
    )?;
    let new_total = total
        .checked_add(delta)
        .ok_or_else(|| anyhow!("Period total overflow"))?;
    conn.execute(
        "UPDATE periods SET total = ?1 WHERE month = ?2",
        params![new_total.to_string(), month],
    )?;
    Ok(())
}

fn sum_entries(conn: &Connection, category_id: i64) -> Result<Decimal> {
    let mut stmt = conn.prepare("SELECT amount FROM entries WHERE category_id = ?1")?;
    let rows = stmt.query_map(params![category_id], |row| decimal_at(row, 0))?;
    let mut sum = Decimal::ZERO;
    for amount in rows {
        sum += amount?;
    }
    Ok(sum)
}

fn ensure_date_in_month(date: &str, month: &str) -> Result<()> {
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{date}', expected YYYY-MM-DD"))?;
    if parsed.format("%Y-%m").to_string() != month {
        bail!("Date {date} is outside period {month}");
    }
    Ok(())
}

fn query_recurring(conn: &Connection, active_only: bool) -> Result<Vec<RecurringExpense>> {
    let sql = if active_only {
        "SELECT id, description, amount, category_name, day_of_month, active
         FROM recurring_expenses WHERE active = 1 ORDER BY day_of_month, id"
    } else {
        "SELECT id, description, amount, category_name, day_of_month, active
         FROM recurring_expenses ORDER BY day_of_month, id"
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| {
        Ok(RecurringExpense {
            id: Some(row.get(0)?),
            description: row.get(1)?,
            amount: decimal_at(row, 2)?,
            category_name: row.get(3)?,
            day_of_month: row.get(4)?,
            active: row.get(5)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

fn period_from_row(row: &Row<'_>) -> rusqlite::Result<Period> {
    Ok(Period {
        month: row.get(0)?,
        total: decimal_at(row, 1)?,
        created_at: row.get(2)?,
    })
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: Some(row.get(0)?),
        month: row.get(1)?,
        name: row.get(2)?,
        goal: decimal_at(row, 3)?,
        total: decimal_at(row, 4)?,
        color: row.get(5)?,
    })
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: Some(row.get(0)?),
        category_id: row.get(1)?,
        date: row.get(2)?,
        description: row.get(3)?,
        amount: decimal_at(row, 4)?,
        recurring_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

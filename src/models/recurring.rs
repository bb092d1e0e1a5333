use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

/// Template that is materialized into an entry whenever a new period is created.
#[derive(Debug, Clone)]
pub struct RecurringExpense {
    pub id: Option<i64>,
    pub description: String,
    pub amount: Decimal,
    /// Matched case-insensitively against category names of the new period.
    pub category_name: String,
    /// 1..=31, clamped to the length of the month.
    pub day_of_month: u32,
    pub active: bool,
}

impl RecurringExpense {
    pub fn new(description: String, amount: Decimal, category_name: String, day_of_month: u32) -> Self {
        Self {
            id: None,
            description,
            amount,
            category_name,
            day_of_month: day_of_month.clamp(1, 31),
            active: true,
        }
    }

    /// The date this definition lands on in `month` ("YYYY-MM").
    pub fn occurrence_date(&self, month: &str) -> Option<NaiveDate> {
        let first = NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d").ok()?;
        let last_day = last_day_of_month(first);
        let day = self.day_of_month.clamp(1, last_day);
        first.with_day(day)
    }
}

fn last_day_of_month(first: NaiveDate) -> u32 {
    first
        .checked_add_months(chrono::Months::new(1))
        .and_then(|next| next.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

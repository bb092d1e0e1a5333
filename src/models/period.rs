use rust_decimal::Decimal;

/// A monthly budget period. `total` is derived from the entries of every
/// category in the period and is only ever moved by signed deltas.
#[derive(Debug, Clone)]
pub struct Period {
    /// Format: "YYYY-MM"
    pub month: String,
    pub total: Decimal,
    pub created_at: String,
}

impl Period {
    pub fn new(month: String) -> Self {
        Self {
            month,
            total: Decimal::ZERO,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Validate and normalize a month string ("2024-1" -> "2024-01").
    pub fn normalize_month(input: &str) -> Option<String> {
        let date = chrono::NaiveDate::parse_from_str(&format!("{}-01", input.trim()), "%Y-%m-%d")
            .ok()?;
        Some(date.format("%Y-%m").to_string())
    }

    /// The month right before `month`, if `month` is valid.
    pub fn previous_month(month: &str) -> Option<String> {
        shift_month(month, -1)
    }

    pub fn next_month(month: &str) -> Option<String> {
        shift_month(month, 1)
    }

    /// Whether an ISO date ("YYYY-MM-DD") falls inside this period.
    pub fn contains_date(&self, date: &str) -> bool {
        date.len() >= 7 && date.starts_with(&self.month)
    }
}

fn shift_month(month: &str, delta: i32) -> Option<String> {
    let date = chrono::NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d").ok()?;
    let shifted = if delta >= 0 {
        date.checked_add_months(chrono::Months::new(delta as u32))
    } else {
        date.checked_sub_months(chrono::Months::new(delta.unsigned_abs()))
    }?;
    Some(shifted.format("%Y-%m").to_string())
}

/// Outcome of creating a period.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodSummary {
    pub month: String,
    pub copied_from: Option<String>,
    pub categories_copied: usize,
    pub entries_materialized: usize,
}

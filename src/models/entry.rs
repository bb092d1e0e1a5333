use rust_decimal::Decimal;

/// A dated amount spent inside a budget category.
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: Option<i64>,
    pub category_id: i64,
    /// Format: "YYYY-MM-DD"
    pub date: String,
    pub description: String,
    pub amount: Decimal,
    /// Set when the entry was materialized from a recurring definition.
    pub recurring_id: Option<i64>,
    pub created_at: String,
}

impl Entry {
    pub fn new(category_id: i64, date: String, description: String, amount: Decimal) -> Self {
        Self {
            id: None,
            category_id,
            date,
            description,
            amount,
            recurring_id: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_refund(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    pub fn is_recurring(&self) -> bool {
        self.recurring_id.is_some()
    }
}

/// Partial update of an entry. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct EntryUpdate {
    pub category_id: Option<i64>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
}

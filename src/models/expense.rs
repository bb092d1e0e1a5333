use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseStatus {
    /// Recorded but not yet sent for reimbursement.
    Pending,
    Submitted,
    Reimbursed,
}

impl ExpenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Submitted => "Submitted",
            Self::Reimbursed => "Reimbursed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" | "p" => Some(Self::Pending),
            "submitted" | "s" => Some(Self::Submitted),
            "reimbursed" | "r" | "paid" => Some(Self::Reimbursed),
            _ => None,
        }
    }

    pub fn all() -> &'static [ExpenseStatus] {
        &[Self::Pending, Self::Submitted, Self::Reimbursed]
    }
}

impl std::fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct Expense {
    pub id: Option<i64>,
    /// Format: "YYYY-MM-DD"
    pub date: String,
    pub vendor: String,
    pub description: String,
    pub amount: Decimal,
    pub status: ExpenseStatus,
    /// Object-store key of the attached receipt, if any.
    pub receipt_key: Option<String>,
    pub line_items: Vec<LineItem>,
    pub created_at: String,
}

impl Expense {
    pub fn new(date: String, vendor: String, description: String, amount: Decimal) -> Self {
        Self {
            id: None,
            date,
            vendor,
            description,
            amount,
            status: ExpenseStatus::Pending,
            receipt_key: None,
            line_items: Vec::new(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn has_receipt(&self) -> bool {
        self.receipt_key.is_some()
    }

    /// Sum of the line items, when the receipt was itemized.
    pub fn items_total(&self) -> Option<Decimal> {
        if self.line_items.is_empty() {
            None
        } else {
            Some(self.line_items.iter().map(|i| i.amount).sum())
        }
    }
}

/// Sum of expense amounts per status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseTotals {
    pub pending: Decimal,
    pub submitted: Decimal,
    pub reimbursed: Decimal,
}

impl ExpenseTotals {
    pub fn outstanding(&self) -> Decimal {
        self.pending + self.submitted
    }
}

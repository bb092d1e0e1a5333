use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct Category {
    pub id: Option<i64>,
    /// Period this category belongs to, "YYYY-MM".
    pub month: String,
    pub name: String,
    pub goal: Decimal,
    /// Sum of the category's entries. Maintained by the database layer.
    pub total: Decimal,
    pub color: String,
}

impl Category {
    pub fn new(month: String, name: String, goal: Decimal) -> Self {
        Self {
            id: None,
            month,
            name,
            goal,
            total: Decimal::ZERO,
            color: String::new(),
        }
    }

    pub fn remaining(&self) -> Decimal {
        self.goal - self.total
    }

    /// Spent / goal. Zero when no goal is set.
    pub fn progress(&self) -> Decimal {
        if self.goal > Decimal::ZERO {
            self.total / self.goal
        } else {
            Decimal::ZERO
        }
    }

    pub fn is_over_goal(&self) -> bool {
        self.goal > Decimal::ZERO && self.total > self.goal
    }

    /// Find a category by name (case-insensitive) in a slice.
    pub fn find_by_name<'a>(categories: &'a [Category], name: &str) -> Option<&'a Category> {
        let lower = name.to_lowercase();
        categories.iter().find(|c| c.name.to_lowercase() == lower)
    }

    /// Find a category by ID in a slice.
    pub fn find_by_id(categories: &[Category], id: i64) -> Option<&Category> {
        categories.iter().find(|c| c.id == Some(id))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

use anyhow::Result;
use chrono::Local;

use crate::calc::Calculator;
use crate::config::Config;
use crate::db::Database;
use crate::models::*;
use crate::receipts::{ObjectStore, ReceiptParser, ReceiptSession};
use crate::thumbnail::Quality;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Screen {
    Budget,
    Entries,
    Recurring,
    Expenses,
    Thumbnails,
    Calculator,
}

impl Screen {
    pub(crate) fn all() -> &'static [Screen] {
        &[
            Self::Budget,
            Self::Entries,
            Self::Recurring,
            Self::Expenses,
            Self::Thumbnails,
            Self::Calculator,
        ]
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Budget => write!(f, "Budget"),
            Self::Entries => write!(f, "Entries"),
            Self::Recurring => write!(f, "Recurring"),
            Self::Expenses => write!(f, "Expenses"),
            Self::Thumbnails => write!(f, "Thumbnails"),
            Self::Calculator => write!(f, "Calculator"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputMode {
    Normal,
    Command,
    Editing,
    Confirm,
}

impl std::fmt::Display for InputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "NORMAL"),
            Self::Command => write!(f, "COMMAND"),
            Self::Editing => write!(f, "EDIT"),
            Self::Confirm => write!(f, "CONFIRM"),
        }
    }
}

/// What the edit prompt is collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EditTarget {
    Expression,
    VideoUrl,
    CategoryName,
}

impl EditTarget {
    pub(crate) fn prompt(&self) -> &'static str {
        match self {
            Self::Expression => "calc> ",
            Self::VideoUrl => "url> ",
            Self::CategoryName => "rename> ",
        }
    }
}

/// Pending action that requires user confirmation.
#[derive(Debug, Clone)]
pub(crate) enum PendingAction {
    DeletePeriod { month: String },
    DeleteCategory { id: i64, name: String },
    DeleteEntry { id: i64, description: String },
    DeleteRecurring { id: i64, description: String },
    DeleteExpense { id: i64, vendor: String },
    RevokeShare { id: i64, label: String },
    RepairTotals { month: String },
}

pub(crate) struct App {
    pub(crate) running: bool,
    pub(crate) screen: Screen,
    pub(crate) input_mode: InputMode,
    pub(crate) command_input: String,
    pub(crate) status_message: String,
    pub(crate) show_help: bool,
    pub(crate) current_month: String,

    // Budget
    pub(crate) period: Option<Period>,
    pub(crate) categories: Vec<Category>,
    pub(crate) category_index: usize,
    pub(crate) category_scroll: usize,

    // Entries of the selected category
    pub(crate) entries: Vec<Entry>,
    pub(crate) entry_index: usize,
    pub(crate) entry_scroll: usize,

    // Recurring
    pub(crate) recurring: Vec<RecurringExpense>,
    pub(crate) recurring_index: usize,
    pub(crate) recurring_scroll: usize,

    // Expenses
    pub(crate) expenses: Vec<Expense>,
    pub(crate) expense_index: usize,
    pub(crate) expense_scroll: usize,
    pub(crate) expense_filter: Option<ExpenseStatus>,
    pub(crate) expense_totals: ExpenseTotals,
    pub(crate) share_links: Vec<ShareLink>,
    pub(crate) share_index: usize,
    pub(crate) expense_view_links: bool,

    // Receipt form
    pub(crate) session: ReceiptSession,
    pub(crate) draft: Option<Expense>,

    // Thumbnails
    pub(crate) video_id: Option<String>,
    pub(crate) thumbnails: Vec<(Quality, String)>,
    pub(crate) thumbnail_index: usize,

    // Calculator
    pub(crate) calculator: Calculator,
    pub(crate) calc_error: Option<String>,

    // Editing prompt
    pub(crate) edit_target: EditTarget,

    // Confirmation
    pub(crate) pending_action: Option<PendingAction>,
    pub(crate) confirm_message: String,

    pub(crate) config: Config,
    pub(crate) store: Box<dyn ObjectStore>,
    pub(crate) parser: Box<dyn ReceiptParser>,

    // Layout (updated each render frame)
    pub(crate) visible_rows: usize,
}

impl App {
    pub(crate) fn new(
        config: Config,
        store: Box<dyn ObjectStore>,
        parser: Box<dyn ReceiptParser>,
    ) -> Self {
        Self {
            running: true,
            screen: Screen::Budget,
            input_mode: InputMode::Normal,
            command_input: String::new(),
            status_message: String::new(),
            show_help: false,
            current_month: Local::now().format("%Y-%m").to_string(),

            period: None,
            categories: Vec::new(),
            category_index: 0,
            category_scroll: 0,

            entries: Vec::new(),
            entry_index: 0,
            entry_scroll: 0,

            recurring: Vec::new(),
            recurring_index: 0,
            recurring_scroll: 0,

            expenses: Vec::new(),
            expense_index: 0,
            expense_scroll: 0,
            expense_filter: None,
            expense_totals: ExpenseTotals::default(),
            share_links: Vec::new(),
            share_index: 0,
            expense_view_links: false,

            session: ReceiptSession::new(),
            draft: None,

            video_id: None,
            thumbnails: Vec::new(),
            thumbnail_index: 0,

            calculator: Calculator::new(),
            calc_error: None,

            edit_target: EditTarget::Expression,

            pending_action: None,
            confirm_message: String::new(),

            config,
            store,
            parser,

            visible_rows: 20,
        }
    }

    pub(crate) fn refresh_budget(&mut self, db: &Database) -> Result<()> {
        self.period = db.get_period(&self.current_month)?;
        self.categories = db.get_categories(&self.current_month)?;
        clamp_index(&mut self.category_index, &mut self.category_scroll, self.categories.len());
        Ok(())
    }

    pub(crate) fn refresh_entries(&mut self, db: &Database) -> Result<()> {
        self.entries = match self.selected_category().and_then(|c| c.id) {
            Some(id) => db.get_entries(id)?,
            None => Vec::new(),
        };
        clamp_index(&mut self.entry_index, &mut self.entry_scroll, self.entries.len());
        Ok(())
    }

    pub(crate) fn refresh_recurring(&mut self, db: &Database) -> Result<()> {
        self.recurring = db.get_recurring()?;
        clamp_index(&mut self.recurring_index, &mut self.recurring_scroll, self.recurring.len());
        Ok(())
    }

    pub(crate) fn refresh_expenses(&mut self, db: &Database) -> Result<()> {
        self.expenses = db.get_expenses(self.expense_filter)?;
        self.expense_totals = db.expense_totals()?;
        self.share_links = db.get_share_links()?;
        clamp_index(&mut self.expense_index, &mut self.expense_scroll, self.expenses.len());
        if self.share_index >= self.share_links.len() {
            self.share_index = self.share_links.len().saturating_sub(1);
        }
        Ok(())
    }

    pub(crate) fn refresh_all(&mut self, db: &Database) -> Result<()> {
        self.refresh_budget(db)?;
        self.refresh_entries(db)?;
        self.refresh_recurring(db)?;
        self.refresh_expenses(db)?;
        Ok(())
    }

    pub(crate) fn selected_category(&self) -> Option<&Category> {
        self.categories.get(self.category_index)
    }

    pub(crate) fn selected_entry(&self) -> Option<&Entry> {
        self.entries.get(self.entry_index)
    }

    pub(crate) fn selected_recurring(&self) -> Option<&RecurringExpense> {
        self.recurring.get(self.recurring_index)
    }

    pub(crate) fn selected_expense(&self) -> Option<&Expense> {
        self.expenses.get(self.expense_index)
    }

    pub(crate) fn selected_share_link(&self) -> Option<&ShareLink> {
        self.share_links.get(self.share_index)
    }

    /// Change screens. Leaving Expenses abandons the receipt form.
    pub(crate) fn switch_screen(&mut self, db: &Database, screen: Screen) -> Result<()> {
        if self.screen == Screen::Expenses && screen != Screen::Expenses {
            self.close_receipt_form(db);
        }
        self.screen = screen;
        match screen {
            Screen::Budget => self.refresh_budget(db)?,
            Screen::Entries => {
                self.refresh_budget(db)?;
                self.refresh_entries(db)?;
            }
            Screen::Recurring => self.refresh_recurring(db)?,
            Screen::Expenses => self.refresh_expenses(db)?,
            Screen::Thumbnails | Screen::Calculator => {}
        }
        self.set_status(format!("{screen}"));
        Ok(())
    }

    /// Drop the receipt form state. Cleanup failures are logged and left to
    /// the start-up sweep.
    pub(crate) fn close_receipt_form(&mut self, db: &Database) {
        self.session.teardown(db, self.store.as_ref());
        self.draft = None;
    }

    /// Number of list rows that fit on screen (bordered table with a header).
    pub(crate) fn page(&self) -> usize {
        self.visible_rows.saturating_sub(3).max(1)
    }

    pub(crate) fn money(&self, amount: rust_decimal::Decimal) -> String {
        super::util::format_amount(amount, &self.config.currency_symbol)
    }

    pub(crate) fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }

    pub(crate) fn confirm(&mut self, message: String, action: PendingAction) {
        self.confirm_message = message;
        self.pending_action = Some(action);
        self.input_mode = InputMode::Confirm;
    }

    pub(crate) fn start_editing(&mut self, target: EditTarget, initial: &str) {
        self.edit_target = target;
        self.command_input = initial.to_string();
        self.input_mode = InputMode::Editing;
    }
}

fn clamp_index(index: &mut usize, scroll: &mut usize, len: usize) {
    if *index >= len {
        *index = len.saturating_sub(1);
    }
    if *scroll > *index {
        *scroll = *index;
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::receipts::{FsObjectStore, TextParser};

    fn app_with_store(dir: &std::path::Path) -> App {
        App::new(
            Config::default(),
            Box::new(FsObjectStore::open(dir).unwrap()),
            Box::new(TextParser::new().unwrap()),
        )
    }

    fn upload(app: &mut App, db: &Database) -> String {
        app.session
            .upload(db, app.store.as_ref(), "lunch.txt", b"CAFE\nTOTAL 9.50\n")
            .unwrap()
            .object_key
            .clone()
    }

    #[test]
    fn test_leaving_expenses_discards_pending_receipt() {
        let db = Database::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_store(dir.path());
        app.switch_screen(&db, Screen::Expenses).unwrap();
        let key = upload(&mut app, &db);

        app.switch_screen(&db, Screen::Budget).unwrap();

        assert!(!app.store.exists(&key).unwrap());
        assert!(db.get_pending_receipts().unwrap().is_empty());
        assert!(app.session.pending().is_none());
        assert!(app.draft.is_none());
    }

    #[test]
    fn test_closing_the_form_on_quit_discards_pending_receipt() {
        let db = Database::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_store(dir.path());
        app.switch_screen(&db, Screen::Expenses).unwrap();
        let key = upload(&mut app, &db);

        app.close_receipt_form(&db);

        assert!(!app.store.exists(&key).unwrap());
        assert!(db.get_pending_receipts().unwrap().is_empty());
    }

    #[test]
    fn test_staying_on_expenses_keeps_pending_receipt() {
        let db = Database::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_store(dir.path());
        app.switch_screen(&db, Screen::Expenses).unwrap();
        let key = upload(&mut app, &db);

        app.switch_screen(&db, Screen::Expenses).unwrap();

        assert!(app.store.exists(&key).unwrap());
        assert_eq!(db.get_pending_receipts().unwrap().len(), 1);
    }
}

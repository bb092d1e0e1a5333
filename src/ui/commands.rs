use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{Local, NaiveDate, Utc};
use rust_decimal::Decimal;

use super::app::{App, EditTarget, PendingAction, Screen};
use super::util::split_leading_date;
use crate::calc::parse_amount;
use crate::db::Database;
use crate::models::{Category, Entry, EntryUpdate, Expense, ExpenseStatus, Period, RecurringExpense};
use crate::{receipts, share, thumbnail};

pub(crate) struct Command {
    pub(crate) description: &'static str,
    pub(crate) run: fn(&str, &mut App, &mut Database) -> anyhow::Result<()>,
}

macro_rules! register_command {
    ($name:expr, $desc:expr, $func:expr, $registry:expr) => {{
        $registry.insert(
            $name,
            Command {
                description: $desc,
                run: $func,
            },
        );
    }};
}

pub(crate) static COMMANDS: LazyLock<HashMap<&str, Command>> = LazyLock::new(|| {
    let mut r: HashMap<&str, Command> = HashMap::new();

    register_command!("q", "Quit theJunkyard", cmd_quit, r);
    register_command!("quit", "Quit theJunkyard", cmd_quit, r);
    register_command!("h", "Show available commands", cmd_help, r);
    register_command!("help", "Show available commands", cmd_help, r);

    register_command!("b", "Go to Budget", cmd_budget, r);
    register_command!("budget", "Go to Budget", cmd_budget, r);
    register_command!("e", "Go to Entries", cmd_entries, r);
    register_command!("entries", "Go to Entries", cmd_entries, r);
    register_command!("recurring", "Go to Recurring", cmd_recurring, r);
    register_command!("x", "Go to Expenses", cmd_expenses, r);
    register_command!("expenses", "Go to Expenses", cmd_expenses, r);
    register_command!("links", "Toggle share links on Expenses", cmd_links, r);

    register_command!("m", "Set month (e.g. :m 2024-03)", cmd_month, r);
    register_command!("month", "Set month (e.g. :month 2024-03)", cmd_month, r);
    register_command!("next-month", "Go to next month", cmd_next_month, r);
    register_command!("prev-month", "Go to previous month", cmd_prev_month, r);
    register_command!(
        "period",
        "Create a period (e.g. :period 2024-04, default: shown month)",
        cmd_period,
        r
    );
    register_command!("delete-period", "Delete the shown period", cmd_delete_period, r);

    register_command!(
        "category",
        "Add category (e.g. :category Groceries 400)",
        cmd_category,
        r
    );
    register_command!("goal", "Set goal of selected category (e.g. :goal 450)", cmd_goal, r);
    register_command!("rename", "Rename selected category", cmd_rename, r);
    register_command!("delete-category", "Delete selected category", cmd_delete_category, r);

    register_command!(
        "entry",
        "Add entry to selected category (e.g. :entry 2024-03-14 12.50 Lunch)",
        cmd_entry,
        r
    );
    register_command!("amount", "Change amount of selected entry", cmd_amount, r);
    register_command!("move", "Move selected entry (e.g. :move Dining)", cmd_move, r);
    register_command!("delete-entry", "Delete selected entry", cmd_delete_entry, r);

    register_command!(
        "add-recurring",
        "Add recurring (e.g. :add-recurring 1 1200 Rent | Monthly rent)",
        cmd_add_recurring,
        r
    );
    register_command!(
        "toggle-recurring",
        "Pause or resume selected recurring",
        cmd_toggle_recurring,
        r
    );
    register_command!(
        "delete-recurring",
        "Delete selected recurring",
        cmd_delete_recurring,
        r
    );

    register_command!(
        "expense",
        "Add expense (e.g. :expense 2024-03-14 42.10 Office Depot)",
        cmd_expense,
        r
    );
    register_command!(
        "status",
        "Set status of selected expense (pending/submitted/reimbursed)",
        cmd_status,
        r
    );
    register_command!("filter", "Filter expenses by status (empty clears)", cmd_filter, r);
    register_command!("delete-expense", "Delete selected expense", cmd_delete_expense, r);
    register_command!(
        "receipt",
        "Upload and read a receipt (e.g. :receipt ~/scan.jpg)",
        cmd_receipt,
        r
    );
    register_command!(
        "draft",
        "Edit receipt draft (vendor/amount/date/desc <value>)",
        cmd_draft,
        r
    );
    register_command!("save", "Save the receipt draft as an expense", cmd_save, r);
    register_command!("discard", "Discard the receipt in progress", cmd_discard, r);
    register_command!(
        "export",
        "Export expenses to CSV (e.g. :export ~/expenses.csv submitted)",
        cmd_export,
        r
    );
    register_command!("share", "Create share link (e.g. :share Finance team)", cmd_share, r);
    register_command!("revoke", "Revoke selected share link", cmd_revoke, r);

    register_command!("t", "Show thumbnails of a YouTube video", cmd_thumb, r);
    register_command!("thumb", "Show thumbnails of a YouTube video", cmd_thumb, r);
    register_command!("c", "Calculate (e.g. :c 19.99 * 3)", cmd_calc, r);
    register_command!("calc", "Calculate (e.g. :calc 19.99 * 3)", cmd_calc, r);

    register_command!("verify", "Check stored totals of the shown period", cmd_verify, r);
    register_command!("repair", "Recompute totals of the shown period", cmd_repair, r);
    register_command!("sweep", "Remove stale receipts and orphaned files", cmd_sweep, r);

    r
});

pub(crate) fn handle_command(input: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let trimmed = input.trim();
    let mut parts = trimmed.splitn(2, ' ');
    let cmd_name = parts.next().unwrap_or("");
    let args = parts.next().unwrap_or("").trim();

    if cmd_name.is_empty() {
        return Ok(());
    }

    if let Some(cmd) = COMMANDS.get(cmd_name) {
        tracing::debug!(command = cmd_name, "command");
        (cmd.run)(args, app, db)?;
    } else {
        let suggestion = find_closest(cmd_name);
        app.set_status(format!(
            "Unknown command: :{cmd_name}. Did you mean :{suggestion}?"
        ));
    }

    Ok(())
}

fn find_closest(input: &str) -> String {
    COMMANDS
        .keys()
        .filter(|k| k.len() > 1)
        .min_by_key(|k| levenshtein(input, k))
        .unwrap_or(&"help")
        .to_string()
}

fn levenshtein(a: &str, b: &str) -> usize {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Today when it falls inside `month`, the first of the month otherwise.
fn default_entry_date(month: &str) -> String {
    let today = Local::now().date_naive();
    let formatted = today.format("%Y-%m-%d").to_string();
    if formatted.starts_with(month) {
        formatted
    } else {
        format!("{month}-01")
    }
}

/// `[date] amount rest...`
fn parse_dated_amount(args: &str) -> Option<(Option<NaiveDate>, Decimal, String)> {
    let (date, rest) = split_leading_date(args);
    let (amount, rest) = rest.split_once(' ').unwrap_or((rest, ""));
    let amount = parse_amount(amount)?;
    Some((date, amount, rest.trim().to_string()))
}

// ── Navigation ───────────────────────────────────────────────

fn cmd_quit(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    app.running = false;
    Ok(())
}

fn cmd_help(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    app.show_help = true;
    Ok(())
}

fn cmd_budget(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    app.switch_screen(db, Screen::Budget)
}

fn cmd_entries(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    app.switch_screen(db, Screen::Entries)
}

fn cmd_recurring(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    app.switch_screen(db, Screen::Recurring)
}

fn cmd_expenses(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    app.switch_screen(db, Screen::Expenses)
}

fn cmd_links(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    if app.screen != Screen::Expenses {
        app.switch_screen(db, Screen::Expenses)?;
    }
    app.expense_view_links = !app.expense_view_links;
    app.set_status(if app.expense_view_links {
        "Showing share links"
    } else {
        "Showing expenses"
    });
    Ok(())
}

fn cmd_month(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    match Period::normalize_month(args) {
        Some(month) => set_month(app, db, month),
        None => {
            app.set_status("Usage: :month YYYY-MM");
            Ok(())
        }
    }
}

fn cmd_next_month(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    match Period::next_month(&app.current_month) {
        Some(month) => set_month(app, db, month),
        None => Ok(()),
    }
}

fn cmd_prev_month(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    match Period::previous_month(&app.current_month) {
        Some(month) => set_month(app, db, month),
        None => Ok(()),
    }
}

fn set_month(app: &mut App, db: &mut Database, month: String) -> anyhow::Result<()> {
    app.current_month = month;
    app.category_index = 0;
    app.category_scroll = 0;
    app.entry_index = 0;
    app.entry_scroll = 0;
    app.refresh_budget(db)?;
    app.refresh_entries(db)?;
    if app.period.is_some() {
        app.set_status(format!("Month: {}", app.current_month));
    } else {
        app.set_status(format!(
            "No period for {}. Create it with :period",
            app.current_month
        ));
    }
    Ok(())
}

// ── Periods and categories ───────────────────────────────────

fn cmd_period(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let month = if args.is_empty() {
        app.current_month.clone()
    } else {
        args.to_string()
    };
    match db.create_period(&month) {
        Ok(summary) => {
            let copied = match &summary.copied_from {
                Some(from) => format!("{} categories from {from}", summary.categories_copied),
                None => "no earlier period to copy".into(),
            };
            app.set_status(format!(
                "Created {}: {copied}, {} recurring entries",
                summary.month, summary.entries_materialized
            ));
            app.current_month = summary.month;
            app.category_index = 0;
            app.refresh_budget(db)?;
            app.refresh_entries(db)?;
        }
        Err(e) => app.set_status(format!("Error: {e}")),
    }
    Ok(())
}

fn cmd_delete_period(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    if app.period.is_none() {
        app.set_status(format!("No period for {}", app.current_month));
        return Ok(());
    }
    let month = app.current_month.clone();
    app.confirm(
        format!("Delete period {month} with all its categories and entries?"),
        PendingAction::DeletePeriod { month },
    );
    Ok(())
}

fn cmd_category(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    if args.is_empty() {
        app.set_status("Usage: :category <name> [goal]");
        return Ok(());
    }
    if app.period.is_none() {
        app.set_status(format!(
            "No period for {}. Create it with :period",
            app.current_month
        ));
        return Ok(());
    }

    let (name, goal) = match args.rsplit_once(' ') {
        Some((name, last)) => match parse_amount(last) {
            Some(goal) => (name.trim(), goal),
            None => (args, Decimal::ZERO),
        },
        None => (args, Decimal::ZERO),
    };

    let cat = Category::new(app.current_month.clone(), name.to_string(), goal);
    match db.insert_category(&cat) {
        Ok(_) => {
            app.refresh_budget(db)?;
            app.set_status(format!("Added category: {name}"));
        }
        Err(e) => app.set_status(format!("Error: {e}")),
    }
    Ok(())
}

fn cmd_goal(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let Some((id, name)) = app
        .selected_category()
        .and_then(|c| c.id.map(|id| (id, c.name.clone())))
    else {
        app.set_status("No category selected");
        return Ok(());
    };
    let Some(goal) = parse_amount(args) else {
        app.set_status("Usage: :goal <amount>");
        return Ok(());
    };
    db.update_category_goal(id, goal)?;
    app.refresh_budget(db)?;
    app.set_status(format!("Goal for {name}: {}", app.money(goal)));
    Ok(())
}

fn cmd_rename(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let Some((id, name)) = app
        .selected_category()
        .and_then(|c| c.id.map(|id| (id, c.name.clone())))
    else {
        app.set_status("No category selected");
        return Ok(());
    };
    if args.is_empty() {
        app.start_editing(EditTarget::CategoryName, &name);
        return Ok(());
    }
    rename_category(app, db, id, args)
}

pub(crate) fn rename_category(
    app: &mut App,
    db: &mut Database,
    id: i64,
    new_name: &str,
) -> anyhow::Result<()> {
    match db.rename_category(id, new_name) {
        Ok(()) => {
            app.refresh_budget(db)?;
            app.set_status(format!("Renamed to: {}", new_name.trim()));
        }
        Err(e) => app.set_status(format!("Error: {e}")),
    }
    Ok(())
}

fn cmd_delete_category(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    let Some((id, name)) = app
        .selected_category()
        .and_then(|c| c.id.map(|id| (id, c.name.clone())))
    else {
        app.set_status("No category selected");
        return Ok(());
    };
    app.confirm(
        format!("Delete category '{name}' and its entries?"),
        PendingAction::DeleteCategory { id, name },
    );
    Ok(())
}

// ── Entries ──────────────────────────────────────────────────

fn cmd_entry(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let Some((cat_id, cat_name)) = app
        .selected_category()
        .and_then(|c| c.id.map(|id| (id, c.name.clone())))
    else {
        app.set_status("Select a category on the Budget screen first");
        return Ok(());
    };
    let Some((date, amount, description)) = parse_dated_amount(args) else {
        app.set_status("Usage: :entry [YYYY-MM-DD] <amount> <description>");
        return Ok(());
    };
    let date = date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| default_entry_date(&app.current_month));
    if let Some(period) = &app.period {
        if !period.contains_date(&date) {
            app.set_status(format!(
                "{date} is outside {}; switch with :month first",
                period.month
            ));
            return Ok(());
        }
    }

    let entry = Entry::new(cat_id, date, description, amount);
    match db.insert_entry(&entry) {
        Ok(_) => {
            app.refresh_budget(db)?;
            app.refresh_entries(db)?;
            app.set_status(format!("{} added to {cat_name}", app.money(amount)));
        }
        Err(e) => app.set_status(format!("Error: {e}")),
    }
    Ok(())
}

fn selected_entry_id(app: &mut App) -> Option<i64> {
    if app.screen != Screen::Entries {
        app.set_status("Navigate to Entries first");
        return None;
    }
    let id = app.selected_entry().and_then(|e| e.id);
    if id.is_none() {
        app.set_status("No entry selected");
    }
    id
}

fn cmd_amount(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let Some(id) = selected_entry_id(app) else {
        return Ok(());
    };
    let Some(amount) = parse_amount(args) else {
        app.set_status("Usage: :amount <value>");
        return Ok(());
    };
    let previous = db.get_entry(id)?.map(|e| e.amount);
    let update = EntryUpdate {
        amount: Some(amount),
        ..EntryUpdate::default()
    };
    match db.update_entry(id, &update) {
        Ok(()) => {
            app.refresh_budget(db)?;
            app.refresh_entries(db)?;
            let msg = match previous {
                Some(old) => format!("Amount {} -> {}", app.money(old), app.money(amount)),
                None => format!("Amount set to {}", app.money(amount)),
            };
            app.set_status(msg);
        }
        Err(e) => app.set_status(format!("Error: {e}")),
    }
    Ok(())
}

fn cmd_move(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let Some(id) = selected_entry_id(app) else {
        return Ok(());
    };
    let Some(target) = Category::find_by_name(&app.categories, args).and_then(|c| c.id) else {
        let names: Vec<&str> = app.categories.iter().map(|c| c.name.as_str()).collect();
        app.set_status(format!(
            "Category not found. Available: {}",
            names.join(", ")
        ));
        return Ok(());
    };
    let update = EntryUpdate {
        category_id: Some(target),
        ..EntryUpdate::default()
    };
    match db.update_entry(id, &update) {
        Ok(()) => {
            app.refresh_budget(db)?;
            app.refresh_entries(db)?;
            app.set_status(format!("Moved to {}", args.trim()));
        }
        Err(e) => app.set_status(format!("Error: {e}")),
    }
    Ok(())
}

fn cmd_delete_entry(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    let Some(id) = selected_entry_id(app) else {
        return Ok(());
    };
    let description = app
        .selected_entry()
        .map(|e| e.description.clone())
        .unwrap_or_default();
    app.confirm(
        format!("Delete entry '{description}'?"),
        PendingAction::DeleteEntry { id, description },
    );
    Ok(())
}

// ── Recurring ────────────────────────────────────────────────

fn cmd_add_recurring(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    const USAGE: &str = "Usage: :add-recurring <day> <amount> <category> [| description]";
    let (head, description) = match args.split_once('|') {
        Some((head, desc)) => (head.trim(), desc.trim()),
        None => (args.trim(), ""),
    };
    let mut parts = head.splitn(3, ' ');
    let day = parts.next().and_then(|d| d.parse::<u32>().ok());
    let amount = parts.next().and_then(parse_amount);
    let category = parts.next().map(str::trim).unwrap_or("");

    let (Some(day), Some(amount)) = (day, amount) else {
        app.set_status(USAGE);
        return Ok(());
    };
    if !(1..=31).contains(&day) || category.is_empty() {
        app.set_status(USAGE);
        return Ok(());
    }
    let description = if description.is_empty() {
        category
    } else {
        description
    };

    let rec = RecurringExpense::new(description.to_string(), amount, category.to_string(), day);
    match db.insert_recurring(&rec) {
        Ok(_) => {
            app.refresh_recurring(db)?;
            app.set_status(format!(
                "Recurring '{description}' on day {day}, starting with the next new period"
            ));
        }
        Err(e) => app.set_status(format!("Error: {e}")),
    }
    Ok(())
}

fn cmd_toggle_recurring(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let Some((id, active, description)) = app
        .selected_recurring()
        .and_then(|r| r.id.map(|id| (id, r.active, r.description.clone())))
    else {
        app.set_status("No recurring expense selected");
        return Ok(());
    };
    db.set_recurring_active(id, !active)?;
    app.refresh_recurring(db)?;
    app.set_status(format!(
        "{description} {}",
        if active { "paused" } else { "resumed" }
    ));
    Ok(())
}

fn cmd_delete_recurring(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    let Some((id, description)) = app
        .selected_recurring()
        .and_then(|r| r.id.map(|id| (id, r.description.clone())))
    else {
        app.set_status("No recurring expense selected");
        return Ok(());
    };
    app.confirm(
        format!("Delete recurring '{description}'? Past entries are kept."),
        PendingAction::DeleteRecurring { id, description },
    );
    Ok(())
}

// ── Expenses ─────────────────────────────────────────────────

fn cmd_expense(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let parsed = parse_dated_amount(args).filter(|(_, _, vendor)| !vendor.is_empty());
    let Some((date, amount, vendor)) = parsed else {
        app.set_status("Usage: :expense [YYYY-MM-DD] <amount> <vendor>");
        return Ok(());
    };
    let date = date
        .unwrap_or_else(|| Local::now().date_naive())
        .format("%Y-%m-%d")
        .to_string();
    let expense = Expense::new(date, vendor.clone(), String::new(), amount);
    db.insert_expense(&expense)?;
    app.refresh_expenses(db)?;
    app.set_status(format!("Expense added: {vendor} {}", app.money(amount)));
    Ok(())
}

fn selected_expense_id(app: &mut App) -> Option<i64> {
    if app.screen != Screen::Expenses || app.expense_view_links {
        app.set_status("Navigate to Expenses first");
        return None;
    }
    let id = app.selected_expense().and_then(|e| e.id);
    if id.is_none() {
        app.set_status("No expense selected");
    }
    id
}

fn cmd_status(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let Some(id) = selected_expense_id(app) else {
        return Ok(());
    };
    let Some(status) = ExpenseStatus::parse(args) else {
        app.set_status("Usage: :status pending|submitted|reimbursed");
        return Ok(());
    };
    db.update_expense_status(id, status)?;
    app.refresh_expenses(db)?;
    app.set_status(format!("Marked {status}"));
    Ok(())
}

fn cmd_filter(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    if args.is_empty() {
        app.expense_filter = None;
    } else {
        match ExpenseStatus::parse(args) {
            Some(status) => app.expense_filter = Some(status),
            None => {
                app.set_status("Usage: :filter [pending|submitted|reimbursed]");
                return Ok(());
            }
        }
    }
    app.expense_index = 0;
    app.expense_scroll = 0;
    app.expense_view_links = false;
    if app.screen != Screen::Expenses {
        app.switch_screen(db, Screen::Expenses)?;
    } else {
        app.refresh_expenses(db)?;
    }
    app.set_status(match app.expense_filter {
        Some(status) => format!("Showing {status} expenses"),
        None => "Showing all expenses".into(),
    });
    Ok(())
}

fn cmd_delete_expense(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    let Some(id) = selected_expense_id(app) else {
        return Ok(());
    };
    let vendor = app
        .selected_expense()
        .map(|e| e.vendor.clone())
        .unwrap_or_default();
    app.confirm(
        format!("Delete expense '{vendor}' and its receipt?"),
        PendingAction::DeleteExpense { id, vendor },
    );
    Ok(())
}

fn cmd_receipt(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    if args.is_empty() {
        app.set_status("Usage: :receipt <file>");
        return Ok(());
    }
    let path = crate::run::shellexpand(args);
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            app.set_status(format!("Cannot read {path}: {e}"));
            return Ok(());
        }
    };
    let file_name = Path::new(&path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path.as_str())
        .to_string();

    if app.screen != Screen::Expenses {
        app.switch_screen(db, Screen::Expenses)?;
    }
    app.expense_view_links = false;

    if let Err(e) = app
        .session
        .upload(db, app.store.as_ref(), &file_name, &bytes)
    {
        app.set_status(format!("Upload failed: {e}"));
        return Ok(());
    }

    let draft = match app
        .session
        .parse(db, app.store.as_ref(), app.parser.as_ref())
    {
        Ok(parsed) => parsed.to_draft(Local::now().date_naive()),
        Err(e) => {
            app.draft = None;
            app.set_status(format!("Could not read receipt: {e}"));
            return Ok(());
        }
    };
    let summary = format!(
        "Read {}: {} {}. :draft to adjust, :save to keep, :discard to drop",
        file_name,
        if draft.vendor.is_empty() {
            "(no vendor)"
        } else {
            draft.vendor.as_str()
        },
        app.money(draft.amount)
    );
    app.draft = Some(draft);
    app.set_status(summary);
    Ok(())
}

fn cmd_draft(args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    let (field, value) = args.split_once(' ').unwrap_or((args, ""));
    let value = value.trim();
    let Some(draft) = app.draft.as_mut() else {
        app.set_status("No draft. Start one with :receipt <file>");
        return Ok(());
    };
    match field {
        "vendor" => draft.vendor = value.to_string(),
        "desc" | "description" => draft.description = value.to_string(),
        "amount" => match parse_amount(value) {
            Some(amount) => draft.amount = amount,
            None => {
                app.set_status(format!("Invalid amount: {value}"));
                return Ok(());
            }
        },
        "date" => match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            Ok(date) => draft.date = date.format("%Y-%m-%d").to_string(),
            Err(_) => {
                app.set_status(format!("Invalid date: {value} (expected YYYY-MM-DD)"));
                return Ok(());
            }
        },
        _ => {
            app.set_status("Usage: :draft vendor|amount|date|desc <value>");
            return Ok(());
        }
    }
    app.set_status(format!("Draft {field} updated"));
    Ok(())
}

fn cmd_save(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let Some(draft) = app.draft.clone() else {
        app.set_status("No draft to save");
        return Ok(());
    };
    if draft.vendor.trim().is_empty() {
        app.set_status("Draft needs a vendor: :draft vendor <name>");
        return Ok(());
    }
    match app.session.commit(db, &draft) {
        Ok(id) => {
            app.draft = None;
            app.refresh_expenses(db)?;
            if let Some(pos) = app.expenses.iter().position(|e| e.id == Some(id)) {
                app.expense_index = pos;
            }
            app.set_status(format!("Saved expense: {} {}", draft.vendor, app.money(draft.amount)));
        }
        Err(e) => app.set_status(format!("Save failed, draft kept: {e}")),
    }
    Ok(())
}

fn cmd_discard(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    app.draft = None;
    match app.session.cancel(db, app.store.as_ref()) {
        Ok(()) => app.set_status("Receipt discarded"),
        Err(e) => app.set_status(format!("Receipt left for the next sweep: {e}")),
    }
    Ok(())
}

fn cmd_export(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let mut parts = args.split_whitespace();
    let path = parts
        .next()
        .map(crate::run::shellexpand)
        .unwrap_or_else(|| crate::run::shellexpand("~/junkyard-expenses.csv"));
    let status = match parts.next() {
        Some(s) => match ExpenseStatus::parse(s) {
            Some(status) => Some(status),
            None => {
                app.set_status(format!("Unknown status: {s}"));
                return Ok(());
            }
        },
        None => app.expense_filter,
    };

    let count = db.export_expenses_to_csv(&path, status)?;
    if count == 0 {
        app.set_status("No expenses to export");
    } else {
        app.set_status(format!("Exported {count} expenses to {path}"));
    }
    Ok(())
}

fn cmd_share(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let label = if args.is_empty() { "Expenses" } else { args };
    let link = share::create(db, label, app.config.share_ttl())?;
    app.refresh_expenses(db)?;
    app.expense_view_links = true;
    if app.screen != Screen::Expenses {
        app.switch_screen(db, Screen::Expenses)?;
    }
    app.set_status(format!(
        "Share token: {} (expires {})",
        link.token,
        link.expires_at.as_deref().map_or("never", |t| t.get(..10).unwrap_or(t))
    ));
    Ok(())
}

fn cmd_revoke(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    if app.screen != Screen::Expenses || !app.expense_view_links {
        app.set_status("Show share links first with :links");
        return Ok(());
    }
    let Some((id, label)) = app
        .selected_share_link()
        .and_then(|l| l.id.map(|id| (id, l.label.clone())))
    else {
        app.set_status("No share link selected");
        return Ok(());
    };
    app.confirm(
        format!("Revoke share link '{label}'?"),
        PendingAction::RevokeShare { id, label },
    );
    Ok(())
}

// ── Tools ────────────────────────────────────────────────────

fn cmd_thumb(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    if app.screen != Screen::Thumbnails {
        app.switch_screen(db, Screen::Thumbnails)?;
    }
    if args.is_empty() {
        app.start_editing(EditTarget::VideoUrl, "");
        return Ok(());
    }
    show_thumbnails(app, args);
    Ok(())
}

pub(crate) fn show_thumbnails(app: &mut App, input: &str) {
    match thumbnail::extract_video_id(input) {
        Ok(id) => {
            app.thumbnails = thumbnail::all_thumbnails(&id);
            app.thumbnail_index = app.thumbnails.len().saturating_sub(1);
            app.set_status(format!("Video {id}"));
            app.video_id = Some(id);
        }
        Err(e) => app.set_status(format!("Error: {e}")),
    }
}

fn cmd_calc(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    if app.screen != Screen::Calculator {
        app.switch_screen(db, Screen::Calculator)?;
    }
    if args.is_empty() {
        app.start_editing(EditTarget::Expression, "");
        return Ok(());
    }
    evaluate_expression(app, args);
    Ok(())
}

pub(crate) fn evaluate_expression(app: &mut App, input: &str) {
    match app.calculator.eval(input) {
        Ok(value) => {
            app.calc_error = None;
            app.set_status(format!("= {value}"));
        }
        Err(e) => {
            app.calc_error = Some(e.to_string());
            app.set_status(format!("Error: {e}"));
        }
    }
}

fn cmd_verify(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    match db.verify_totals(&app.current_month) {
        Ok(drifts) if drifts.is_empty() => {
            app.set_status(format!("Totals for {} are consistent", app.current_month));
        }
        Ok(drifts) => {
            let names: Vec<String> = drifts
                .iter()
                .map(|d| d.category.clone().unwrap_or_else(|| "period total".into()))
                .collect();
            tracing::warn!(month = %app.current_month, drifted = drifts.len(), "totals drift found");
            app.set_status(format!(
                "{} totals drifted ({}). Run :repair",
                drifts.len(),
                names.join(", ")
            ));
        }
        Err(e) => app.set_status(format!("Error: {e}")),
    }
    Ok(())
}

fn cmd_repair(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    if app.period.is_none() {
        app.set_status(format!("No period for {}", app.current_month));
        return Ok(());
    }
    let month = app.current_month.clone();
    app.confirm(
        format!("Recompute all totals of {month} from its entries?"),
        PendingAction::RepairTotals { month },
    );
    Ok(())
}

fn cmd_sweep(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    match receipts::sweep(db, app.store.as_ref(), app.config.pending_max_age(), Utc::now()) {
        Ok(report) if report.is_clean() => app.set_status("Nothing to sweep"),
        Ok(report) => app.set_status(format!(
            "Swept {} stale receipts, {} orphaned files, {} failures",
            report.stale_records, report.orphan_objects, report.failures
        )),
        Err(e) => app.set_status(format!("Sweep failed: {e}")),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("expense", "expense"), 0);
        assert_eq!(levenshtein("expnse", "expense"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn test_find_closest_skips_single_letter_aliases() {
        assert_eq!(find_closest("recipt"), "receipt");
        assert_eq!(find_closest("verfy"), "verify");
        assert!(find_closest("x").len() > 1);
    }

    #[test]
    fn test_every_command_has_description() {
        assert!(COMMANDS.values().all(|c| !c.description.is_empty()));
        for name in ["period", "entry", "receipt", "save", "discard", "share", "thumb", "calc", "sweep"] {
            assert!(COMMANDS.contains_key(name), "missing :{name}");
        }
    }

    #[test]
    fn test_parse_dated_amount() {
        let (date, amount, rest) = parse_dated_amount("2024-03-14 12.50 Team lunch").unwrap();
        assert_eq!(date.unwrap().to_string(), "2024-03-14");
        assert_eq!(amount, dec!(12.50));
        assert_eq!(rest, "Team lunch");

        let (date, amount, rest) = parse_dated_amount("8").unwrap();
        assert!(date.is_none());
        assert_eq!(amount, dec!(8));
        assert_eq!(rest, "");

        assert!(parse_dated_amount("2024-03-14 coffee").is_none());
    }

    #[test]
    fn test_default_entry_date() {
        assert_eq!(default_entry_date("1999-07"), "1999-07-01");
        let this_month = Local::now().format("%Y-%m").to_string();
        assert!(default_entry_date(&this_month).starts_with(&this_month));
        assert_eq!(default_entry_date(&this_month).len(), 10);
    }
}

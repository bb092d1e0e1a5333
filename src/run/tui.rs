use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;

use super::Services;
use crate::db::Database;
use crate::models::ExpenseStatus;
use crate::ui::app::{App, EditTarget, InputMode, PendingAction, Screen};
use crate::ui::commands;
use crate::ui::util::{move_cursor, Motion};

pub(crate) fn as_tui(db: &mut Database, services: Services) -> Result<()> {
    let mut app = App::new(services.config, services.store, services.parser);
    app.refresh_all(db)?;
    if app.period.is_none() {
        app.set_status(format!(
            "No period for {}. Create it with :period",
            app.current_month
        ));
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, db);

    app.close_receipt_form(db);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(ref e) = result {
        tracing::error!(error = %e, "tui exited with error");
        eprintln!("Error: {e:?}");
    }

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    db: &mut Database,
) -> Result<()> {
    while app.running {
        terminal.draw(|f| {
            // tab, status and command bars
            let content_height = f.area().height.saturating_sub(3) as usize;
            app.visible_rows = content_height.max(1);
            crate::ui::render::render(f, app);
        })?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if app.show_help {
                app.show_help = false;
                continue;
            }
            match app.input_mode {
                InputMode::Normal => handle_normal_input(key, app, db)?,
                InputMode::Command => handle_command_input(key, app, db)?,
                InputMode::Editing => handle_editing_input(key, app, db)?,
                InputMode::Confirm => handle_confirm_input(key, app, db)?,
            }
        }
    }
    Ok(())
}

// ── Input handlers ───────────────────────────────────────────

fn handle_normal_input(key: event::KeyEvent, app: &mut App, db: &mut Database) -> Result<()> {
    match key.code {
        KeyCode::Char(':') => {
            app.input_mode = InputMode::Command;
            app.command_input.clear();
        }
        KeyCode::Char('q') | KeyCode::Char('c')
            if key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            app.running = false;
        }
        KeyCode::Char('j') | KeyCode::Down => move_selection(app, Motion::Down(1)),
        KeyCode::Char('k') | KeyCode::Up => move_selection(app, Motion::Up(1)),
        KeyCode::Char(c @ '1'..='6') => {
            let idx = (c as usize) - ('1' as usize);
            if let Some(&screen) = Screen::all().get(idx) {
                app.switch_screen(db, screen)?;
            }
        }
        KeyCode::Tab => {
            let screens = Screen::all();
            let idx = screens.iter().position(|s| *s == app.screen).unwrap_or(0);
            app.switch_screen(db, screens[(idx + 1) % screens.len()])?;
        }
        KeyCode::BackTab => {
            let screens = Screen::all();
            let idx = screens.iter().position(|s| *s == app.screen).unwrap_or(0);
            let prev = if idx == 0 { screens.len() - 1 } else { idx - 1 };
            app.switch_screen(db, screens[prev])?;
        }
        KeyCode::Enter => handle_enter(app, db)?,
        KeyCode::Esc => handle_escape(app, db)?,
        KeyCode::Char('g') => move_selection(app, Motion::Top),
        KeyCode::Char('G') => move_selection(app, Motion::Bottom),
        KeyCode::Char('?') => {
            app.show_help = true;
        }
        KeyCode::Char('H') => commands::handle_command("prev-month", app, db)?,
        KeyCode::Char('L') => commands::handle_command("next-month", app, db)?,
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            move_selection(app, Motion::Down(app.visible_rows / 2));
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            move_selection(app, Motion::Up(app.visible_rows / 2));
        }
        KeyCode::Char('D') => {
            let command = match app.screen {
                Screen::Budget => "delete-category",
                Screen::Entries => "delete-entry",
                Screen::Recurring => "delete-recurring",
                Screen::Expenses if app.expense_view_links => "revoke",
                Screen::Expenses => "delete-expense",
                Screen::Thumbnails | Screen::Calculator => return Ok(()),
            };
            commands::handle_command(command, app, db)?;
        }
        KeyCode::Char(' ') if app.screen == Screen::Recurring => {
            commands::handle_command("toggle-recurring", app, db)?;
        }
        KeyCode::Char('r') if app.screen == Screen::Expenses => {
            commands::handle_command("links", app, db)?;
        }
        KeyCode::Char('s') if app.screen == Screen::Expenses && !app.expense_view_links => {
            if let Some(status) = app.selected_expense().map(|e| next_status(e.status)) {
                commands::handle_command(&format!("status {status}"), app, db)?;
            }
        }
        KeyCode::Char('c') if app.screen == Screen::Calculator => {
            app.calculator.clear();
            app.calc_error = None;
            app.set_status("History cleared");
        }
        _ => {}
    }
    Ok(())
}

fn next_status(status: ExpenseStatus) -> ExpenseStatus {
    match status {
        ExpenseStatus::Pending => ExpenseStatus::Submitted,
        ExpenseStatus::Submitted => ExpenseStatus::Reimbursed,
        ExpenseStatus::Reimbursed => ExpenseStatus::Pending,
    }
}

/// What a key did to a one-line input buffer.
enum LineEdit {
    Submit(String),
    Abort,
    Changed,
}

/// Readline-ish editing shared by the command bar and the edit prompts.
fn edit_line(buf: &mut String, key: event::KeyEvent) -> LineEdit {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter => return LineEdit::Submit(std::mem::take(buf)),
        KeyCode::Esc => {
            buf.clear();
            return LineEdit::Abort;
        }
        KeyCode::Backspace => {
            buf.pop();
        }
        KeyCode::Char('u') if ctrl => buf.clear(),
        KeyCode::Char('w') if ctrl => {
            let keep = buf.trim_end().rfind(' ').map_or(0, |pos| pos + 1);
            buf.truncate(keep);
        }
        KeyCode::Char(c) if !ctrl => buf.push(c),
        _ => {}
    }
    LineEdit::Changed
}

fn handle_command_input(key: event::KeyEvent, app: &mut App, db: &mut Database) -> Result<()> {
    match edit_line(&mut app.command_input, key) {
        LineEdit::Submit(input) => {
            app.input_mode = InputMode::Normal;
            commands::handle_command(&input, app, db)?;
        }
        LineEdit::Abort => app.input_mode = InputMode::Normal,
        // an emptied command bar drops back to normal mode
        LineEdit::Changed if app.command_input.is_empty() => app.input_mode = InputMode::Normal,
        LineEdit::Changed => {}
    }
    Ok(())
}

fn handle_editing_input(key: event::KeyEvent, app: &mut App, db: &mut Database) -> Result<()> {
    let input = match edit_line(&mut app.command_input, key) {
        LineEdit::Submit(input) => input,
        LineEdit::Abort => {
            app.input_mode = InputMode::Normal;
            return Ok(());
        }
        LineEdit::Changed => return Ok(()),
    };
    let input = input.trim();
    match app.edit_target {
        EditTarget::Expression => {
            if !input.is_empty() {
                commands::evaluate_expression(app, input);
            }
            // stay in the prompt for the next expression
            return Ok(());
        }
        EditTarget::VideoUrl if !input.is_empty() => commands::show_thumbnails(app, input),
        EditTarget::CategoryName if !input.is_empty() => {
            if let Some(id) = app.selected_category().and_then(|c| c.id) {
                commands::rename_category(app, db, id, input)?;
            }
        }
        EditTarget::VideoUrl | EditTarget::CategoryName => {}
    }
    app.input_mode = InputMode::Normal;
    Ok(())
}

fn handle_confirm_input(key: event::KeyEvent, app: &mut App, db: &mut Database) -> Result<()> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            if let Some(action) = app.pending_action.take() {
                run_pending_action(action, app, db)?;
            }
        }
        _ => {
            app.pending_action = None;
            app.set_status("Cancelled");
        }
    }
    app.confirm_message.clear();
    app.input_mode = InputMode::Normal;
    Ok(())
}

fn run_pending_action(action: PendingAction, app: &mut App, db: &mut Database) -> Result<()> {
    match action {
        PendingAction::DeletePeriod { month } => {
            db.delete_period(&month)?;
            app.refresh_budget(db)?;
            app.refresh_entries(db)?;
            app.set_status(format!("Deleted period {month}"));
        }
        PendingAction::DeleteCategory { id, name } => {
            db.delete_category(id)?;
            app.refresh_budget(db)?;
            app.refresh_entries(db)?;
            app.set_status(format!("Deleted category: {name}"));
        }
        PendingAction::DeleteEntry { id, description } => {
            db.delete_entry(id)?;
            app.refresh_budget(db)?;
            app.refresh_entries(db)?;
            app.set_status(format!("Deleted entry: {description}"));
        }
        PendingAction::DeleteRecurring { id, description } => {
            db.delete_recurring(id)?;
            app.refresh_recurring(db)?;
            app.set_status(format!("Deleted recurring: {description}"));
        }
        PendingAction::DeleteExpense { id, vendor } => {
            if let Some(key) = db.delete_expense(id)? {
                // an undeleted artifact becomes an orphan for the next sweep
                if let Err(e) = app.store.delete(&key) {
                    tracing::warn!(%key, error = %e, "receipt of deleted expense left behind");
                }
            }
            app.refresh_expenses(db)?;
            app.set_status(format!("Deleted expense: {vendor}"));
        }
        PendingAction::RevokeShare { id, label } => {
            db.revoke_share_link(id)?;
            app.refresh_expenses(db)?;
            app.set_status(format!("Revoked share link: {label}"));
        }
        PendingAction::RepairTotals { month } => {
            let repaired = db.repair_totals(&month)?;
            app.refresh_budget(db)?;
            app.refresh_entries(db)?;
            app.set_status(if repaired == 0 {
                format!("Totals for {month} were already consistent")
            } else {
                format!("Repaired {repaired} totals in {month}")
            });
        }
    }
    Ok(())
}

fn handle_enter(app: &mut App, db: &mut Database) -> Result<()> {
    match app.screen {
        Screen::Budget => {
            if app.selected_category().is_some() {
                app.entry_index = 0;
                app.entry_scroll = 0;
                app.switch_screen(db, Screen::Entries)?;
            }
        }
        Screen::Thumbnails => app.start_editing(EditTarget::VideoUrl, ""),
        Screen::Calculator => app.start_editing(EditTarget::Expression, ""),
        Screen::Entries | Screen::Recurring | Screen::Expenses => {}
    }
    Ok(())
}

fn handle_escape(app: &mut App, db: &mut Database) -> Result<()> {
    match app.screen {
        Screen::Entries => app.switch_screen(db, Screen::Budget)?,
        Screen::Expenses if app.expense_view_links => {
            app.expense_view_links = false;
        }
        _ => app.status_message.clear(),
    }
    Ok(())
}

fn move_selection(app: &mut App, motion: Motion) {
    let page = app.page();
    // share links and thumbnails always fit on screen
    let mut no_scroll = 0;
    let (index, scroll, len) = match app.screen {
        Screen::Budget => (&mut app.category_index, &mut app.category_scroll, app.categories.len()),
        Screen::Entries => (&mut app.entry_index, &mut app.entry_scroll, app.entries.len()),
        Screen::Recurring => (
            &mut app.recurring_index,
            &mut app.recurring_scroll,
            app.recurring.len(),
        ),
        Screen::Expenses if app.expense_view_links => {
            (&mut app.share_index, &mut no_scroll, app.share_links.len())
        }
        Screen::Expenses => (&mut app.expense_index, &mut app.expense_scroll, app.expenses.len()),
        Screen::Thumbnails => (&mut app.thumbnail_index, &mut no_scroll, app.thumbnails.len()),
        Screen::Calculator => return,
    };
    move_cursor(index, scroll, len, page, motion);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent;

    fn press(buf: &mut String, code: KeyCode, modifiers: KeyModifiers) -> LineEdit {
        edit_line(buf, KeyEvent::new(code, modifiers))
    }

    #[test]
    fn test_edit_line_typing_and_submit() {
        let mut buf = String::new();
        for c in "goal 250".chars() {
            press(&mut buf, KeyCode::Char(c), KeyModifiers::NONE);
        }
        press(&mut buf, KeyCode::Backspace, KeyModifiers::NONE);
        assert_eq!(buf, "goal 25");
        assert!(matches!(
            press(&mut buf, KeyCode::Enter, KeyModifiers::NONE),
            LineEdit::Submit(line) if line == "goal 25"
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_edit_line_word_and_line_kill() {
        let mut buf = String::from("entry 12.50 lunch ");
        press(&mut buf, KeyCode::Char('w'), KeyModifiers::CONTROL);
        assert_eq!(buf, "entry 12.50 ");
        press(&mut buf, KeyCode::Char('w'), KeyModifiers::CONTROL);
        assert_eq!(buf, "entry ");
        press(&mut buf, KeyCode::Char('u'), KeyModifiers::CONTROL);
        assert!(buf.is_empty());
        assert!(matches!(
            press(&mut buf, KeyCode::Esc, KeyModifiers::NONE),
            LineEdit::Abort
        ));
    }

    #[test]
    fn test_status_cycle() {
        assert_eq!(next_status(ExpenseStatus::Pending), ExpenseStatus::Submitted);
        assert_eq!(next_status(ExpenseStatus::Submitted), ExpenseStatus::Reimbursed);
        assert_eq!(next_status(ExpenseStatus::Reimbursed), ExpenseStatus::Pending);
    }
}

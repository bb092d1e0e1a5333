use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::models::Expense;
use crate::ui::app::App;
use crate::ui::theme;
use crate::ui::util::truncate;

pub(crate) fn render(f: &mut Frame, area: Rect, app: &App) {
    let draft_height = if app.draft.is_some() { 7 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(draft_height),
            Constraint::Min(3),
        ])
        .split(area);

    render_totals(f, chunks[0], app);
    if let Some(draft) = &app.draft {
        render_draft(f, chunks[1], app, draft);
    }
    if app.expense_view_links {
        render_links(f, chunks[2], app);
    } else {
        render_expenses(f, chunks[2], app);
    }
}

fn render_totals(f: &mut Frame, area: Rect, app: &App) {
    let t = &app.expense_totals;
    let line = Line::from(vec![
        Span::styled(" Pending ", theme::dim_style()),
        Span::styled(app.money(t.pending), Style::default().fg(theme::PEACH)),
        Span::styled("   Submitted ", theme::dim_style()),
        Span::styled(app.money(t.submitted), Style::default().fg(theme::ACCENT)),
        Span::styled("   Reimbursed ", theme::dim_style()),
        Span::styled(app.money(t.reimbursed), Style::default().fg(theme::GREEN)),
        Span::styled("   Outstanding ", theme::dim_style()),
        Span::styled(
            app.money(t.outstanding()),
            Style::default().fg(theme::TEXT).add_modifier(Modifier::BOLD),
        ),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::OVERLAY))
        .title(Span::styled(" Reimbursements ", theme::title_style()));
    f.render_widget(Paragraph::new(line).block(block), area);
}

fn render_draft(f: &mut Frame, area: Rect, app: &App, draft: &Expense) {
    let file = app
        .session
        .pending()
        .map(|p| p.file_name.as_str())
        .unwrap_or("(no receipt)");
    let field = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(format!(" {label:<8}"), theme::dim_style()),
            Span::styled(value, theme::normal_style()),
        ])
    };
    let items = match draft.items_total() {
        None => "none".to_string(),
        Some(sum) => {
            let listed = draft
                .line_items
                .iter()
                .map(|i| format!("{} {}", i.description, app.money(i.amount)))
                .collect::<Vec<_>>()
                .join(", ");
            // tax and tip usually live outside the items
            if sum == draft.amount {
                listed
            } else {
                format!("{listed} (items {})", app.money(sum))
            }
        }
    };
    let lines = vec![
        field("Vendor", draft.vendor.clone()),
        field("Date", draft.date.clone()),
        field("Amount", app.money(draft.amount)),
        field("Note", draft.description.clone()),
        field("Items", truncate(&items, area.width.saturating_sub(12) as usize)),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::YELLOW))
        .title(Span::styled(
            format!(" Draft from {file} · :save / :discard "),
            theme::section_style(),
        ));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_expenses(f: &mut Frame, area: Rect, app: &App) {
    let filter = app
        .expense_filter
        .map(|s| format!(" · {s}"))
        .unwrap_or_default();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::OVERLAY))
        .title(Span::styled(
            format!(" Expenses ({}){filter} ", app.expenses.len()),
            theme::title_style(),
        ));

    if app.expenses.is_empty() {
        let msg = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("No expenses", theme::dim_style())),
            Line::from(""),
            Line::from(Span::styled(
                "Use :receipt <file> or :expense <amount> <vendor>",
                theme::dim_style(),
            )),
        ])
        .centered()
        .block(block);
        f.render_widget(msg, area);
        return;
    }

    let header = Row::new(
        ["Date", "Vendor", "Description", "Amount", "Status", ""]
            .iter()
            .map(|h| Cell::from(*h).style(theme::header_style())),
    );

    let rows: Vec<Row> = app
        .expenses
        .iter()
        .enumerate()
        .skip(app.expense_scroll)
        .take(area.height.saturating_sub(3) as usize)
        .map(|(i, e)| {
            let style = if i == app.expense_index {
                theme::selected_style()
            } else if i % 2 == 1 {
                theme::alt_row_style()
            } else {
                theme::normal_style()
            };
            Row::new(vec![
                Cell::from(e.date.clone()),
                Cell::from(truncate(&e.vendor, 24)),
                Cell::from(truncate(&e.description, 30)),
                Cell::from(app.money(e.amount)),
                Cell::from(Span::styled(
                    e.status.as_str(),
                    Style::default().fg(theme::status_color(e.status)),
                )),
                Cell::from(if e.has_receipt() { "📎" } else { "" }),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(12),
        Constraint::Length(26),
        Constraint::Min(16),
        Constraint::Length(14),
        Constraint::Length(12),
        Constraint::Length(3),
    ];
    f.render_widget(Table::new(rows, widths).header(header).block(block), area);
}

fn render_links(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::OVERLAY))
        .title(Span::styled(
            format!(" Share links ({}) ", app.share_links.len()),
            theme::title_style(),
        ));

    if app.share_links.is_empty() {
        let msg = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("No share links", theme::dim_style())),
            Line::from(""),
            Line::from(Span::styled("Use :share <label> to create one", theme::dim_style())),
        ])
        .centered()
        .block(block);
        f.render_widget(msg, area);
        return;
    }

    let now = chrono::Utc::now();
    let header = Row::new(
        ["Label", "Token", "Expires", "State"]
            .iter()
            .map(|h| Cell::from(*h).style(theme::header_style())),
    );
    let rows: Vec<Row> = app
        .share_links
        .iter()
        .enumerate()
        .take(area.height.saturating_sub(3) as usize)
        .map(|(i, link)| {
            let state = if link.is_usable(now) {
                Span::styled("active", theme::refund_style())
            } else if link.revoked {
                Span::styled("revoked", theme::error_style())
            } else {
                Span::styled("expired", theme::dim_style())
            };
            let style = if i == app.share_index {
                theme::selected_style()
            } else {
                theme::normal_style()
            };
            let expires = link
                .expires_at
                .as_deref()
                .map_or("never", |t| t.get(..10).unwrap_or(t))
                .to_string();
            Row::new(vec![
                Cell::from(truncate(&link.label, 24)),
                Cell::from(link.token.clone()),
                Cell::from(expires),
                Cell::from(state),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Min(16),
        Constraint::Length(34),
        Constraint::Length(12),
        Constraint::Length(9),
    ];
    f.render_widget(Table::new(rows, widths).header(header).block(block), area);
}

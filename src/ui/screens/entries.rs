use ratatui::{
    layout::{Constraint, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::ui::app::App;
use crate::ui::theme;
use crate::ui::util::truncate;

pub(crate) fn render(f: &mut Frame, area: Rect, app: &App) {
    let Some(category) = app.selected_category() else {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::OVERLAY))
            .title(Span::styled(" Entries ", theme::title_style()));
        let msg = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "Pick a category on the Budget screen first",
                theme::dim_style(),
            )),
        ])
        .centered()
        .block(block);
        f.render_widget(msg, area);
        return;
    };

    let title = format!(
        " {} · {} of {} · {} entries ",
        category.name,
        app.money(category.total),
        app.money(category.goal),
        app.entries.len()
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::OVERLAY))
        .title(Span::styled(title, theme::title_style()));

    if app.entries.is_empty() {
        let msg = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("No entries yet", theme::dim_style())),
            Line::from(""),
            Line::from(Span::styled(
                "Use :entry [YYYY-MM-DD] <amount> <description>",
                theme::dim_style(),
            )),
        ])
        .centered()
        .block(block);
        f.render_widget(msg, area);
        return;
    }

    let header = Row::new(
        ["Date", "Description", "Amount", ""]
            .iter()
            .map(|h| Cell::from(*h).style(theme::header_style())),
    )
    .height(1);

    let rows: Vec<Row> = app
        .entries
        .iter()
        .enumerate()
        .skip(app.entry_scroll)
        .take(area.height.saturating_sub(3) as usize)
        .map(|(i, entry)| {
            let style = if i == app.entry_index {
                theme::selected_style()
            } else if i % 2 == 1 {
                theme::alt_row_style()
            } else {
                theme::normal_style()
            };
            let amount_style = if entry.is_refund() {
                theme::refund_style()
            } else {
                theme::spend_style()
            };
            Row::new(vec![
                Cell::from(entry.date.clone()),
                Cell::from(truncate(&entry.description, 40)),
                Cell::from(Span::styled(app.money(entry.amount), amount_style)),
                Cell::from(if entry.is_recurring() { "↻" } else { "" }),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(12),
        Constraint::Min(20),
        Constraint::Length(14),
        Constraint::Length(2),
    ];
    f.render_widget(Table::new(rows, widths).header(header).block(block), area);
}

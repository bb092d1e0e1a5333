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
    let active = app.recurring.iter().filter(|r| r.active).count();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::OVERLAY))
        .title(Span::styled(
            format!(" Recurring ({active} active) "),
            theme::title_style(),
        ));

    if app.recurring.is_empty() {
        let msg = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("No recurring expenses", theme::dim_style())),
            Line::from(""),
            Line::from(Span::styled(
                "Use :add-recurring <day> <amount> <category> [| description]",
                theme::dim_style(),
            )),
        ])
        .centered()
        .block(block);
        f.render_widget(msg, area);
        return;
    }

    let header = Row::new(
        ["Day", "Description", "Category", "Amount", "State"]
            .iter()
            .map(|h| Cell::from(*h).style(theme::header_style())),
    );

    let rows: Vec<Row> = app
        .recurring
        .iter()
        .enumerate()
        .skip(app.recurring_scroll)
        .take(area.height.saturating_sub(3) as usize)
        .map(|(i, rec)| {
            let style = if i == app.recurring_index {
                theme::selected_style()
            } else if !rec.active {
                theme::dim_style()
            } else if i % 2 == 1 {
                theme::alt_row_style()
            } else {
                theme::normal_style()
            };
            Row::new(vec![
                Cell::from(format!("{:>3}", rec.day_of_month)),
                Cell::from(truncate(&rec.description, 32)),
                Cell::from(truncate(&rec.category_name, 18)),
                Cell::from(app.money(rec.amount)),
                Cell::from(if rec.active { "active" } else { "paused" }),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(5),
        Constraint::Min(20),
        Constraint::Length(20),
        Constraint::Length(14),
        Constraint::Length(8),
    ];
    f.render_widget(Table::new(rows, widths).header(header).block(block), area);
}

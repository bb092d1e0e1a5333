use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::ui::app::App;
use crate::ui::theme;
use crate::ui::util::{progress_bar, truncate};

pub(crate) fn render(f: &mut Frame, area: Rect, app: &App) {
    let Some(period) = &app.period else {
        render_empty(
            f,
            area,
            &format!("No budget period for {}", app.current_month),
            "Use :period to create it from the previous month",
        );
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(3)])
        .split(area);

    let goal_sum: Decimal = app.categories.iter().map(|c| c.goal).sum();
    let summary = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(" Spent  ", theme::dim_style()),
            Span::styled(
                app.money(period.total),
                Style::default().fg(theme::TEXT).add_modifier(Modifier::BOLD),
            ),
            Span::styled("   Goals  ", theme::dim_style()),
            Span::styled(app.money(goal_sum), theme::normal_style()),
            Span::styled("   Left  ", theme::dim_style()),
            Span::styled(
                app.money(goal_sum - period.total),
                if period.total > goal_sum {
                    theme::error_style()
                } else {
                    theme::refund_style()
                },
            ),
        ]),
        Line::from(Span::styled(
            format!(" {} categories", app.categories.len()),
            theme::dim_style(),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::OVERLAY))
            .title(Span::styled(
                format!(" {} ", app.current_month),
                theme::title_style(),
            )),
    );
    f.render_widget(summary, chunks[0]);

    if app.categories.is_empty() {
        render_empty(
            f,
            chunks[1],
            "No categories in this period",
            "Use :category <name> <goal> to add one",
        );
        return;
    }

    let items: Vec<ListItem> = app
        .categories
        .iter()
        .enumerate()
        .skip(app.category_scroll)
        .take(chunks[1].height.saturating_sub(2) as usize)
        .map(|(i, cat)| {
            let ratio = cat.progress().to_f64().unwrap_or(0.0);
            let color = if cat.goal > Decimal::ZERO {
                theme::progress_color(ratio)
            } else {
                theme::TEXT_DIM
            };

            let style = if i == app.category_index {
                theme::selected_style()
            } else if i % 2 == 0 {
                theme::alt_row_style()
            } else {
                theme::normal_style()
            };

            let percent = if cat.goal > Decimal::ZERO {
                format!(" {:.0}%", ratio * 100.0)
            } else {
                " no goal".into()
            };

            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<20}", truncate(&cat.name, 19)), style),
                Span::styled(
                    format!("{:>12} / {:<12}", app.money(cat.total), app.money(cat.goal)),
                    Style::default().fg(color),
                ),
                Span::styled(progress_bar(ratio, 20), Style::default().fg(color)),
                Span::styled(
                    percent,
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::OVERLAY))
            .title(Span::styled(" Categories ", theme::title_style())),
    );
    f.render_widget(list, chunks[1]);
}

fn render_empty(f: &mut Frame, area: Rect, headline: &str, hint: &str) {
    let msg = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(headline.to_string(), theme::dim_style())),
        Line::from(""),
        Line::from(Span::styled(hint.to_string(), theme::dim_style())),
    ])
    .centered()
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::OVERLAY))
            .title(Span::styled(" Budget ", theme::title_style())),
    );
    f.render_widget(msg, area);
}

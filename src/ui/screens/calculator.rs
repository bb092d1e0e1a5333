use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::ui::app::App;
use crate::ui::theme;

pub(crate) fn render(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let result = match (&app.calc_error, app.calculator.ans()) {
        (Some(err), _) => Span::styled(format!(" {err}"), theme::error_style()),
        (None, Some(value)) => Span::styled(
            format!(" {value}"),
            Style::default().fg(theme::ACCENT).add_modifier(Modifier::BOLD),
        ),
        (None, None) => Span::styled(" 0", theme::dim_style()),
    };
    f.render_widget(
        Paragraph::new(Line::from(result)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme::OVERLAY))
                .title(Span::styled(" Result ", theme::title_style())),
        ),
        chunks[0],
    );

    let history = app.calculator.history();
    let items: Vec<ListItem> = history
        .iter()
        .rev()
        .take(chunks[1].height.saturating_sub(2) as usize)
        .map(|(expr, value)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {expr}"), theme::normal_style()),
                Span::styled(" = ", theme::dim_style()),
                Span::styled(value.to_string(), Style::default().fg(theme::ACCENT)),
            ]))
        })
        .collect();

    let hint = if history.is_empty() {
        " Enter to type · + - * / % ( ) · ans = last result "
    } else {
        " History · c clears "
    };
    f.render_widget(
        List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme::OVERLAY))
                .title(Span::styled(hint, theme::title_style())),
        ),
        chunks[1],
    );
}

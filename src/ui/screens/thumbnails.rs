use ratatui::{
    layout::{Constraint, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::ui::app::App;
use crate::ui::theme;

pub(crate) fn render(f: &mut Frame, area: Rect, app: &App) {
    let title = match &app.video_id {
        Some(id) => format!(" Thumbnails · {id} "),
        None => " Thumbnails ".into(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::OVERLAY))
        .title(Span::styled(title, theme::title_style()));

    if app.thumbnails.is_empty() {
        let msg = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "Press Enter or use :thumb <YouTube URL>",
                theme::dim_style(),
            )),
        ])
        .centered()
        .block(block);
        f.render_widget(msg, area);
        return;
    }

    let header = Row::new(
        ["Quality", "Size", "Link"]
            .iter()
            .map(|h| Cell::from(*h).style(theme::header_style())),
    );
    let rows: Vec<Row> = app
        .thumbnails
        .iter()
        .enumerate()
        .map(|(i, (quality, url))| {
            let (w, h) = quality.size();
            let style = if i == app.thumbnail_index {
                theme::selected_style()
            } else {
                theme::normal_style()
            };
            Row::new(vec![
                Cell::from(quality.label()),
                Cell::from(format!("{w}×{h}")),
                Cell::from(url.clone()),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(16),
        Constraint::Length(10),
        Constraint::Min(30),
    ];
    f.render_widget(Table::new(rows, widths).header(header).block(block), area);
}

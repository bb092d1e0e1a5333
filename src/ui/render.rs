use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, Tabs},
    Frame,
};

use super::app::{App, InputMode, Screen};
use super::commands;
use super::screens;
use super::theme;

const KEYS: &[(&str, &str)] = &[
    ("j/k, Up/Down", "Move cursor"),
    ("1-6, Tab", "Switch screen"),
    ("g/G, Ctrl-d/u", "Jump / page"),
    ("H/L", "Previous / next month"),
    ("Enter", "Open or edit selection"),
    ("D", "Delete selection"),
    ("Space", "Pause or resume (Recurring)"),
    ("s, r", "Next status, links view (Expenses)"),
    ("Esc", "Back"),
    ("Ctrl-q", "Quit"),
];

pub(crate) fn render(f: &mut Frame, app: &App) {
    let [tabs, content, status, command] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(5),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(f.area());

    render_tabs(f, tabs, app);
    match app.screen {
        Screen::Budget => screens::budget::render(f, content, app),
        Screen::Entries => screens::entries::render(f, content, app),
        Screen::Recurring => screens::recurring::render(f, content, app),
        Screen::Expenses => screens::expenses::render(f, content, app),
        Screen::Thumbnails => screens::thumbnails::render(f, content, app),
        Screen::Calculator => screens::calculator::render(f, content, app),
    }
    render_status(f, status, app);
    render_command_line(f, command, app);

    if app.show_help {
        render_help(f, f.area());
    }
}

fn render_tabs(f: &mut Frame, area: Rect, app: &App) {
    let screens = Screen::all();
    let selected = screens.iter().position(|s| *s == app.screen).unwrap_or(0);
    let titles = screens
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}:{s}", i + 1));

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(theme::dim_style().bg(theme::HEADER_BG))
        .highlight_style(
            Style::default()
                .fg(theme::ACCENT)
                .add_modifier(Modifier::BOLD),
        )
        .divider(Span::styled("|", Style::default().fg(theme::OVERLAY)));
    f.render_widget(tabs, area);
}

fn hints(app: &App) -> &'static str {
    match app.screen {
        Screen::Budget => "Enter entries  D delete  H/L month  ? help ",
        Screen::Entries => "Esc back  D delete  :amount :move  ? help ",
        Screen::Recurring => "Space pause/resume  D delete  ? help ",
        Screen::Expenses if app.expense_view_links => "D revoke  r expenses  ? help ",
        Screen::Expenses => "s next status  D delete  r links  ? help ",
        Screen::Thumbnails => "Enter new URL  ? help ",
        Screen::Calculator => "Enter calculate  c clear  ? help ",
    }
}

fn render_status(f: &mut Frame, area: Rect, app: &App) {
    let mode_bg = match app.input_mode {
        InputMode::Normal => theme::ACCENT,
        InputMode::Command | InputMode::Editing => theme::GREEN,
        InputMode::Confirm => theme::RED,
    };
    let mode = Span::styled(
        format!(" {} ", app.input_mode),
        Style::default()
            .fg(theme::HEADER_BG)
            .bg(mode_bg)
            .add_modifier(Modifier::BOLD),
    );

    let mut left = vec![
        mode,
        Span::raw(format!(" {}  {}", app.screen, app.current_month)),
    ];
    if app.session.pending().is_some() {
        left.push(Span::styled("  receipt pending", Style::default().fg(theme::YELLOW)));
    }

    let hint = hints(app);
    let [left_area, right_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(hint.len() as u16)])
            .areas(area);

    f.render_widget(
        Paragraph::new(Line::from(left)).style(theme::status_bar_style()),
        left_area,
    );
    f.render_widget(
        Paragraph::new(hint)
            .alignment(Alignment::Right)
            .style(theme::status_bar_style()),
        right_area,
    );
}

fn render_command_line(f: &mut Frame, area: Rect, app: &App) {
    let input = Span::styled(app.command_input.as_str(), theme::command_bar_style());
    let typed = app.command_input.chars().count() as u16;

    let (line, cursor) = match app.input_mode {
        InputMode::Command => (
            Line::from(vec![Span::styled(":", Style::default().fg(theme::ACCENT)), input]),
            Some(1 + typed),
        ),
        InputMode::Editing => {
            let prompt = app.edit_target.prompt();
            (
                Line::from(vec![Span::styled(prompt, Style::default().fg(theme::GREEN)), input]),
                Some(prompt.chars().count() as u16 + typed),
            )
        }
        InputMode::Confirm => (
            Line::from(vec![
                Span::styled(app.confirm_message.as_str(), Style::default().fg(theme::YELLOW)),
                Span::styled(" [y/N] ", Style::default().fg(theme::RED)),
            ]),
            None,
        ),
        InputMode::Normal if app.status_message.is_empty() => (
            Line::from(Span::styled(" : commands  ? help", theme::dim_style())),
            None,
        ),
        InputMode::Normal => (
            Line::from(Span::styled(
                app.status_message.as_str(),
                theme::command_bar_style(),
            )),
            None,
        ),
    };

    f.render_widget(
        Paragraph::new(line).style(Style::default().bg(theme::COMMAND_BG)),
        area,
    );
    if let Some(x) = cursor {
        f.set_cursor_position((area.x + x, area.y));
    }
}

/// One row per command; aliases that share a description are folded into
/// the longest name.
fn command_rows() -> Vec<(&'static str, &'static str)> {
    let mut rows: Vec<(&'static str, &'static str)> = Vec::new();
    for (&name, cmd) in commands::COMMANDS.iter() {
        match rows.iter_mut().find(|(_, desc)| *desc == cmd.description) {
            Some(row) if name.len() > row.0.len() => row.0 = name,
            Some(_) => {}
            None => rows.push((name, cmd.description)),
        }
    }
    rows.sort_unstable();
    rows
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn render_help(f: &mut Frame, area: Rect) {
    let section = |title: &'static str| Row::new([Span::styled(title, theme::section_style())]);
    let mut rows = vec![section("Keys")];
    rows.extend(
        KEYS.iter()
            .map(|(k, d)| Row::new([format!("  {k}"), (*d).to_string()]).style(theme::normal_style())),
    );
    rows.push(Row::new([""]));
    rows.push(section("Commands"));
    rows.extend(
        command_rows()
            .into_iter()
            .map(|(n, d)| Row::new([format!("  :{n}"), d.to_string()]).style(theme::normal_style())),
    );

    let popup = centered(area, 84, rows.len() as u16 + 2);
    let table = Table::new(rows, [Constraint::Length(22), Constraint::Min(20)]).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(" theJunkyard ", theme::title_style()))
            .title_bottom(Line::from(" any key closes ").alignment(Alignment::Right))
            .border_style(Style::default().fg(theme::ACCENT))
            .style(Style::default().bg(theme::HEADER_BG)),
    );
    f.render_widget(Clear, popup);
    f.render_widget(table, popup);
}

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap},
    Frame,
};
use crate::controller::Clock;
use crate::models::{format_local, TaskStatus};
use crate::storage::KeyValueStore;
use super::app::{App, DisplayItem, InputMode, SettingsRow};

pub fn ui<S: KeyValueStore, C: Clock>(f: &mut Frame, app: &mut App<S, C>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs
            Constraint::Min(0),    // Table
            Constraint::Length(3)  // Help
        ].as_ref())
        .split(f.area());

    let partition = app.ctl.partition();
    let titles: Vec<Line> = TaskStatus::ALL
        .iter()
        .map(|s| Line::from(format!("{} ({})", s.label(), partition.get(*s).len())))
        .collect();
    drop(partition);
    let selected_tab = TaskStatus::ALL.iter().position(|s| *s == app.tab).unwrap_or(0);
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title("Ephemeral Notes"))
        .select(selected_tab)
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, chunks[0]);

    let now = app.ctl.now();
    let settings = app.ctl.settings().clone();

    let rows: Vec<Row> = app
        .display_items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            DisplayItem::SectionHeader(section, count) => Row::new(vec![
                Cell::from(format!("{} ({})", section, count)),
                Cell::from(""),
                Cell::from(""),
            ])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            DisplayItem::Task(t) => {
                let (detail, style) = match app.tab {
                    TaskStatus::Active => {
                        let left = if settings.show_time_remaining {
                            t.time_remaining(now).unwrap_or_default()
                        } else {
                            String::new()
                        };
                        (left, Style::default())
                    }
                    TaskStatus::Completed => {
                        let when = match (settings.show_time_completed, t.completed_at) {
                            (true, Some(ts)) => format!("Completed: {}", format_local(ts)),
                            _ => String::new(),
                        };
                        (when, Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT))
                    }
                    TaskStatus::Expired => {
                        let when = if settings.show_time_expired {
                            format!("Expired: {}", format_local(t.expires_at))
                        } else {
                            String::new()
                        };
                        (when, Style::default().fg(Color::Gray))
                    }
                };
                let position = if app.tab == TaskStatus::Active { (i + 1).to_string() } else { String::new() };
                Row::new(vec![
                    Cell::from(position),
                    Cell::from(if t.is_recurring { format!("{} ★", t.title) } else { t.title.clone() }).style(style),
                    Cell::from(detail).style(Style::default().fg(Color::Blue)),
                ])
            }
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Min(20),
        Constraint::Length(28),
    ];

    let empty_title;
    let block_title = if rows.is_empty() {
        empty_title = format!("No {} tasks", app.tab.label().to_lowercase());
        empty_title.as_str()
    } else {
        app.tab.label()
    };

    let table = Table::new(rows, widths)
        .block(Block::default().borders(Borders::ALL).title(block_title))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, chunks[1], &mut app.state);

    let help_text = match app.input_mode {
        InputMode::Normal => match &app.status_message {
            Some(msg) => msg.as_str(),
            None => match app.tab {
                TaskStatus::Active => "q: Quit | a: Add | Space: Done | r: Reset | s: Repeat | J/K: Move | d: Del | Tab: Next | o: Settings | S: Share | ?: About",
                _ => "q: Quit | r: Restore | d: Del | Tab: Next | o: Settings | S: Share | ?: About",
            },
        },
        InputMode::Adding => "Enter: Add | Esc: Cancel",
        InputMode::Settings => "Up/Down: Select | Left/Right: -/+1h | [/]: -/+24h | Space: Toggle | Esc: Close",
        InputMode::About => "Esc: Close",
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(help, chunks[2]);

    match app.input_mode {
        InputMode::Adding => {
            let area = centered_rect(60, 3, f.area());
            f.render_widget(Clear, area);
            let input = Paragraph::new(app.input_buffer.as_str())
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default().borders(Borders::ALL).title("Add a new task..."));
            f.render_widget(input, area);
        }
        InputMode::Settings => {
            let area = centered_rect(50, 6, f.area());
            f.render_widget(Clear, area);
            let check = |on: bool| if on { "[x]" } else { "[ ]" };
            let lines: Vec<Line> = SettingsRow::ALL
                .iter()
                .map(|row| {
                    let text = match row {
                        SettingsRow::TimeLimit => format!("Default time limit: {}h (1-168)", settings.default_time_limit),
                        SettingsRow::ShowRemaining => format!("{} Show time remaining", check(settings.show_time_remaining)),
                        SettingsRow::ShowCompleted => format!("{} Show time completed", check(settings.show_time_completed)),
                        SettingsRow::ShowExpired => format!("{} Show time expired", check(settings.show_time_expired)),
                    };
                    if *row == app.current_settings_row() {
                        Line::styled(text, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
                    } else {
                        Line::from(text)
                    }
                })
                .collect();
            let popup = Paragraph::new(lines)
                .block(Block::default().borders(Borders::ALL).title("Settings"));
            f.render_widget(popup, area);
        }
        InputMode::About => {
            let area = centered_rect(60, 6, f.area());
            f.render_widget(Clear, area);
            let popup = Paragraph::new(app.about())
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title("About"));
            f.render_widget(popup, area);
        }
        InputMode::Normal => {}
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ].as_ref())
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ].as_ref())
        .split(popup_layout[1])[1]
}

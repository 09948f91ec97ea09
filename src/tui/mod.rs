pub mod app;
pub mod ui;

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::error;
use crate::controller::{Clock, Controller};
use crate::models::TaskStatus;
use crate::storage::KeyValueStore;
use app::{App, InputMode};
use ui::ui;

/// How often the screen refreshes and the recurring sweep runs when idle.
const TICK: Duration = Duration::from_secs(1);

pub fn run_tui<S: KeyValueStore, C: Clock>(ctl: Controller<S, C>, data_dir: PathBuf) -> io::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(ctl, data_dir);

    // Run loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!(error = %err, "TUI loop failed");
    }
    res
}

fn run_app<B: Backend, S: KeyValueStore, C: Clock>(terminal: &mut Terminal<B>, app: &mut App<S, C>) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(TICK)? {
            app.tick();
            continue;
        }
        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match app.input_mode {
            InputMode::Normal => {
                app.status_message = None;
                match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Down | KeyCode::Char('j') => app.next(),
                    KeyCode::Up | KeyCode::Char('k') => app.previous(),
                    KeyCode::Char('J') => app.move_selected(true),
                    KeyCode::Char('K') => app.move_selected(false),
                    KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => app.next_tab(),
                    KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => app.previous_tab(),
                    KeyCode::Char('1') => app.set_tab(TaskStatus::Active),
                    KeyCode::Char('2') => app.set_tab(TaskStatus::Completed),
                    KeyCode::Char('3') => app.set_tab(TaskStatus::Expired),
                    KeyCode::Char(' ') => app.complete_selected(),
                    KeyCode::Char('d') | KeyCode::Delete => app.delete_selected(),
                    KeyCode::Char('a') => app.start_add(),
                    KeyCode::Char('r') => app.reset_or_restore_selected(),
                    KeyCode::Char('s') => app.toggle_recurring_selected(),
                    KeyCode::Char('o') => app.open_settings(),
                    KeyCode::Char('S') => app.share(),
                    KeyCode::Char('?') => app.open_about(),
                    _ => {}
                }
            }
            InputMode::Adding => match key.code {
                KeyCode::Enter => app.handle_input(),
                KeyCode::Esc => app.cancel_input(),
                KeyCode::Char(c) => app.input_buffer.push(c),
                KeyCode::Backspace => {
                    app.input_buffer.pop();
                }
                _ => {}
            },
            InputMode::Settings => match key.code {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => app.cancel_input(),
                KeyCode::Down | KeyCode::Char('j') => app.settings_next(),
                KeyCode::Up | KeyCode::Char('k') => app.settings_previous(),
                KeyCode::Right | KeyCode::Char('l') => app.adjust_time_limit(1),
                KeyCode::Left | KeyCode::Char('h') => app.adjust_time_limit(-1),
                KeyCode::Char(']') => app.adjust_time_limit(24),
                KeyCode::Char('[') => app.adjust_time_limit(-24),
                KeyCode::Char(' ') => app.toggle_setting(),
                _ => {}
            },
            InputMode::About => app.cancel_input(),
        }
    }
}

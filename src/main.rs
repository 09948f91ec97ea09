//! # Ephemeral
//!
//! A terminal task list where every task expires after a time window unless
//! you complete it first. Combines a CLI for quick entry with a TUI for
//! interactive use.
//!
//! ## Features
//!
//! *   **Expiring tasks**: New tasks expire after the default time limit
//!     (24 hours unless changed, anywhere from 1 to 168 hours).
//! *   **Three views**: Active, Completed and Expired. Completed and expired
//!     tasks are grouped into Today, This Week, Last Week, Last 30 Days,
//!     Last Year and All.
//! *   **Recurring tasks**: A recurring task comes back 24 hours after you
//!     complete it.
//! *   **Sharing**: Send the active list to a command of your choice or the
//!     clipboard.
//!
//! ## Usage
//!
//! ### Interactive Mode (TUI)
//!
//! ```bash
//! ephemeral
//! # or explicitly
//! ephemeral ui
//! ```
//!
//! #### TUI Key Bindings
//!
//! *   `q`: Quit
//! *   `Tab` / `1` `2` `3`: Switch between Active, Completed and Expired
//! *   `a`: Add new task
//! *   `Space`: Mark selected task as done
//! *   `r`: Reset timer (Active) or restore task (Completed / Expired)
//! *   `s`: Toggle daily repeat
//! *   `J` / `K`: Move selected task down / up
//! *   `d`: Delete selected task
//! *   `o`: Settings
//! *   `S`: Share active tasks
//! *   `?`: About
//!
//! ### Command Line Interface (CLI)
//!
//! ```bash
//! ephemeral add "Water the plants"
//! ephemeral list --tab completed
//! ephemeral complete 3f2a91c0
//! ephemeral move 3 1
//! ephemeral settings --hours 48 --show-expired false
//! ```
//!
//! Tasks are addressed by any unique prefix of their id.
//!
//! ## Data Storage
//!
//! `todos.json` and `todoSettings.json` live in your local data directory:
//! *   Linux: `~/.local/share/ephemeral/`
//! *   macOS: `~/Library/Application Support/ephemeral/`
//! *   Windows: `%LOCALAPPDATA%\ephemeral\`
//!
//! Override it with `--data-dir` or the `EPHEMERAL_DATA_DIR` environment
//! variable. Logs are filtered with `EPHEMERAL_LOG` (default `warn`); the TUI
//! writes them to `ephemeral.log` in the data directory.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use ephemeral::commands::*;
use ephemeral::controller::Controller;
use ephemeral::models::TaskStatus;
use ephemeral::storage::{default_data_dir, FileStore};
use ephemeral::tui::run_tui;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "EPHEMERAL_LOG";

#[derive(Parser)]
#[command(name = "ephemeral")]
#[command(about = "Task list where tasks expire unless completed", long_about = None)]
struct Cli {
    /// Directory holding the data files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Tab {
    Active,
    Completed,
    Expired,
}

impl From<Tab> for TaskStatus {
    fn from(tab: Tab) -> Self {
        match tab {
            Tab::Active => TaskStatus::Active,
            Tab::Completed => TaskStatus::Completed,
            Tab::Expired => TaskStatus::Expired,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task title (words are joined with spaces)
        #[arg(required = true)]
        title: Vec<String>,
    },
    /// List tasks of one tab
    List {
        #[arg(short, long, value_enum, default_value_t = Tab::Active)]
        tab: Tab,
    },
    /// Mark a task as complete
    Complete {
        id: String,
    },
    /// Remove a task
    Delete {
        id: String,
    },
    /// Restart the expiration timer of a task
    Reset {
        id: String,
    },
    /// Bring a completed or expired task back to active
    Readd {
        id: String,
    },
    /// Toggle daily repeat for a task
    Repeat {
        id: String,
    },
    /// Move an active task to another position (1-based, as listed)
    Move {
        from: usize,
        to: usize,
    },
    /// Show or change settings
    Settings {
        /// Default time limit in hours (1-168)
        #[arg(short = 'H', long)]
        hours: Option<i64>,
        /// Show time remaining on active tasks
        #[arg(long)]
        show_remaining: Option<bool>,
        /// Show completion time on completed tasks
        #[arg(long)]
        show_completed: Option<bool>,
        /// Show expiration time on expired tasks
        #[arg(long)]
        show_expired: Option<bool>,
    },
    /// Share the active tasks
    Share,
    /// About this program
    About,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

/// Installs the log subscriber: stderr for the CLI, a file for the TUI.
fn init_logging(data_dir: &Path, tui: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    if tui {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("create data directory {}", data_dir.display()))?;
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix("ephemeral")
            .filename_suffix("log")
            .build(data_dir)
            .context("open log file")?;
        tracing_subscriber::fmt()
            .with_writer(appender)
            .with_ansi(false)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_env_filter(filter)
            .init();
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        let shell_enum = match shell.as_str() {
            "bash" => Shell::Bash,
            "zsh" => Shell::Zsh,
            "fish" => Shell::Fish,
            "powershell" => Shell::PowerShell,
            "elvish" => Shell::Elvish,
            _ => {
                eprintln!("Unsupported shell: {}", shell);
                return Ok(());
            }
        };
        let mut cmd = Cli::command();
        generate(shell_enum, &mut cmd, "ephemeral", &mut io::stdout());
        return Ok(());
    }

    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    let tui = matches!(cli.command, None | Some(Commands::Ui));
    init_logging(&data_dir, tui)?;

    let mut ctl = Controller::open(FileStore::new(&data_dir));
    match cli.command {
        Some(Commands::Add { title }) => {
            cmd_add(&mut ctl, &title.join(" "), false);
        }
        Some(Commands::List { tab }) => cmd_list(&ctl, tab.into()),
        Some(Commands::Complete { id }) => {
            cmd_complete(&mut ctl, &id, false);
        }
        Some(Commands::Delete { id }) => {
            cmd_delete(&mut ctl, &id, false);
        }
        Some(Commands::Reset { id }) => {
            cmd_reset(&mut ctl, &id, false);
        }
        Some(Commands::Readd { id }) => {
            cmd_readd(&mut ctl, &id, false);
        }
        Some(Commands::Repeat { id }) => {
            cmd_repeat(&mut ctl, &id, false);
        }
        Some(Commands::Move { from, to }) => {
            cmd_move(&mut ctl, from, to, false);
        }
        Some(Commands::Settings { hours, show_remaining, show_completed, show_expired }) => {
            cmd_settings(&mut ctl, hours, show_remaining, show_completed, show_expired, false)
        }
        Some(Commands::Share) => cmd_share(&ctl),
        Some(Commands::About) => cmd_about(&data_dir),
        Some(Commands::Completions { .. }) => {}
        Some(Commands::Ui) | None => run_tui(ctl, data_dir).context("run TUI")?,
    }
    Ok(())
}

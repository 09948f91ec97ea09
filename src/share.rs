//! Plain-text export of the task list.
//!
//! A payload is offered to a list of targets in turn: the user's share
//! command if `EPHEMERAL_SHARE_CMD` is set, then the first clipboard
//! program found on `PATH`.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::ShareError;
use crate::models::Task;

/// Environment variable naming the share command, e.g. `"mail -s tasks me"`.
pub const SHARE_CMD_ENV: &str = "EPHEMERAL_SHARE_CMD";

/// Clipboard programs tried in order, with the arguments they need.
const CLIPBOARD_PROGRAMS: &[(&str, &[&str])] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("pbcopy", &[]),
    ("clip.exe", &[]),
];

/// Something that accepts a text payload.
pub trait ShareTarget {
    /// Short name used in messages and logs.
    fn name(&self) -> &str;
    fn share(&self, payload: &str) -> Result<(), ShareError>;
    /// Whether a success means the text landed on the clipboard.
    fn is_clipboard(&self) -> bool {
        false
    }
}

/// Spawns `program`, writes `payload` to its stdin and waits for it.
fn pipe_to(program: &str, command: &mut Command, payload: &str) -> Result<(), ShareError> {
    let spawn_err = |source: std::io::Error| ShareError::Spawn { program: program.to_string(), source };
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(spawn_err)?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(payload.as_bytes()).map_err(spawn_err)?;
    }
    let status = child.wait().map_err(spawn_err)?;
    if status.success() {
        Ok(())
    } else {
        Err(ShareError::Failed { program: program.to_string(), status })
    }
}

/// A user-configured command receiving the payload on stdin.
#[derive(Debug, Clone)]
pub struct CommandShare {
    program: String,
    args: Vec<String>,
}

impl CommandShare {
    /// Parses a whitespace-separated command line. `None` if it is blank.
    pub fn parse(line: &str) -> Option<CommandShare> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(CommandShare { program, args: parts.collect() })
    }

    pub fn from_env() -> Option<CommandShare> {
        std::env::var(SHARE_CMD_ENV).ok().and_then(|line| CommandShare::parse(&line))
    }
}

impl ShareTarget for CommandShare {
    fn name(&self) -> &str {
        &self.program
    }

    fn share(&self, payload: &str) -> Result<(), ShareError> {
        pipe_to(&self.program, Command::new(&self.program).args(&self.args), payload)
    }
}

/// The system clipboard, reached through a helper program.
#[derive(Debug, Clone)]
pub struct ClipboardShare {
    name: String,
    path: PathBuf,
    args: Vec<String>,
}

impl ClipboardShare {
    /// Finds the first known clipboard program on `PATH`.
    pub fn detect() -> Option<ClipboardShare> {
        CLIPBOARD_PROGRAMS.iter().find_map(|(name, args)| {
            which::which(name).ok().map(|path| ClipboardShare {
                name: name.to_string(),
                path,
                args: args.iter().map(|a| a.to_string()).collect(),
            })
        })
    }
}

impl ShareTarget for ClipboardShare {
    fn name(&self) -> &str {
        &self.name
    }

    fn share(&self, payload: &str) -> Result<(), ShareError> {
        pipe_to(&self.name, Command::new(&self.path).args(&self.args), payload)
    }

    fn is_clipboard(&self) -> bool {
        true
    }
}

/// Targets available on this machine, in the order they are tried.
pub fn default_targets() -> Vec<Box<dyn ShareTarget>> {
    let mut targets: Vec<Box<dyn ShareTarget>> = Vec::new();
    if let Some(cmd) = CommandShare::from_env() {
        targets.push(Box::new(cmd));
    }
    if let Some(clip) = ClipboardShare::detect() {
        targets.push(Box::new(clip));
    }
    targets
}

/// Builds the text shared for a list of tasks. `None` when there is nothing to share.
pub fn share_payload(tasks: &[&Task]) -> Option<String> {
    if tasks.is_empty() {
        return None;
    }
    let mut out = String::from("My Tasks\n\n");
    for t in tasks {
        out.push_str("- ");
        out.push_str(&t.title);
        if t.is_recurring {
            out.push_str(" (recurring)");
        }
        out.push('\n');
    }
    Some(out)
}

/// Offers `payload` to each target until one accepts it.
///
/// Returns the notification to show the user. If every target fails, the
/// last error is returned; with no targets at all, `Unavailable`.
pub fn share_via(targets: &[Box<dyn ShareTarget>], payload: &str) -> Result<String, ShareError> {
    let mut last_err = ShareError::Unavailable;
    for target in targets {
        match target.share(payload) {
            Ok(()) => {
                debug!(target = target.name(), "payload shared");
                return Ok(if target.is_clipboard() {
                    "Tasks copied to clipboard!".to_string()
                } else {
                    format!("Tasks shared via {}.", target.name())
                });
            }
            Err(e) => {
                warn!(target = target.name(), error = %e, "share target failed");
                last_err = e;
            }
        }
    }
    Err(last_err)
}

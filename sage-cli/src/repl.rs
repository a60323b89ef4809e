//! Line-oriented session: parse a line, run it, print the result.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Result;
use sage_core::search::SearchBackend;
use sage_core::{Resolver, SageError};
use tracing::warn;

/// Default number of records shown by `:history`.
const DEFAULT_HISTORY: usize = 10;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A question for the resolver.
    Ask(String),
    /// Knowledge store summary.
    Stats,
    /// The newest `n` interactions.
    History(usize),
    /// Counter values in Prometheus text format.
    Counters,
    /// Dump the knowledge store as JSON.
    Export(PathBuf),
    /// Rotating database backup.
    Backup,
    /// List the commands.
    Help,
    /// Flush and exit.
    Quit,
    /// Blank line.
    Nothing,
}

/// Parse one input line. Lines not starting with `:` are questions.
///
/// # Errors
///
/// Returns a user-facing message for an unknown command or bad argument.
pub fn parse_line(line: &str) -> std::result::Result<Command, String> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix(':') else {
        return Ok(if line.is_empty() {
            Command::Nothing
        } else {
            Command::Ask(line.to_string())
        });
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

    match (name, arg) {
        ("stats", None) => Ok(Command::Stats),
        ("history", None) => Ok(Command::History(DEFAULT_HISTORY)),
        ("history", Some(n)) => n
            .parse()
            .map(Command::History)
            .map_err(|_| format!("not a count: {n}")),
        ("counters", None) => Ok(Command::Counters),
        ("export", Some(path)) => Ok(Command::Export(PathBuf::from(path))),
        ("export", None) => Err("usage: :export <path>".to_string()),
        ("backup", None) => Ok(Command::Backup),
        ("help" | "h" | "?", None) => Ok(Command::Help),
        ("quit" | "q" | "exit", None) => Ok(Command::Quit),
        _ => Err(format!("unknown command :{rest} (try :help)")),
    }
}

/// Text printed by `:help`.
pub const HELP: &str = "\
Type a programming question, or one of:
  :stats            knowledge store summary
  :history [n]      last n interactions (default 10)
  :counters         request counters (Prometheus format)
  :export <path>    write the knowledge store to a JSON file
  :backup           rotating backup of the database
  :help             this text
  :quit             save and exit";

/// Run one command and return the text to print, or `None` to quit.
///
/// # Errors
///
/// Returns I/O and persistence failures of the maintenance commands.
pub async fn execute<S: SearchBackend>(
    resolver: &Resolver<S>,
    command: Command,
) -> Result<Option<String>> {
    let output = match command {
        Command::Quit => return Ok(None),
        Command::Nothing => String::new(),
        Command::Help => HELP.to_string(),
        Command::Ask(message) => match resolver.resolve(&message).await {
            Ok(resolution) => resolution.response,
            Err(SageError::InvalidRequest { reason }) => format!("Invalid request: {reason}"),
            Err(e) => {
                warn!(error = %e, "Unexpected resolver error");
                format!("Error: {e}")
            }
        },
        Command::Stats => {
            let stats = resolver.knowledge().stats();
            let mut out = format!("Entries: {}\n", stats.entry_count);
            let _ = writeln!(out, "Categories: {}", stats.categories.join(", "));
            let last = stats
                .last_interaction
                .map_or_else(|| "never".to_string(), |t| t.to_rfc3339());
            let _ = write!(out, "Last activity: {last}");
            out
        }
        Command::History(n) => {
            let records = resolver.history(n);
            if records.is_empty() {
                "No interactions yet.".to_string()
            } else {
                records
                    .iter()
                    .map(|r| {
                        format!(
                            "[{}] ({}, {:.2}) {}",
                            r.timestamp.format("%H:%M:%S"),
                            r.source,
                            r.confidence,
                            r.message
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        Command::Counters => resolver.counters().to_prometheus(),
        Command::Export(path) => {
            let export = resolver.knowledge().export(&path)?;
            format!("Exported {} entries to {}", export.entries.len(), path.display())
        }
        Command::Backup => match resolver.knowledge().backup()? {
            Some(path) => format!("Backup written to {}", path.display()),
            None => "Backups are disabled for this store.".to_string(),
        },
    };
    Ok(Some(output))
}

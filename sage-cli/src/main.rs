//! SAGE CLI: ask programming questions from the terminal.
//!
//! Answers come from the local knowledge base, a web search fallback, or
//! built-in templates. Questions given as arguments are answered once;
//! otherwise an interactive session reads stdin line by line.

mod logging;
mod repl;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sage_core::{Resolver, SageConfig};
use sage_search::SearchClient;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::logging::LogFormat;
use crate::repl::{execute, parse_line, Command};

/// SAGE: a programming Q&A assistant with memory.
#[derive(Parser, Debug)]
#[command(name = "sage", version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long, env = "SAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Knowledge database path (overrides `knowledge.db_path`).
    #[arg(long, env = "SAGE_DB")]
    db: Option<PathBuf>,

    /// Search provider (overrides `search.provider`): duckduckgo, searxng, none.
    #[arg(long)]
    search: Option<String>,

    /// Log format.
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Ask this question and exit instead of starting a session.
    question: Vec<String>,
}

fn load_config(cli: &Cli) -> Result<SageConfig> {
    let mut config = match &cli.config {
        Some(path) => SageConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SageConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.knowledge.db_path = db.to_string_lossy().into_owned();
    }
    if let Some(provider) = &cli.search {
        config.search.provider.clone_from(provider);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    logging::init(
        logging::effective_level(&config.general.log_level, cli.verbose),
        cli.log_format,
    )?;

    let search = SearchClient::from_config(&config.search).context("configuring search")?;
    let resolver = Resolver::open(&config, search)
        .with_context(|| format!("opening knowledge store {}", config.knowledge.db_path))?;

    if cli.question.is_empty() {
        interactive(&resolver).await?;
    } else {
        let question = cli.question.join(" ");
        if let Some(output) = execute(&resolver, Command::Ask(question)).await? {
            println!("{output}");
        }
    }

    resolver.flush().context("saving state")?;
    Ok(())
}

/// Read commands from stdin until `:quit`, EOF or Ctrl-C.
async fn interactive<S: sage_core::SearchBackend>(resolver: &Resolver<S>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    info!(entries = resolver.knowledge().len(), "Session started");
    stdout
        .write_all(b"SAGE ready. Ask a programming question, or :help.\n")
        .await?;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                None
            }
        };
        let Some(line) = line else { break };

        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(message) => {
                stdout.write_all(format!("{message}\n").as_bytes()).await?;
                continue;
            }
        };

        match execute(resolver, command).await {
            Ok(Some(output)) if output.is_empty() => {}
            Ok(Some(output)) => stdout.write_all(format!("{output}\n\n").as_bytes()).await?,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Command failed");
                stdout.write_all(format!("Error: {e:#}\n").as_bytes()).await?;
            }
        }
    }

    stdout.write_all(b"Bye.\n").await?;
    Ok(())
}

//! # logbatch
//!
//! Command-line front end: write single entries, stream stdin into the
//! buffered logger, and read persisted rows back.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use logbatch::{LogEntry, LogLevel, Logger, LoggerSettings};
use logbatch_store::{ConnectionConfig, LogQuery, LogStore, SqliteStore, StoredLog};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// Buffered batch log writer.
#[derive(Parser, Debug)]
#[command(name = "logbatch", about = "Buffered batch log writer")]
struct Cli {
    /// Path to the `SQLite` database (overrides settings).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Destination table (overrides settings).
    #[arg(long, global = true)]
    table: Option<String>,

    /// Settings file (default `~/.logbatch/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Diagnostic log level for the tool itself.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write one entry and flush it.
    Write {
        /// Severity: info, warning, error, fatal.
        #[arg(long, default_value = "info")]
        level: String,
        /// Emitting component.
        #[arg(long)]
        component: Option<String>,
        /// Emitting process.
        #[arg(long)]
        process: Option<String>,
        /// Free-form context.
        #[arg(long)]
        context: Option<String>,
        /// Message text.
        #[arg(long)]
        message: String,
    },
    /// Write every stdin line as an Info entry.
    Pipe {
        /// Component attached to every line.
        #[arg(long)]
        component: Option<String>,
    },
    /// Print the most recent persisted rows, oldest first.
    Tail {
        /// Number of rows.
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Only rows at this level or above.
        #[arg(long)]
        min_level: Option<String>,
        /// Only rows from this component.
        #[arg(long)]
        component: Option<String>,
        /// One JSON object per line.
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Settings file, then env, then command-line overrides.
    fn resolve_settings(&self) -> Result<LoggerSettings> {
        let path = self
            .settings
            .clone()
            .unwrap_or_else(logbatch_settings::settings_path);
        let mut settings = logbatch_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        if let Some(ref db) = self.db {
            settings.database.clone_from(db);
        }
        if let Some(ref table) = self.table {
            settings.table.clone_from(table);
        }
        settings.validate().context("Invalid settings")?;
        Ok(settings)
    }
}

fn parse_level(level: &str) -> Result<LogLevel> {
    let parsed = LogLevel::from_str_lossy(level);
    if parsed == LogLevel::Info && !level.eq_ignore_ascii_case("info") {
        bail!("Unknown level '{level}' (expected info, warning, error or fatal)");
    }
    Ok(parsed)
}

fn open_store(settings: &LoggerSettings) -> Result<SqliteStore> {
    SqliteStore::open(
        &settings.database,
        &ConnectionConfig {
            pool_size: settings.pool_size,
            busy_timeout_ms: settings.busy_timeout_ms,
        },
    )
    .with_context(|| format!("Failed to open database {}", settings.database.display()))
}

async fn run_write(settings: &LoggerSettings, entry: LogEntry) -> Result<()> {
    let logger = Logger::open(settings).context("Failed to start logger")?;
    logger.write_async(entry).await?;
    logger.terminate_async().await.context("Final flush failed")?;
    Ok(())
}

async fn run_pipe<R>(settings: &LoggerSettings, input: R, component: Option<&str>) -> Result<u64>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let logger = Logger::open(settings).context("Failed to start logger")?;
    let mut lines = BufReader::new(input).lines();
    let mut written = 0u64;
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.is_empty() {
            continue;
        }
        logger
            .write_info_async(component, None, None, &line, None)
            .await?;
        written += 1;
    }
    logger.terminate_async().await.context("Final flush failed")?;

    let stats = logger.stats();
    info!(
        written,
        persisted = stats.persisted,
        flushes = stats.flushes,
        discarded = stats.discarded,
        "pipe finished"
    );
    Ok(written)
}

fn read_tail(settings: &LoggerSettings, query: &LogQuery) -> Result<Vec<StoredLog>> {
    let store = open_store(settings)?;
    let table = settings.table_name()?;
    let _ = store.ensure_table(&table)?;
    let mut rows = store.reader(table).query(query)?;
    rows.reverse();
    Ok(rows)
}

fn format_row(row: &StoredLog) -> String {
    let mut line = format!("{} {:<10}", row.timestamp, row.level.as_str());
    if let Some(ref component) = row.component {
        line.push_str(&format!(" [{component}]"));
    }
    if let Some(ref message) = row.message {
        line.push(' ');
        line.push_str(message);
    }
    if let Some(ref error_type) = row.error_type {
        line.push_str(&format!(" ({error_type})"));
    }
    line
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logbatch::init_subscriber(&cli.log_level);
    let settings = cli.resolve_settings()?;

    match cli.command {
        Command::Write {
            ref level,
            ref component,
            ref process,
            ref context,
            ref message,
        } => {
            let mut entry = LogEntry::new(parse_level(level)?).with_message(message.as_str());
            if let Some(c) = component {
                entry = entry.with_component(c.as_str());
            }
            if let Some(p) = process {
                entry = entry.with_process(p.as_str());
            }
            if let Some(c) = context {
                entry = entry.with_context(c.as_str());
            }
            run_write(&settings, entry).await?;
        }
        Command::Pipe { ref component } => {
            let _ = run_pipe(&settings, tokio::io::stdin(), component.as_deref()).await?;
        }
        Command::Tail {
            limit,
            ref min_level,
            ref component,
            json,
        } => {
            let query = LogQuery {
                min_level: min_level.as_deref().map(parse_level).transpose()?,
                component: component.clone(),
                limit,
                ascending: false,
            };
            for row in read_tail(&settings, &query)? {
                if json {
                    println!("{}", serde_json::to_string(&row)?);
                } else {
                    println!("{}", format_row(&row));
                }
            }
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Headless notification runner.
//!
//! # Responsibility
//! - Open the slot database and resolve the session identity.
//! - Drive notification ticks on a fixed interval until Ctrl-C, re-reading
//!   session, settings and entries before every tick.
//! - Print alert text to stdout; the log only carries lengths.

use clap::Parser;
use log::{info, warn};
use roughnote_core::db::open_db;
use roughnote_core::{
    default_log_level, init_logging, refresh_and_tick, Alert, AlertError, AlertSink, AppContext,
    EntryStore, LogAlertSink, Permission, SqliteKvStore, SystemClock,
};
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "roughnote", version, about = "Roughnote notification runner")]
struct Cli {
    /// Slot database file
    #[arg(long, default_value = "roughnote.sqlite3")]
    db: PathBuf,
    /// Log directory (defaults to ./logs)
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// trace|debug|info|warn|error
    #[arg(long)]
    log_level: Option<String>,
    /// Run a single tick and exit
    #[arg(long)]
    once: bool,
}

/// Writes each alert to stdout, then records it in the log sink.
struct ConsoleAlertSink {
    log: LogAlertSink,
}

impl AlertSink for ConsoleAlertSink {
    fn permission(&self) -> Permission {
        self.log.permission()
    }

    fn request_permission(&mut self) -> Permission {
        self.log.request_permission()
    }

    fn notify(&mut self, alert: &Alert) -> Result<(), AlertError> {
        println!("{}: {}", alert.title, alert.body);
        self.log.notify(alert)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let log_dir = match cli.log_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?.join("logs"),
    };
    let level = cli
        .log_level
        .unwrap_or_else(|| default_log_level().to_string());
    init_logging(&level, &log_dir.to_string_lossy())?;

    let conn = open_db(&cli.db)?;
    let kv = SqliteKvStore::new(&conn);
    let context = AppContext::load(&kv)?;

    let mut store = EntryStore::open(SqliteKvStore::new(&conn), SystemClock, context.identity)?;
    let mut sink = ConsoleAlertSink {
        log: LogAlertSink::new(),
    };
    if !context.settings.notifications_enabled {
        warn!("event=runner_start module=cli status=ok notifications=disabled");
    }

    if cli.once {
        let report = refresh_and_tick(&mut store, &mut sink)?;
        println!(
            "scanned={} fired={} posted={}",
            report.scanned, report.fired, report.posted
        );
        return Ok(());
    }

    let mut ticker = tokio::time::interval(context.settings.tick_interval());
    info!(
        "event=runner_start module=cli status=ok interval_ms={}",
        context.settings.tick_interval().as_millis()
    );
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = refresh_and_tick(&mut store, &mut sink) {
                    warn!("event=tick module=cli status=error error={err}");
                }
            }
            _ = &mut shutdown => break,
        }
    }

    info!(
        "event=runner_stop module=cli status=ok posted={}",
        sink.log.posted()
    );
    Ok(())
}

//! QUINIELA: shared-board pool daemon
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the board, results source and roster together, and runs the
//! round polling loop until Ctrl+C.

use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use quiniela::board::memory::MemoryBoard;
use quiniela::board::sheets::SheetsBoard;
use quiniela::board::{RoundBoard, SharedBoard};
use quiniela::config::{self, BoardBackend};
use quiniela::engine::{PollingLoop, RoundState};
use quiniela::results::http::HttpResultsSource;
use quiniela::roster::{FileRoster, RosterSource, StaticRoster};

const BANNER: &str = r#"
  ___  _   _ ___ _   _ ___ _____ _        _
 / _ \| | | |_ _| \ | |_ _| ____| |      / \
| | | | | | || ||  \| || ||  _| | |     / _ \
| |_| | |_| || || |\  || || |___| |___ / ___ \
 \__\_\\___/|___|_| \_|___|_____|_____/_/   \_\

  Shared-board pool daemon
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = config::AppConfig::load("config.toml")?;

    init_logging(&cfg.daemon);

    println!("{BANNER}");
    info!(
        daemon_name = %cfg.daemon.name,
        num_doubles = cfg.daemon.num_doubles,
        backend = ?cfg.board.backend,
        season = %cfg.results.season,
        "QUINIELA starting up"
    );

    // -- Initialise components -------------------------------------------

    let (board, template_id) = build_board(&cfg)?;
    let rounds = RoundBoard::new(board, template_id, &cfg.board.title_prefix);

    let results = Arc::new(HttpResultsSource::new(
        &cfg.results.base_url,
        &cfg.results.season,
    )?);

    let roster: Arc<dyn RosterSource> = match &cfg.participants.roster_file {
        Some(path) => {
            info!(path = %path, "Roster read from file");
            Arc::new(FileRoster::new(path))
        }
        None => {
            info!(count = cfg.participants.people.len(), "Roster from config");
            Arc::new(StaticRoster::new(cfg.participants.people.clone()))
        }
    };

    let state = RoundState::new(rounds, results, roster, cfg.daemon.num_doubles);

    // -- Main loop -------------------------------------------------------

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received.");
        }
        signal_token.cancel();
    });

    let intervals = cfg.daemon.intervals();
    info!(
        new_secs = cfg.daemon.period_new_secs,
        completed_secs = cfg.daemon.period_completed_secs,
        finished_secs = cfg.daemon.period_finished_secs,
        "Entering polling loop. Press Ctrl+C to stop."
    );

    PollingLoop::new(state, intervals, shutdown)
        .run()
        .instrument(info_span!("daemon", name = %cfg.daemon.name))
        .await
        .context("Round engine stopped")?;

    info!("QUINIELA shut down cleanly.");
    Ok(())
}

/// Build the configured board, returning it with the template sheet id.
fn build_board(cfg: &config::AppConfig) -> Result<(Arc<dyn SharedBoard>, i64)> {
    match cfg.board.backend {
        BoardBackend::Sheets => {
            let token = config::AppConfig::resolve_env(&cfg.board.access_token_env)?;
            let board = SheetsBoard::new(
                &cfg.board.spreadsheet_id,
                SecretString::new(token),
                cfg.board.base_url.as_deref(),
            )?;
            Ok((Arc::new(board), cfg.board.template_sheet_id))
        }
        BoardBackend::Memory => {
            warn!("Memory board selected, nothing reaches the shared spreadsheet");
            let board = MemoryBoard::new();
            let template_id = board.add_sheet("Plantilla");
            // Placeholder announcing round 1 so the dry run has a round to set up.
            board.add_sheet("1");
            Ok((Arc::new(board), template_id))
        }
    }
}

/// Initialise the `tracing` subscriber. `RUST_LOG` wins over the
/// configured level; JSON output is on when configured or when
/// `QUINIELA_LOG_JSON` is set.
fn init_logging(daemon: &config::DaemonConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let directive = format!("quiniela={}", daemon.log_level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive));

    let builder = fmt().with_env_filter(env_filter).with_target(false);
    if daemon.log_json || std::env::var_os("QUINIELA_LOG_JSON").is_some() {
        builder.json().with_current_span(true).init();
    } else {
        builder.compact().init();
    }
}

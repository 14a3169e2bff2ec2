//! Headless engine binary for the Downlink simulation core.
//!
//! Plays one scripted mission from start to finish and logs what happens.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `downlink-config.yaml`
//! 3. Create the session (player machine, network, clock)
//! 4. Stage the mission: relays, guarded server, connection, tasks
//! 5. Run the session loop
//! 6. Log the result and the saved records

mod error;
mod scenario;

use std::path::{Path, PathBuf};

use downlink_core::config::GameConfig;
use downlink_core::runner::{self, TickCallback};
use downlink_core::session::{Session, TickSummary};
use downlink_sched::Dictionary;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Config file looked up in the working directory when no path is given.
const DEFAULT_CONFIG_PATH: &str = "downlink-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any setup step or the session itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("downlink-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        name = config.world.name,
        seed = config.world.seed,
        tick_interval_ms = config.world.tick_interval_ms,
        max_ticks = config.world.max_ticks,
        "Configuration loaded"
    );

    // 3. Create the session.
    let dictionary: Dictionary = scenario::DEMO_WORDS.iter().copied().collect();
    let mut session = Session::new(config, dictionary).map_err(EngineError::from)?;

    // 4. Stage the mission.
    let target = scenario::stage(&mut session)?;
    info!(target_hop = %target, "Mission staged, entering session loop");

    // 5. Run.
    let mut callback = LoggingCallback;
    let result = runner::run_session(&mut session, &mut callback)
        .await
        .map_err(EngineError::from)?;

    // 6. Log results.
    runner::log_session_end(&result);
    log_saved_records(&session)?;

    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "downlink-engine shutdown complete"
    );
    Ok(())
}

/// Load the session configuration.
///
/// Uses the path given as the first argument, else `downlink-config.yaml`
/// in the working directory, else built-in defaults.
fn load_config() -> Result<GameConfig, EngineError> {
    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        info!(path = %path.display(), "Loading configuration file");
        Ok(GameConfig::from_file(&path)?)
    } else {
        if path != Path::new(DEFAULT_CONFIG_PATH) {
            warn!(path = %path.display(), "Configuration file not found, using defaults");
        }
        Ok(GameConfig::parse("")?)
    }
}

/// Log what a save would contain: the machine and the live connection.
fn log_saved_records(session: &Session) -> Result<(), EngineError> {
    let machine = serde_json::to_string(&session.machine().to_record())?;
    info!(record = %machine, "Machine record");
    for target in session.targets() {
        let connection = target.connection().or_else(|| target.previous_connection());
        if let Some(connection) = connection {
            let record = serde_json::to_string(&connection.to_record())?;
            info!(target_hop = %target.hop(), record = %record, "Connection record");
        }
    }
    Ok(())
}

/// Logs noteworthy ticks at `info` and the rest at `debug`.
struct LoggingCallback;

impl TickCallback for LoggingCallback {
    fn on_tick(&mut self, summary: &TickSummary, session: &Session) {
        let noteworthy = !summary.completed_tasks.is_empty()
            || !summary.accessed.is_empty()
            || !summary.detected.is_empty();
        let traced = session
            .targets()
            .iter()
            .filter_map(|t| t.connection())
            .map(|c| c.steps_traced())
            .max()
            .unwrap_or(0);
        if noteworthy {
            info!(
                tick = summary.tick,
                completed = summary.completed_tasks.len(),
                accessed = summary.accessed.len(),
                detected = summary.detected.len(),
                earned = %summary.earned,
                currency = %summary.currency,
                running = summary.running_tasks,
                steps_traced = traced,
                "Tick"
            );
        } else {
            debug!(
                tick = summary.tick,
                running = summary.running_tasks,
                load = %summary.load,
                steps_traced = traced,
                "Tick"
            );
        }
    }
}

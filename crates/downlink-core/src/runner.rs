//! Session loop runner.
//!
//! [`run_session`] drives [`Session::tick`] until a stop condition is met,
//! sleeping for the configured interval between ticks. Ticks never overlap:
//! the loop awaits only between passes.
//!
//! The run ends when:
//!
//! - a target detects the player,
//! - every target has been accessed, or
//! - `max_ticks` ticks have run (zero means unbounded).

use std::time::Duration;

use tracing::{info, warn};

use crate::session::{Session, SessionError, TickSummary};

/// Errors that can occur during the session run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying session error.
        #[from]
        source: SessionError,
    },
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEndReason {
    /// A target traced the connection back to the player.
    Detected,
    /// Every target was broken into.
    AllTargetsAccessed,
    /// The tick limit was reached.
    MaxTicksReached,
}

/// Result of a session run.
#[derive(Debug)]
pub struct SessionResult {
    /// The reason the run ended.
    pub end_reason: SessionEndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Total number of ticks executed.
    pub total_ticks: u64,
}

/// Callback invoked after each tick completes.
pub trait TickCallback: Send {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, session: &Session);
}

/// A no-op tick callback for testing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _session: &Session) {}
}

/// Run the session loop until a stop condition is met.
///
/// Tick interval and limit come from the session's `world` config.
///
/// # Errors
///
/// Returns [`RunnerError`] if a tick fails.
pub async fn run_session(
    session: &mut Session,
    callback: &mut dyn TickCallback,
) -> Result<SessionResult, RunnerError> {
    let max_ticks = session.config().world.max_ticks;
    let interval_ms = session.config().world.tick_interval_ms;
    let mut total_ticks: u64 = 0;

    info!(max_ticks, tick_interval_ms = interval_ms, "Session loop starting");

    loop {
        let summary = session.tick()?;
        total_ticks = total_ticks.saturating_add(1);
        callback.on_tick(&summary, session);

        let end_reason = if session.player_detected() {
            Some(SessionEndReason::Detected)
        } else if session.all_targets_accessed() {
            Some(SessionEndReason::AllTargetsAccessed)
        } else if max_ticks > 0 && total_ticks >= max_ticks {
            Some(SessionEndReason::MaxTicksReached)
        } else {
            None
        };

        if let Some(end_reason) = end_reason {
            info!(tick = summary.tick, reason = ?end_reason, "Session loop stopping");
            return Ok(SessionResult {
                end_reason,
                final_summary: Some(summary),
                total_ticks,
            });
        }

        if interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        }
    }
}

/// Log the end of a run.
pub fn log_session_end(result: &SessionResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        "Session ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            running_tasks = summary.running_tasks,
            load = %summary.load,
            free_cycles = %summary.free_cycles,
            currency = %summary.currency,
            "Final tick summary"
        );
    } else {
        warn!("Session ended with no ticks executed");
    }
}

//! Error types for the engine binary.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: downlink_core::config::ConfigError,
    },

    /// Building or driving the session failed.
    #[error("session error: {source}")]
    Session {
        /// The underlying session error.
        #[from]
        source: downlink_core::session::SessionError,
    },

    /// The session loop failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: downlink_core::runner::RunnerError,
    },

    /// Generating a challenge failed.
    #[error("scenario error: {source}")]
    Scenario {
        /// The underlying scheduler error.
        #[from]
        source: downlink_sched::SchedError,
    },

    /// Serializing a saved record failed.
    #[error("serialization error: {source}")]
    Serialize {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}

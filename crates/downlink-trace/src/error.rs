//! Error types for the `downlink-trace` crate.

use downlink_types::{HopId, HopKind};

/// Errors that can occur while building or driving a connection.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// The hop cannot sit in the middle of a connection.
    #[error("hop {hop} of kind {kind:?} cannot be an intermediate hop")]
    InvalidHopType {
        /// The rejected hop.
        hop: HopId,
        /// Its kind.
        kind: HopKind,
    },

    /// The hop is not part of the connection, or not in the registry.
    #[error("hop not found: {0}")]
    HopNotFound(HopId),

    /// The connection's step chain is built and its route can no longer
    /// change.
    #[error("connection {connection} is locked: its trace chain is already built")]
    ChainLocked {
        /// Name of the connection.
        connection: String,
    },
}

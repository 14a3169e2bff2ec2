//! Connection tracing for the Downlink simulation core.
//!
//! A [`Connection`] routes the player through a list of hops held in a
//! [`HopRegistry`]. Once a trace starts, the route becomes a chain of
//! [`ConnectionStep`]s that fill up one quantum at a time, target first,
//! until the player is detected.
//!
//! # Modules
//!
//! - [`hop`] -- The hop contract, computers, and the network registry
//! - [`step`] -- A single leg of the trace chain
//! - [`connection`] -- Route editing, the trace chain, open and close
//! - [`error`] -- Error types

pub mod connection;
pub mod error;
pub mod hop;
pub mod step;

pub use connection::{
    Connection, ConnectionEvent, DEFAULT_CONNECTION_DISTANCE, DEFAULT_SENSITIVITY,
};
pub use error::TraceError;
pub use hop::{Computer, Hop, HopRegistry, Network, random_address};
pub use step::{ConnectionStep, StepEvent};

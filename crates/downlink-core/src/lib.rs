//! Session orchestration for the Downlink simulation core.
//!
//! This crate ties the scheduler and the tracer into a playable session:
//! one tick cracks challenges on the player's machine, and then alerted
//! targets trace back along the player's connection.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `downlink-config.yaml`
//! - [`clock`] -- The game tick counter
//! - [`target`] -- Mission targets with alarm, access, and trace-back
//! - [`session`] -- World state and the single tick pass
//! - [`runner`] -- The async bounded session loop

pub mod clock;
pub mod config;
pub mod runner;
pub mod session;
pub mod target;

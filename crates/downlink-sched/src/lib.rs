//! CPU pool scheduling for the Downlink simulation core.
//!
//! A [`CpuPool`] shares the cycles of its [`ComputeUnit`]s among running
//! [`Task`]s. Each task is bound to a [`Challenge`] and spends its cycles
//! through a [`Cracker`] chosen by the challenge's kind. Every call to
//! [`CpuPool::tick`] is one synchronous quantum of progress.
//!
//! # Modules
//!
//! - [`challenge`] -- Passwords, encryption grids, generators, registry
//! - [`task`] -- The task contract and cycle bookkeeping
//! - [`crackers`] -- Dictionary, sequential and encryption progress logic
//! - [`unit`] -- Compute units
//! - [`pool`] -- Admission, release and the tick pass
//! - [`machine`] -- The player's home machine
//! - [`error`] -- Error types

pub mod challenge;
pub mod crackers;
pub mod error;
pub mod machine;
pub mod pool;
pub mod task;
pub mod unit;

pub use challenge::{Alphabet, Challenge, ChallengeEvent, ChallengeKind, ChallengeRegistry, Dictionary};
pub use crackers::{Cracker, DictionaryCracker, EncryptionCracker, SequentialAttacker};
pub use error::SchedError;
pub use machine::PlayerMachine;
pub use pool::{CpuPool, PoolEvent};
pub use task::{Task, TaskEvent};
pub use unit::ComputeUnit;

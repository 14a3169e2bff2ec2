//! Shared type definitions for the Downlink simulation core.
//!
//! This crate holds the identifiers, enums, and persisted record formats
//! used by the scheduler and tracer crates. Types flow to `TypeScript` via
//! `ts-rs` for the browser front end.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for tasks, challenges, units, hops
//! - [`enums`] -- Step states, password kinds, encryption tiers, hop kinds
//! - [`structs`] -- Map points and persisted records

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{EncryptionTier, HopKind, PasswordKind, StepState};
pub use ids::{ChallengeId, HopId, TaskId, UnitId};
pub use structs::{ConnectionRecord, MachineRecord, Point, UnitRecord};

#[cfg(test)]
mod tests {
    //! Binding generation for the front end.

    #[test]
    fn export_bindings() {
        // ts-rs writes the bindings to `bindings/` relative to the crate
        // root when `export_all` runs.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::TaskId::export_all();
        let _ = crate::ids::ChallengeId::export_all();
        let _ = crate::ids::UnitId::export_all();
        let _ = crate::ids::HopId::export_all();

        // Enums
        let _ = crate::enums::StepState::export_all();
        let _ = crate::enums::PasswordKind::export_all();
        let _ = crate::enums::EncryptionTier::export_all();
        let _ = crate::enums::HopKind::export_all();

        // Structs
        let _ = crate::structs::Point::export_all();
        let _ = crate::structs::UnitRecord::export_all();
        let _ = crate::structs::MachineRecord::export_all();
        let _ = crate::structs::ConnectionRecord::export_all();
    }
}

//! Plain data structs: map points and the persisted record formats.
//!
//! Only structural identity is persisted. A connection record carries its
//! name and hop identities but never trace progress, so reloading a game
//! always starts hop tracing fresh.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::HopId;

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// A 2D point on the world map, used by consumers that render paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Point {
    /// Horizontal map coordinate.
    pub x: i32,
    /// Vertical map coordinate.
    pub y: i32,
}

impl Point {
    /// Create a point from its coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

/// Persisted form of a compute unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct UnitRecord {
    /// Display name of the unit.
    pub name: String,
    /// Cycles per tick the unit contributes to its pool.
    #[ts(as = "String")]
    pub speed: Decimal,
}

/// Persisted form of the player's machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MachineRecord {
    /// Display name of the machine.
    pub name: String,
    /// Network address of the machine.
    pub address: String,
    /// Map location, if one has been assigned.
    pub location: Option<Point>,
    /// Installed compute units, in slot order.
    pub units: Vec<UnitRecord>,
}

/// Persisted form of a connection: its name and ordered hop identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ConnectionRecord {
    /// Display name of the connection.
    pub name: String,
    /// Identities of the intermediate hops, in route order.
    pub hop_ids: Vec<HopId>,
}

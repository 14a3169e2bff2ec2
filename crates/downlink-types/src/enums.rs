//! Enumeration types shared between the scheduler, the tracer, and the UI.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Trace state
// ---------------------------------------------------------------------------

/// Progress state of a single hop in a connection's trace chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum StepState {
    /// No trace amount has been applied yet.
    Pristine,
    /// Some trace amount has been applied but the distance is not reached.
    Tracing,
    /// The step's distance has been reached. Further amounts are ignored.
    Traced,
}

// ---------------------------------------------------------------------------
// Challenges
// ---------------------------------------------------------------------------

/// The flavour of a password challenge, which decides the cracker used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum PasswordKind {
    /// A word drawn from the dictionary. Cracked by a dictionary attack.
    Dictionary,
    /// A random alphanumeric string. Cracked by sequential brute force.
    Alphanumeric,
}

impl PasswordKind {
    /// Human-readable label used in challenge names.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Dictionary => "Dictionary",
            Self::Alphanumeric => "Alphanumeric",
        }
    }
}

/// Encryption difficulty tiers.
///
/// Each tier bounds the random grid dimensions of a generated encryption:
///
/// | Tier      | Size range (min inclusive, max exclusive) |
/// |-----------|-------------------------------------------|
/// | Linear    | 7..11                                     |
/// | Quadratic | 10..15                                    |
/// | Cubic     | 15..20                                    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum EncryptionTier {
    /// Easy encryption.
    Linear,
    /// Medium encryption.
    Quadratic,
    /// Hard encryption.
    Cubic,
}

impl EncryptionTier {
    /// Human-readable label used in challenge names.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Linear => "Linear",
            Self::Quadratic => "Quadratic",
            Self::Cubic => "Cubic",
        }
    }

    /// Grid dimension bounds `(min, max)` with `max` exclusive.
    pub const fn size_range(self) -> (u32, u32) {
        match self {
            Self::Linear => (7, 11),
            Self::Quadratic => (10, 15),
            Self::Cubic => (15, 20),
        }
    }
}

// ---------------------------------------------------------------------------
// Hops
// ---------------------------------------------------------------------------

/// What kind of machine a hop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum HopKind {
    /// A company's public-facing server.
    Public,
    /// A server that is the target of a mission.
    Mission,
    /// The player's own machine. Only valid as a connection's start point.
    Player,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ranges_are_non_empty() {
        for tier in [EncryptionTier::Linear, EncryptionTier::Quadratic, EncryptionTier::Cubic] {
            let (min, max) = tier.size_range();
            assert!(min < max, "{tier:?} has an empty range");
        }
    }

    #[test]
    fn step_state_serializes_as_name() {
        let json = serde_json::to_string(&StepState::Tracing).ok();
        assert_eq!(json.as_deref(), Some("\"Tracing\""));
    }
}

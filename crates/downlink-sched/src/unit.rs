//! Compute units: the processors whose speeds make up a pool's budget.

use rust_decimal::Decimal;

use downlink_types::{UnitId, UnitRecord};

/// Name of the stock processor.
pub const DEFAULT_UNIT_NAME: &str = "Garbo Processor";

/// Speed of the stock processor, in cycles per tick.
pub const DEFAULT_UNIT_SPEED: u32 = 20;

/// A processor contributing a fixed number of cycles per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeUnit {
    id: UnitId,
    name: String,
    speed: Decimal,
    ticks_run: u64,
}

impl ComputeUnit {
    /// Create a unit with the given name and speed.
    pub fn new(name: impl Into<String>, speed: Decimal) -> Self {
        Self {
            id: UnitId::new(),
            name: name.into(),
            speed,
            ticks_run: 0,
        }
    }

    /// The stock processor.
    pub fn standard() -> Self {
        Self::new(DEFAULT_UNIT_NAME, Decimal::from(DEFAULT_UNIT_SPEED))
    }

    /// Restore a unit from its persisted form. A fresh id is assigned.
    pub fn from_record(record: &UnitRecord) -> Self {
        Self::new(record.name.clone(), record.speed)
    }

    /// Persisted form: name and speed only.
    pub fn to_record(&self) -> UnitRecord {
        UnitRecord {
            name: self.name.clone(),
            speed: self.speed,
        }
    }

    /// Count one tick of operation.
    pub const fn tick(&mut self) {
        self.ticks_run = self.ticks_run.saturating_add(1);
    }

    /// The unit's identifier.
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cycles per tick.
    pub const fn speed(&self) -> Decimal {
        self.speed
    }

    /// Ticks run so far.
    pub const fn ticks_run(&self) -> u64 {
        self.ticks_run
    }
}

impl Default for ComputeUnit {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn standard_unit_is_a_garbo_processor() {
        let unit = ComputeUnit::standard();
        assert_eq!(unit.name(), "Garbo Processor");
        assert_eq!(unit.speed(), dec!(20));
        assert_eq!(unit.ticks_run(), 0);
    }

    #[test]
    fn record_keeps_name_and_speed() {
        let mut unit = ComputeUnit::new("Turbo", dec!(45.5));
        unit.tick();
        let restored = ComputeUnit::from_record(&unit.to_record());
        assert_eq!(restored.name(), "Turbo");
        assert_eq!(restored.speed(), dec!(45.5));
        assert_eq!(restored.ticks_run(), 0);
        assert_ne!(restored.id(), unit.id());
    }
}

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const METERS_PER_KILOMETER: f64 = 1000.0;
pub const METERS_PER_MILE: f64 = 1609.344;
pub const SECONDS_PER_MINUTE: f64 = 60.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceUnit {
    Meters,
    #[default]
    Kilometers,
    Miles,
}

impl DistanceUnit {
    pub fn meters_per_unit(&self) -> f64 {
        match self {
            DistanceUnit::Meters => 1.0,
            DistanceUnit::Kilometers => METERS_PER_KILOMETER,
            DistanceUnit::Miles => METERS_PER_MILE,
        }
    }

    pub fn convert_meters(&self, meters: f64) -> f64 {
        meters / self.meters_per_unit()
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            DistanceUnit::Meters => "m",
            DistanceUnit::Kilometers => "km",
            DistanceUnit::Miles => "mi",
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaceUnit {
    #[default]
    MinutesPerMile,
    MinutesPerKilometer,
    SecondsPerKilometer,
}

impl PaceUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            PaceUnit::MinutesPerMile => "min/mi",
            PaceUnit::MinutesPerKilometer => "min/km",
            PaceUnit::SecondsPerKilometer => "s/km",
        }
    }
}

/// Time needed per unit of distance, stored as seconds per meter.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pace {
    seconds_per_meter: f64,
}

impl Pace {
    /// `None` when no distance has been covered yet.
    pub fn from_run(distance_meters: f64, elapsed_seconds: u64) -> Option<Pace> {
        if !distance_meters.is_finite() || distance_meters <= 0.0 {
            return None;
        }

        Some(Pace {
            seconds_per_meter: elapsed_seconds as f64 / distance_meters,
        })
    }

    pub fn seconds_per_meter(&self) -> f64 {
        self.seconds_per_meter
    }

    pub fn in_unit(&self, unit: PaceUnit) -> f64 {
        match unit {
            PaceUnit::MinutesPerMile => self.seconds_per_meter * METERS_PER_MILE / SECONDS_PER_MINUTE,
            PaceUnit::MinutesPerKilometer => self.seconds_per_meter * METERS_PER_KILOMETER / SECONDS_PER_MINUTE,
            PaceUnit::SecondsPerKilometer => self.seconds_per_meter * METERS_PER_KILOMETER,
        }
    }
}

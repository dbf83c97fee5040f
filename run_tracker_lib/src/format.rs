//! Display strings for the values shown while running.

use crate::pace::{DistanceUnit, Pace, PaceUnit};

pub const NO_PACE: &str = "--:--";

pub fn format_distance(meters: f64, unit: DistanceUnit) -> String {
    let value = unit.convert_meters(meters.max(0.0));
    match unit {
        DistanceUnit::Meters => format!("{:.0} {}", value, unit.symbol()),
        _ => format!("{:.2} {}", value, unit.symbol()),
    }
}

/// `H:MM:SS`
pub fn format_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}

pub fn format_pace(pace: Option<Pace>, unit: PaceUnit) -> String {
    let Some(value) = pace.map(|pace| pace.in_unit(unit)).filter(|value| value.is_finite()) else {
        return NO_PACE.to_string();
    };

    match unit {
        PaceUnit::SecondsPerKilometer => format!("{:.0} {}", value, unit.symbol()),
        PaceUnit::MinutesPerMile | PaceUnit::MinutesPerKilometer => {
            let total_seconds = (value * 60.0).round() as u64;
            format!("{}:{:02} {}", total_seconds / 60, total_seconds % 60, unit.symbol())
        }
    }
}

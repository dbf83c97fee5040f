use std::{path::Path, str::FromStr};

use chrono::TimeDelta;
use run_tracker_lib::{
    accumulator::{AccumulatorSettings, SampleFilter, DEFAULT_FOLLOW_REGION_METERS, DEFAULT_MAX_HORIZONTAL_ACCURACY, DEFAULT_MAX_SAMPLE_AGE_SECS},
    pace::{DistanceUnit, PaceUnit},
    route::SegmentColor,
};

use crate::{run_session::SessionSettings, TrackerError, DEFAULT_CONFIG_PATH};

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub max_horizontal_accuracy: f64,
    pub max_sample_age_secs: i64,
    pub follow_region_meters: f64,
    pub initial_region_meters: f64,
    pub distance_unit: DistanceUnit,
    pub pace_unit: PaceUnit,
    pub segment_color: SegmentColor,

    // Replay only
    pub default_accuracy: f64,
    pub replay_speed: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_horizontal_accuracy: DEFAULT_MAX_HORIZONTAL_ACCURACY,
            max_sample_age_secs: DEFAULT_MAX_SAMPLE_AGE_SECS,
            follow_region_meters: DEFAULT_FOLLOW_REGION_METERS,
            initial_region_meters: 1000.0,
            distance_unit: DistanceUnit::Kilometers,
            pace_unit: PaceUnit::MinutesPerKilometer,
            segment_color: SegmentColor::BLUE,
            default_accuracy: 5.0,
            replay_speed: 1.0,
        }
    }
}

impl TrackerConfig {
    /// Parses `key = value` lines. Blank lines and lines starting with `#` are skipped.
    pub fn parse(text: &str) -> Result<Self, TrackerError> {
        let mut config = TrackerConfig::default();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(TrackerError::Config(format!("Line {} is not a key = value pair: {:?}", number + 1, line)));
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "max_horizontal_accuracy" => config.max_horizontal_accuracy = positive(key, value)?,
                "max_sample_age_secs" => {
                    let seconds = parse_value::<u32>(key, value)?;
                    if seconds == 0 {
                        return Err(TrackerError::Config("max_sample_age_secs must be above 0".to_string()));
                    }
                    config.max_sample_age_secs = seconds as i64;
                },
                "follow_region_meters" => config.follow_region_meters = positive(key, value)?,
                "initial_region_meters" => config.initial_region_meters = positive(key, value)?,
                "distance_unit" => config.distance_unit = parse_distance_unit(value)?,
                "pace_unit" => config.pace_unit = parse_pace_unit(value)?,
                "segment_color" => {
                    config.segment_color = SegmentColor::from_hex(value)
                        .ok_or(TrackerError::Config(format!("segment_color must be #rrggbb, got {:?}", value)))?;
                },
                "default_accuracy" => config.default_accuracy = positive(key, value)?,
                "replay_speed" => config.replay_speed = positive(key, value)?,
                _ => {
                    tracing::warn!("Unknown config key: {}", key);
                }
            }
        }

        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, TrackerError> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| TrackerError::Config(format!("Failed to read config file {:?}: {}", path, err)))?;
        tracing::debug!("Loaded config from {:?}", path);
        Self::parse(&text)
    }

    /// An explicit path must exist. Without one the default path is tried, then built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, TrackerError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            Self::load(default_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn accumulator_settings(&self) -> AccumulatorSettings {
        AccumulatorSettings {
            filter: SampleFilter {
                max_horizontal_accuracy: self.max_horizontal_accuracy,
                max_age: TimeDelta::seconds(self.max_sample_age_secs),
            },
            segment_color: self.segment_color,
            follow_region_meters: self.follow_region_meters,
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            accumulator: self.accumulator_settings(),
            initial_region_meters: self.initial_region_meters,
        }
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, TrackerError> {
    value.parse::<T>()
        .map_err(|_| TrackerError::Config(format!("Invalid value for {}: {:?}", key, value)))
}

fn positive(key: &str, value: &str) -> Result<f64, TrackerError> {
    let number = parse_value::<f64>(key, value)?;
    if !number.is_finite() || number <= 0.0 {
        return Err(TrackerError::Config(format!("{} must be a positive number, got {}", key, value)));
    }
    Ok(number)
}

fn parse_distance_unit(value: &str) -> Result<DistanceUnit, TrackerError> {
    match value {
        "m" | "meters" => Ok(DistanceUnit::Meters),
        "km" | "kilometers" => Ok(DistanceUnit::Kilometers),
        "mi" | "miles" => Ok(DistanceUnit::Miles),
        _ => Err(TrackerError::Config(format!("Unknown distance unit: {:?}", value))),
    }
}

fn parse_pace_unit(value: &str) -> Result<PaceUnit, TrackerError> {
    match value {
        "min/mi" => Ok(PaceUnit::MinutesPerMile),
        "min/km" => Ok(PaceUnit::MinutesPerKilometer),
        "s/km" => Ok(PaceUnit::SecondsPerKilometer),
        _ => Err(TrackerError::Config(format!("Unknown pace unit: {:?}", value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_file() {
        let config = TrackerConfig::parse("
            # Filter
            max_horizontal_accuracy = 15
            max_sample_age_secs = 5

            follow_region_meters = 250
            initial_region_meters=2000
            distance_unit = mi
            pace_unit = min/mi
            segment_color = #ff0000
            default_accuracy = 3.5
            replay_speed = 10
            some_future_key = 1
        ").unwrap();

        assert_eq!(config.max_horizontal_accuracy, 15.0);
        assert_eq!(config.max_sample_age_secs, 5);
        assert_eq!(config.follow_region_meters, 250.0);
        assert_eq!(config.initial_region_meters, 2000.0);
        assert_eq!(config.distance_unit, DistanceUnit::Miles);
        assert_eq!(config.pace_unit, PaceUnit::MinutesPerMile);
        assert_eq!(config.segment_color, SegmentColor::rgb(255, 0, 0));
        assert_eq!(config.default_accuracy, 3.5);
        assert_eq!(config.replay_speed, 10.0);

        let settings = config.accumulator_settings();
        assert_eq!(settings.filter.max_age, TimeDelta::seconds(5));
        assert_eq!(settings.follow_region_meters, 250.0);
    }

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(TrackerConfig::parse("\n# nothing here\n").unwrap(), TrackerConfig::default());
    }

    #[test]
    fn defaults_match_the_filter_rules() {
        let settings = TrackerConfig::default().accumulator_settings();
        assert_eq!(settings.filter, SampleFilter::default());
    }

    #[test]
    fn malformed_values_are_errors() {
        for text in [
            "max_horizontal_accuracy = twenty",
            "max_horizontal_accuracy = -3",
            "max_sample_age_secs = -1",
            "max_sample_age_secs = 0",
            "distance_unit = furlongs",
            "pace_unit = min/furlong",
            "segment_color = blue",
            "replay_speed = 0",
            "just some words",
        ] {
            assert!(matches!(TrackerConfig::parse(text), Err(TrackerError::Config(_))), "{text} should be rejected");
        }
    }
}

use chrono::{DateTime, Utc};
use geo_types::{Coord, Point};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One fix reported by the location collaborator.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    /// x = longitude, y = latitude
    pub position: Point,
    pub timestamp: DateTime<Utc>,
    /// Radius of uncertainty in meters. Negative means the fix is invalid.
    pub horizontal_accuracy: f64,
}

impl PositionSample {
    pub fn new(latitude: f64, longitude: f64, horizontal_accuracy: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            position: Point::new(longitude, latitude),
            timestamp,
            horizontal_accuracy,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.position.y()
    }

    pub fn longitude(&self) -> f64 {
        self.position.x()
    }

    pub fn coordinate(&self) -> Coord {
        self.position.0
    }

    /// Same fix, observed at a different time.
    pub fn restamped(&self, timestamp: DateTime<Utc>) -> Self {
        Self { timestamp, ..*self }
    }

    pub(crate) fn has_valid_coordinate(&self) -> bool {
        let (lat, lon) = (self.latitude(), self.longitude());
        lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
    }
}

#[test]
fn coordinate_order() {
    let sample = PositionSample::new(56.15, 10.2, 5.0, Utc::now());
    assert_eq!(sample.latitude(), 56.15);
    assert_eq!(sample.longitude(), 10.2);
    assert_eq!(sample.coordinate(), Coord { x: 10.2, y: 56.15 });
}

#[test]
fn rejects_out_of_range_coordinates() {
    let now = Utc::now();
    assert!(PositionSample::new(0.0, 0.0, 5.0, now).has_valid_coordinate());
    assert!(!PositionSample::new(91.0, 0.0, 5.0, now).has_valid_coordinate());
    assert!(!PositionSample::new(0.0, -180.5, 5.0, now).has_valid_coordinate());
    assert!(!PositionSample::new(f64::NAN, 0.0, 5.0, now).has_valid_coordinate());
}

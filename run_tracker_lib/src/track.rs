use chrono::{DateTime, Utc};
use geo::{Distance, Haversine};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::track_point::PositionSample;

/// Accepted samples of the current run, with the running totals derived from them.
#[derive(Debug, Clone, Default)]
pub struct Track {
    points: Vec<PositionSample>,
    distance_meters: f64,
    elapsed_seconds: u64,
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[PositionSample] {
        &self.points
    }

    pub fn last_point(&self) -> Option<&PositionSample> {
        self.points.last()
    }

    pub fn distance_meters(&self) -> f64 {
        self.distance_meters
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Appends an accepted sample and returns the distance it added.
    pub(crate) fn push(&mut self, sample: PositionSample) -> f64 {
        let delta = self.last_point()
            .map(|last| Haversine.distance(last.position, sample.position))
            .unwrap_or(0.0);

        self.distance_meters += delta;
        self.points.push(sample);
        delta
    }

    pub(crate) fn add_seconds(&mut self, seconds: u64) {
        self.elapsed_seconds = self.elapsed_seconds.saturating_add(seconds);
    }

    pub(crate) fn clear(&mut self) {
        self.points.clear();
        self.distance_meters = 0.0;
        self.elapsed_seconds = 0;
    }

    pub(crate) fn finish(&mut self) -> CompletedRun {
        let track = std::mem::take(self);
        CompletedRun {
            started_at: track.points.first().map(|point| point.timestamp),
            distance_meters: track.distance_meters,
            duration_seconds: track.elapsed_seconds,
            path: track.points,
        }
    }
}

/// What a finished run hands over for storage.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRun {
    pub started_at: Option<DateTime<Utc>>,
    pub distance_meters: f64,
    pub duration_seconds: u64,
    pub path: Vec<PositionSample>,
}

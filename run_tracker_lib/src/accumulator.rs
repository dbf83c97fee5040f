use chrono::{DateTime, TimeDelta, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    pace::{Pace, PaceUnit},
    route::{MapRegion, RouteSegment, SegmentColor},
    track::{CompletedRun, Track},
    track_point::PositionSample,
};

pub const DEFAULT_MAX_HORIZONTAL_ACCURACY: f64 = 20.0; // meters
pub const DEFAULT_MAX_SAMPLE_AGE_SECS: i64 = 10;
pub const DEFAULT_FOLLOW_REGION_METERS: f64 = 500.0;

/// Decides whether a sample is good enough to become part of the track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleFilter {
    /// Samples must be strictly more accurate than this.
    pub max_horizontal_accuracy: f64,
    /// Samples must be strictly younger (or less far in the future) than this.
    pub max_age: TimeDelta,
}

impl Default for SampleFilter {
    fn default() -> Self {
        Self {
            max_horizontal_accuracy: DEFAULT_MAX_HORIZONTAL_ACCURACY,
            max_age: TimeDelta::seconds(DEFAULT_MAX_SAMPLE_AGE_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Inaccurate,
    Stale,
    InvalidFix,
}

impl SampleFilter {
    pub fn check(&self, sample: &PositionSample, now: DateTime<Utc>) -> Result<(), RejectReason> {
        let accuracy = sample.horizontal_accuracy;
        if !accuracy.is_finite() || accuracy < 0.0 || !sample.has_valid_coordinate() {
            return Err(RejectReason::InvalidFix);
        }

        if accuracy >= self.max_horizontal_accuracy {
            return Err(RejectReason::Inaccurate);
        }

        let age_millis = (now - sample.timestamp).num_milliseconds().unsigned_abs();
        if age_millis >= self.max_age.num_milliseconds().unsigned_abs() {
            return Err(RejectReason::Stale);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccumulatorSettings {
    pub filter: SampleFilter,
    pub segment_color: SegmentColor,
    pub follow_region_meters: f64,
}

impl Default for AccumulatorSettings {
    fn default() -> Self {
        Self {
            filter: SampleFilter::default(),
            segment_color: SegmentColor::default(),
            follow_region_meters: DEFAULT_FOLLOW_REGION_METERS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IngestOutcome {
    /// No run is active, the sample was ignored.
    Inactive,
    Rejected(RejectReason),
    /// First accepted sample of the run.
    Seeded,
    Extended {
        segment: RouteSegment,
        region: MapRegion,
        delta_meters: f64,
    },
}

impl IngestOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, IngestOutcome::Seeded | IngestOutcome::Extended { .. })
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackSnapshot {
    pub distance_meters: f64,
    pub elapsed_seconds: u64,
    /// `None` until some distance has been covered.
    pub pace: Option<Pace>,
}

impl TrackSnapshot {
    pub fn from_totals(distance_meters: f64, elapsed_seconds: u64) -> Self {
        Self {
            distance_meters,
            elapsed_seconds,
            pace: Pace::from_run(distance_meters, elapsed_seconds),
        }
    }

    /// The final values of a stopped run.
    pub fn of_run(run: &CompletedRun) -> Self {
        Self::from_totals(run.distance_meters, run.duration_seconds)
    }

    pub fn pace_in(&self, unit: PaceUnit) -> Option<f64> {
        self.pace.map(|pace| pace.in_unit(unit))
    }
}

/// Turns the raw sample stream of one run into a track and its metrics.
///
/// Idle until [`TrackAccumulator::reset`] starts a run; while idle both
/// samples and ticks are ignored.
#[derive(Debug, Clone, Default)]
pub struct TrackAccumulator {
    settings: AccumulatorSettings,
    track: Track,
    active: bool,
}

impl TrackAccumulator {
    pub fn new(settings: AccumulatorSettings) -> Self {
        Self {
            settings,
            track: Track::new(),
            active: false,
        }
    }

    pub fn settings(&self) -> &AccumulatorSettings {
        &self.settings
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Starts a fresh run, dropping anything left from a previous one.
    pub fn reset(&mut self) {
        self.track.clear();
        self.active = true;
    }

    /// Ends the run. Returns `None` if no run was active.
    pub fn stop(&mut self) -> Option<CompletedRun> {
        if !self.active {
            return None;
        }

        self.active = false;
        Some(self.track.finish())
    }

    pub fn ingest(&mut self, sample: PositionSample) -> IngestOutcome {
        self.ingest_at(sample, Utc::now())
    }

    pub fn ingest_at(&mut self, sample: PositionSample, now: DateTime<Utc>) -> IngestOutcome {
        if !self.active {
            return IngestOutcome::Inactive;
        }

        if let Err(reason) = self.settings.filter.check(&sample, now) {
            return IngestOutcome::Rejected(reason);
        }

        let previous = self.track.last_point().map(|point| point.coordinate());
        let delta_meters = self.track.push(sample);

        match previous {
            None => IngestOutcome::Seeded,
            Some(start) => IngestOutcome::Extended {
                segment: RouteSegment {
                    start,
                    end: sample.coordinate(),
                    color: self.settings.segment_color,
                },
                region: MapRegion::square(sample.coordinate(), self.settings.follow_region_meters),
                delta_meters,
            },
        }
    }

    pub fn tick(&mut self) {
        self.advance_seconds(1);
    }

    /// Same as `seconds` ticks.
    pub fn advance_seconds(&mut self, seconds: u64) {
        if self.active {
            self.track.add_seconds(seconds);
        }
    }

    pub fn snapshot(&self) -> TrackSnapshot {
        TrackSnapshot::from_totals(self.track.distance_meters(), self.track.elapsed_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Distance, Haversine};

    const EARTH_RADIUS_METERS: f64 = 6_371_008.8;
    const ORIGIN: (f64, f64) = (56.1572, 10.2107);

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    /// A fresh, accurate sample `meters` due north of the origin.
    fn north_of_origin(meters: f64) -> PositionSample {
        let latitude = ORIGIN.0 + (meters / EARTH_RADIUS_METERS).to_degrees();
        PositionSample::new(latitude, ORIGIN.1, 5.0, now())
    }

    fn active() -> TrackAccumulator {
        let mut accumulator = TrackAccumulator::default();
        accumulator.reset();
        accumulator
    }

    #[test]
    fn inaccurate_samples_leave_state_untouched() {
        let mut accumulator = active();
        accumulator.ingest_at(north_of_origin(0.0), now());
        accumulator.tick();
        let before = accumulator.snapshot();

        for accuracy in [20.0, 20.5, 25.0, 1000.0] {
            let sample = PositionSample { horizontal_accuracy: accuracy, ..north_of_origin(80.0) };
            assert_eq!(accumulator.ingest_at(sample, now()), IngestOutcome::Rejected(RejectReason::Inaccurate));
        }

        assert_eq!(accumulator.snapshot(), before);
        assert_eq!(accumulator.track().points().len(), 1);
    }

    #[test]
    fn stale_and_future_samples_are_dropped() {
        let mut accumulator = active();

        for offset in [-10, 10, -60, 3600] {
            let sample = north_of_origin(0.0).restamped(now() + TimeDelta::seconds(offset));
            assert_eq!(accumulator.ingest_at(sample, now()), IngestOutcome::Rejected(RejectReason::Stale));
        }
        assert!(accumulator.track().is_empty());

        let almost_stale = north_of_origin(0.0).restamped(now() - TimeDelta::milliseconds(9_999));
        assert_eq!(accumulator.ingest_at(almost_stale, now()), IngestOutcome::Seeded);
    }

    #[test]
    fn malformed_samples_are_filtered() {
        let mut accumulator = active();
        let good = north_of_origin(0.0);

        let malformed = [
            PositionSample { horizontal_accuracy: -1.0, ..good },
            PositionSample { horizontal_accuracy: f64::NAN, ..good },
            PositionSample::new(f64::NAN, 10.0, 5.0, now()),
            PositionSample::new(45.0, 200.0, 5.0, now()),
        ];
        for sample in malformed {
            assert_eq!(accumulator.ingest_at(sample, now()), IngestOutcome::Rejected(RejectReason::InvalidFix));
        }

        assert!(accumulator.track().is_empty());
        assert_eq!(accumulator.snapshot().distance_meters, 0.0);
    }

    #[test]
    fn two_samples_hundred_meters_apart() {
        let mut accumulator = active();
        assert_eq!(accumulator.ingest_at(north_of_origin(0.0), now()), IngestOutcome::Seeded);

        let outcome = accumulator.ingest_at(north_of_origin(100.0), now());
        let IngestOutcome::Extended { segment, region, delta_meters } = outcome else {
            panic!("expected the track to be extended, got {outcome:?}");
        };

        assert!((delta_meters - 100.0).abs() < 0.01);
        assert_eq!(segment.start, north_of_origin(0.0).coordinate());
        assert_eq!(segment.end, north_of_origin(100.0).coordinate());
        assert_eq!(segment.color, SegmentColor::BLUE);
        assert_eq!(region, MapRegion::square(north_of_origin(100.0).coordinate(), 500.0));

        assert!((accumulator.snapshot().distance_meters - 100.0).abs() < 0.01);
        assert_eq!(accumulator.track().points().len(), 2);
    }

    #[test]
    fn rejected_sample_between_valid_ones() {
        let mut accumulator = active();
        accumulator.ingest_at(north_of_origin(0.0), now());

        let sloppy = PositionSample { horizontal_accuracy: 25.0, ..north_of_origin(500.0) };
        assert!(!accumulator.ingest_at(sloppy, now()).is_accepted());

        accumulator.ingest_at(north_of_origin(50.0), now());

        assert!((accumulator.snapshot().distance_meters - 50.0).abs() < 0.01);
        assert_eq!(accumulator.track().points().len(), 2);
    }

    #[test]
    fn single_sample_has_no_distance() {
        let mut accumulator = active();
        accumulator.ingest_at(north_of_origin(0.0), now());

        assert_eq!(accumulator.snapshot().distance_meters, 0.0);
        assert_eq!(accumulator.track().points().len(), 1);
    }

    #[test]
    fn distance_is_sum_of_consecutive_legs() {
        let mut accumulator = active();
        let points = [
            PositionSample::new(56.1572, 10.2107, 4.0, now()),
            PositionSample::new(56.1580, 10.2120, 4.0, now()),
            PositionSample::new(56.1575, 10.2140, 4.0, now()),
            PositionSample::new(56.1590, 10.2150, 4.0, now()),
        ];

        for point in points {
            assert!(accumulator.ingest_at(point, now()).is_accepted());
        }

        let expected: f64 = points
            .windows(2)
            .map(|pair| Haversine.distance(pair[0].position, pair[1].position))
            .sum();

        assert!((accumulator.snapshot().distance_meters - expected).abs() < 1e-6);
    }

    #[test]
    fn reset_clears_everything() {
        let mut accumulator = active();
        accumulator.ingest_at(north_of_origin(0.0), now());
        accumulator.ingest_at(north_of_origin(30.0), now());
        accumulator.tick();

        accumulator.reset();

        let snapshot = accumulator.snapshot();
        assert_eq!(snapshot.distance_meters, 0.0);
        assert_eq!(snapshot.elapsed_seconds, 0);
        assert_eq!(snapshot.pace, None);
        assert!(accumulator.track().is_empty());
        assert!(accumulator.is_active());
    }

    #[test]
    fn ticks_count_independently_of_samples() {
        let mut accumulator = active();

        for i in 0..7 {
            accumulator.tick();
            if i % 2 == 0 {
                accumulator.ingest_at(north_of_origin(i as f64 * 10.0), now());
            }
        }

        assert_eq!(accumulator.snapshot().elapsed_seconds, 7);
    }

    #[test]
    fn no_pace_without_distance() {
        let mut accumulator = active();
        for _ in 0..300 {
            accumulator.tick();
        }

        let snapshot = accumulator.snapshot();
        assert_eq!(snapshot.elapsed_seconds, 300);
        assert_eq!(snapshot.pace, None);
        assert_eq!(snapshot.pace_in(PaceUnit::MinutesPerMile), None);
    }

    #[test]
    fn pace_follows_distance_and_time() {
        let mut accumulator = active();
        accumulator.ingest_at(north_of_origin(0.0), now());
        accumulator.ingest_at(north_of_origin(1000.0), now());
        for _ in 0..300 {
            accumulator.tick();
        }

        let pace = accumulator.snapshot().pace_in(PaceUnit::MinutesPerKilometer).unwrap();
        assert!((pace - 5.0).abs() < 1e-3);
    }

    #[test]
    fn idle_accumulator_ignores_input() {
        let mut accumulator = TrackAccumulator::default();
        assert_eq!(accumulator.ingest_at(north_of_origin(0.0), now()), IngestOutcome::Inactive);
        accumulator.tick();
        assert_eq!(accumulator.snapshot(), TrackSnapshot::default());
        assert_eq!(accumulator.stop(), None);
    }

    #[test]
    fn advancing_matches_ticking() {
        let mut ticked = active();
        let mut advanced = active();
        for accumulator in [&mut ticked, &mut advanced] {
            accumulator.ingest_at(north_of_origin(0.0), now());
            accumulator.ingest_at(north_of_origin(400.0), now());
        }

        for _ in 0..90 {
            ticked.tick();
        }
        advanced.advance_seconds(90);
        assert_eq!(ticked.snapshot(), advanced.snapshot());

        let mut idle = TrackAccumulator::default();
        idle.advance_seconds(u64::MAX);
        assert_eq!(idle.snapshot(), TrackSnapshot::default());
    }

    #[test]
    fn stop_hands_over_the_run() {
        let mut accumulator = active();
        accumulator.ingest_at(north_of_origin(0.0), now());
        accumulator.ingest_at(north_of_origin(100.0), now());
        accumulator.tick();
        accumulator.tick();

        let last = accumulator.snapshot();
        let run = accumulator.stop().unwrap();
        assert_eq!(TrackSnapshot::of_run(&run), last);
        assert_eq!(run.path.len(), 2);
        assert_eq!(run.duration_seconds, 2);
        assert_eq!(run.started_at, Some(now()));
        assert!((run.distance_meters - 100.0).abs() < 0.01);

        assert!(!accumulator.is_active());
        assert_eq!(accumulator.snapshot(), TrackSnapshot::default());
        assert_eq!(accumulator.ingest_at(north_of_origin(200.0), now()), IngestOutcome::Inactive);
    }
}

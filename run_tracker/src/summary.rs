use run_tracker_lib::{
    accumulator::{AccumulatorSettings, TrackAccumulator, TrackSnapshot},
    track::CompletedRun,
    track_point::PositionSample,
};

/// Runs recorded samples through the accumulator without waiting for real time.
///
/// Every sample is judged fresh relative to its own timestamp, and the elapsed time is the
/// number of whole seconds between the first and the last sample.
pub fn summarize(samples: &[PositionSample], settings: AccumulatorSettings) -> (TrackSnapshot, CompletedRun) {
    let mut accumulator = TrackAccumulator::new(settings);
    accumulator.reset();

    let mut rejected = 0;
    for sample in samples {
        if !accumulator.ingest_at(*sample, sample.timestamp).is_accepted() {
            rejected += 1;
        }
    }

    if let (Some(first), Some(last)) = (samples.first(), samples.last()) {
        let seconds = (last.timestamp - first.timestamp).num_seconds().max(0);
        accumulator.advance_seconds(seconds as u64);
    }

    if rejected > 0 {
        tracing::info!("Filtered out {} of {} samples", rejected, samples.len());
    }

    let snapshot = accumulator.snapshot();
    let run = accumulator.stop().unwrap_or_else(|| CompletedRun {
        started_at: None,
        distance_meters: 0.0,
        duration_seconds: 0,
        path: Vec::new(),
    });

    (snapshot, run)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta};

    use super::*;

    #[test]
    fn summary_of_recorded_samples() {
        let start = DateTime::from_timestamp(1_714_543_200, 0).unwrap();
        let samples = [
            PositionSample::new(56.1572, 10.2107, 4.0, start),
            PositionSample::new(56.1581, 10.2107, 40.0, start + TimeDelta::seconds(10)),
            PositionSample::new(56.1581, 10.2107, 4.0, start + TimeDelta::seconds(20)),
            PositionSample::new(56.1590, 10.2110, 4.0, start + TimeDelta::seconds(45)),
        ];

        let (snapshot, run) = summarize(&samples, AccumulatorSettings::default());

        assert_eq!(snapshot.elapsed_seconds, 45);
        assert_eq!(run.path.len(), 3);
        assert_eq!(run.started_at, Some(start));
        assert_eq!(run.distance_meters, snapshot.distance_meters);
        assert!(snapshot.distance_meters > 190.0 && snapshot.distance_meters < 210.0);
        assert!(snapshot.pace.is_some());
    }

    #[test]
    fn long_recorded_span() {
        let start = DateTime::from_timestamp(1_000_000_000, 0).unwrap();
        let end = start + TimeDelta::days(365 * 20);
        let samples = [
            PositionSample::new(56.1572, 10.2107, 4.0, start),
            PositionSample::new(56.1581, 10.2107, 4.0, end),
        ];

        let (snapshot, run) = summarize(&samples, AccumulatorSettings::default());

        assert_eq!(snapshot.elapsed_seconds, (end - start).num_seconds() as u64);
        assert_eq!(run.duration_seconds, snapshot.elapsed_seconds);
    }

    #[test]
    fn empty_input() {
        let (snapshot, run) = summarize(&[], AccumulatorSettings::default());
        assert_eq!(snapshot, TrackSnapshot::default());
        assert!(run.path.is_empty());
    }
}

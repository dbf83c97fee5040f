use std::{io::{BufReader, BufWriter, Read, Write}, path::Path, str::FromStr};

use chrono::{DateTime, Utc};
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};
use run_tracker_lib::{track::CompletedRun, track_point::PositionSample};
use time::OffsetDateTime;

use crate::TrackerError;

/// Typical user equivalent range error of a consumer receiver. Accuracy radius = hdop * this.
pub const UERE_METERS: f64 = 5.0;

pub fn read_gpx(path: &Path, default_accuracy: f64) -> Result<Vec<PositionSample>, TrackerError> {
    let file = std::fs::File::open(path)
        .map_err(|err| TrackerError::Io(format!("Failed to open {:?}: {}", path, err)))?;
    parse_gpx(BufReader::new(file), default_accuracy)
}

/// All track points of all tracks, in document order.
pub fn parse_gpx<R: Read>(reader: R, default_accuracy: f64) -> Result<Vec<PositionSample>, TrackerError> {
    let gpx = gpx::read(reader).map_err(|err| TrackerError::Gpx(format!("Failed to parse GPX: {}", err)))?;

    let mut samples = Vec::new();
    for track in gpx.tracks {
        for segment in track.segments {
            for point in segment.points {
                let Some(time) = &point.time else {
                    return Err(TrackerError::Gpx(format!("Track point {} has no timestamp", samples.len())));
                };
                let formatted = time.format()
                    .map_err(|_| TrackerError::Gpx(format!("Unreadable timestamp on track point {}", samples.len())))?;
                let timestamp = DateTime::<Utc>::from_str(&formatted)
                    .map_err(|_| TrackerError::Gpx(format!("Invalid timestamp {:?}", formatted)))?;

                let accuracy = point.hdop.map(|hdop| hdop * UERE_METERS).unwrap_or(default_accuracy);
                let position = point.point();

                samples.push(PositionSample::new(position.y(), position.x(), accuracy, timestamp));
            }
        }
    }

    Ok(samples)
}

pub fn write_gpx(run: &CompletedRun, name: &str, path: &Path) -> Result<(), TrackerError> {
    let file = std::fs::File::create(path)
        .map_err(|err| TrackerError::Io(format!("Failed to create {:?}: {}", path, err)))?;
    let mut writer = BufWriter::new(file);
    export_gpx(run, name, &mut writer)?;
    writer.flush().map_err(|err| TrackerError::Io(format!("Failed to write {:?}: {}", path, err)))
}

pub fn export_gpx<W: Write>(run: &CompletedRun, name: &str, writer: W) -> Result<(), TrackerError> {
    let mut segment = TrackSegment::default();
    for sample in &run.path {
        let mut waypoint = Waypoint::new(sample.position);
        waypoint.time = Some(to_offset_date_time(sample.timestamp)?.into());
        waypoint.hdop = Some(sample.horizontal_accuracy / UERE_METERS);
        segment.points.push(waypoint);
    }

    let mut track = Track::default();
    track.name = Some(name.to_string());
    track.segments.push(segment);

    let mut gpx = Gpx::default();
    gpx.version = GpxVersion::Gpx11;
    gpx.creator = Some(env!("CARGO_PKG_NAME").to_string());
    gpx.tracks.push(track);

    gpx::write(&gpx, writer).map_err(|err| TrackerError::Gpx(format!("Failed to write GPX: {}", err)))
}

fn to_offset_date_time(timestamp: DateTime<Utc>) -> Result<OffsetDateTime, TrackerError> {
    timestamp.timestamp_nanos_opt()
        .and_then(|nanos| OffsetDateTime::from_unix_timestamp_nanos(nanos as i128).ok())
        .ok_or(TrackerError::Gpx(format!("Timestamp out of range: {}", timestamp)))
}

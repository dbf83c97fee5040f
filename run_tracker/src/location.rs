use std::{sync::Arc, time::Duration};

use chrono::Utc;
use run_tracker_lib::track_point::PositionSample;
use tokio::{sync::{mpsc, Notify}, task::JoinHandle, time::Instant};

use crate::TrackerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    NotDetermined,
    Restricted,
    Denied,
    AuthorizedAlways,
    AuthorizedWhenInUse,
}

impl AuthorizationStatus {
    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthorizationStatus::AuthorizedAlways | AuthorizationStatus::AuthorizedWhenInUse)
    }
}

/// Anything that can produce position samples for a run.
///
/// Samples are pushed into the sender handed to `start_updates`, in chronological order.
pub trait LocationSource: Send + 'static {
    fn services_enabled(&self) -> bool {
        true
    }

    fn authorization(&self) -> AuthorizationStatus;

    /// Ask for permission. The answer shows up in later calls to `authorization`.
    fn request_authorization(&mut self) {}

    fn last_known(&self) -> Option<PositionSample> {
        None
    }

    fn start_updates(&mut self, sink: mpsc::Sender<PositionSample>) -> Result<(), TrackerError>;

    fn stop_updates(&mut self);
}

/**
 * Plays a recorded track back through the live pipeline.
 * Each sample is sent at its original offset from the first sample (divided by `speed`)
 * and stamped with the current time, so the freshness filter sees it as live.
 */
pub struct ReplayLocationSource {
    samples: Arc<Vec<PositionSample>>,
    speed: f64,
    task: Option<JoinHandle<()>>,
    finished: Arc<Notify>,
}

impl ReplayLocationSource {
    pub fn new(samples: Vec<PositionSample>, speed: f64) -> Self {
        Self {
            samples: Arc::new(samples),
            speed: if speed.is_finite() && speed > 0.0 { speed } else { 1.0 },
            task: None,
            finished: Arc::new(Notify::new()),
        }
    }

    /// Notified once the last sample has been sent.
    pub fn finished(&self) -> Arc<Notify> {
        self.finished.clone()
    }
}

impl LocationSource for ReplayLocationSource {
    fn authorization(&self) -> AuthorizationStatus {
        AuthorizationStatus::AuthorizedWhenInUse
    }

    fn last_known(&self) -> Option<PositionSample> {
        self.samples.first().copied()
    }

    fn start_updates(&mut self, sink: mpsc::Sender<PositionSample>) -> Result<(), TrackerError> {
        if self.samples.is_empty() {
            return Err(TrackerError::Location("Nothing to replay".to_string()));
        }

        self.stop_updates();

        let samples = self.samples.clone();
        let speed = self.speed;
        let finished = self.finished.clone();

        self.task = Some(tokio::spawn(async move {
            let started = Instant::now();
            let first_timestamp = samples[0].timestamp;

            for sample in samples.iter() {
                let offset = (sample.timestamp - first_timestamp).to_std().unwrap_or(Duration::ZERO);
                tokio::time::sleep_until(started + offset.div_f64(speed)).await;

                if sink.send(sample.restamped(Utc::now())).await.is_err() {
                    tracing::debug!("Replay receiver dropped");
                    return;
                }
            }

            tracing::info!("Replay finished, sent {} samples", samples.len());
            finished.notify_one();
        }));

        Ok(())
    }

    fn stop_updates(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ReplayLocationSource {
    fn drop(&mut self) {
        self.stop_updates();
    }
}

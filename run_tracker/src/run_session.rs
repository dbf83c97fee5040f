use std::time::Duration;

use run_tracker_lib::{
    accumulator::{AccumulatorSettings, IngestOutcome, TrackAccumulator, TrackSnapshot},
    route::MapRegion,
    track::CompletedRun,
    track_point::PositionSample,
};
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::{interval_at, Instant, Interval},
};

use crate::{
    location::{AuthorizationStatus, LocationSource},
    renderer::RouteRenderer,
    TrackerError,
};

const SAMPLE_QUEUE_SIZE: usize = 64;
const COMMAND_QUEUE_SIZE: usize = 8;
/// Each tick adds one second to the run, so the period is fixed.
const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSettings {
    pub accumulator: AccumulatorSettings,
    pub initial_region_meters: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            accumulator: AccumulatorSettings::default(),
            initial_region_meters: 1000.0,
        }
    }
}

pub enum SessionCommand {
    Start(oneshot::Sender<Result<(), TrackerError>>),
    Stop(oneshot::Sender<Option<CompletedRun>>),
}

/// Handle to the task that owns the run. Every change to the track happens on that task.
pub struct RunController {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<TrackSnapshot>,
    task: JoinHandle<()>,
}

impl RunController {
    /// Must be called from within a tokio runtime.
    pub fn spawn<L: LocationSource, R: RouteRenderer>(location: L, renderer: R, settings: SessionSettings) -> Self {
        let (commands, command_rx) = mpsc::channel(COMMAND_QUEUE_SIZE);
        let (snapshot_tx, snapshots) = watch::channel(TrackSnapshot::default());

        let task = tokio::spawn(run_session_actor(location, renderer, settings, command_rx, snapshot_tx));

        Self {
            commands,
            snapshots,
            task,
        }
    }

    /// Starts a new run. Starting while a run is active starts it over.
    pub async fn start(&self) -> Result<(), TrackerError> {
        let (reply, response) = oneshot::channel();
        self.send(SessionCommand::Start(reply)).await?;
        response.await.map_err(|_| TrackerError::Session("No reply to start".to_string()))?
    }

    pub async fn stop(&self) -> Result<Option<CompletedRun>, TrackerError> {
        let (reply, response) = oneshot::channel();
        self.send(SessionCommand::Stop(reply)).await?;
        response.await.map_err(|_| TrackerError::Session("No reply to stop".to_string()))
    }

    pub fn snapshot(&self) -> TrackSnapshot {
        *self.snapshots.borrow()
    }

    /// Changes after every accepted sample and every tick.
    pub fn subscribe(&self) -> watch::Receiver<TrackSnapshot> {
        self.snapshots.clone()
    }

    /// Closes the command channel and waits for the session task to end.
    pub async fn shutdown(self) {
        drop(self.commands);
        if let Err(err) = self.task.await {
            tracing::error!("Run session task failed: {err:?}");
        }
    }

    async fn send(&self, command: SessionCommand) -> Result<(), TrackerError> {
        self.commands.send(command).await
            .map_err(|_| TrackerError::Session("Run session is not running".to_string()))
    }
}

struct RunSession<L: LocationSource, R: RouteRenderer> {
    location: L,
    renderer: R,
    settings: SessionSettings,
    accumulator: TrackAccumulator,
    samples: Option<mpsc::Receiver<PositionSample>>,
    ticker: Interval,
    snapshots: watch::Sender<TrackSnapshot>,
}

async fn run_session_actor<L: LocationSource, R: RouteRenderer>(
    location: L,
    renderer: R,
    settings: SessionSettings,
    mut commands: mpsc::Receiver<SessionCommand>,
    snapshots: watch::Sender<TrackSnapshot>,
) {
    let mut session = RunSession {
        location,
        renderer,
        settings,
        accumulator: TrackAccumulator::new(settings.accumulator),
        samples: None,
        ticker: interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD),
        snapshots,
    };

    session.center_on_last_known();

    loop {
        tokio::select! {
            // Samples and ticks that are already due go before commands
            biased;

            sample = next_sample(&mut session.samples) => {
                match sample {
                    Some(sample) => session.handle_sample(sample),
                    None => {
                        tracing::debug!("Location updates ended");
                        session.samples = None;
                    }
                }
            },
            _ = session.ticker.tick(), if session.accumulator.is_active() => {
                session.accumulator.tick();
                session.publish();
            },
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                session.handle_command(command);
            },
        }
    }

    if session.accumulator.is_active() {
        session.location.stop_updates();
        tracing::warn!("Run session closed during an active run, discarding it");
    }
    tracing::debug!("Run session ended");
}

async fn next_sample(samples: &mut Option<mpsc::Receiver<PositionSample>>) -> Option<PositionSample> {
    match samples {
        Some(samples) => samples.recv().await,
        None => std::future::pending().await,
    }
}

impl<L: LocationSource, R: RouteRenderer> RunSession<L, R> {
    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Start(reply) => {
                let result = self.start_run();
                if let Err(err) = &result {
                    tracing::warn!("Failed to start run: {err}");
                }
                let _ = reply.send(result);
            },
            SessionCommand::Stop(reply) => {
                let run = self.stop_run();
                let _ = reply.send(run);
            },
        }
    }

    fn check_authorization(&mut self) -> Result<(), TrackerError> {
        if !self.location.services_enabled() {
            return Err(TrackerError::LocationDisabled);
        }

        if self.location.authorization() == AuthorizationStatus::NotDetermined {
            tracing::info!("Requesting location authorization");
            self.location.request_authorization();
        }

        match self.location.authorization() {
            status if status.is_authorized() => Ok(()),
            status => {
                tracing::info!("No location access: {status:?}");
                Err(TrackerError::LocationUnauthorized)
            },
        }
    }

    fn start_run(&mut self) -> Result<(), TrackerError> {
        self.check_authorization()?;

        if self.accumulator.is_active() {
            tracing::info!("Run started over");
            self.location.stop_updates();
        }

        // A fresh channel per run, so nothing sent for an earlier run can arrive in this one
        let (sink, samples) = mpsc::channel(SAMPLE_QUEUE_SIZE);
        if let Err(err) = self.location.start_updates(sink) {
            if self.stop_run().is_some() {
                tracing::warn!("Discarded the previous run, location updates could not be restarted");
            }
            return Err(err);
        }
        self.samples = Some(samples);

        self.renderer.clear_overlays();
        self.accumulator.reset();
        self.ticker.reset();
        self.publish();

        tracing::info!("Run started");
        Ok(())
    }

    fn stop_run(&mut self) -> Option<CompletedRun> {
        self.location.stop_updates();
        self.samples = None;

        let run = self.accumulator.stop();
        self.publish();

        match &run {
            Some(run) => tracing::info!(
                "Run stopped after {}s, {:.1}m over {} points",
                run.duration_seconds, run.distance_meters, run.path.len()
            ),
            None => tracing::debug!("Stop requested with no active run"),
        }
        run
    }

    fn handle_sample(&mut self, sample: PositionSample) {
        match self.accumulator.ingest(sample) {
            IngestOutcome::Inactive => {
                tracing::trace!("Sample arrived while idle");
            },
            IngestOutcome::Rejected(reason) => {
                tracing::trace!("Rejected sample ({reason:?}), accuracy {:.1}m", sample.horizontal_accuracy);
            },
            IngestOutcome::Seeded => {
                tracing::debug!("First point at ({:.6}, {:.6})", sample.latitude(), sample.longitude());
                self.publish();
            },
            IngestOutcome::Extended { segment, region, delta_meters } => {
                tracing::trace!("Accepted sample, +{delta_meters:.1}m");
                self.renderer.add_segment(&segment);
                self.renderer.set_region(&region);
                self.publish();
            },
        }
    }

    fn center_on_last_known(&mut self) {
        if !self.location.authorization().is_authorized() {
            return;
        }

        if let Some(sample) = self.location.last_known() {
            self.renderer.set_region(&MapRegion::square(sample.coordinate(), self.settings.initial_region_meters));
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.accumulator.snapshot());
    }
}

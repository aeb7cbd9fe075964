use {
    crate::{
        DetectError, Detection, DetectionResult, Detector, ScanConfig, ScanError, ScanSnapshot,
        ScanStatus,
    },
    prism_base::Epoch,
    prism_camera::{CaptureSession, DeviceError, FrameError, FrameSource},
    std::sync::Arc,
    tokio::{
        sync::{mpsc, watch},
        task::{JoinError, JoinHandle},
        time::{Instant, Interval, MissedTickBehavior},
    },
};

/// Commands accepted by [`ScanController::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanCommand {
    Start,
    Stop,
    Retry,
    Shutdown,
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was handed to the detector.
    Started,
    /// Not scanning, or a detection is still in flight.
    Dropped,
    /// No usable frame; the failure was counted.
    Skipped,
}

/// How a finished detection was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Published,
    BelowThreshold,
    /// Transient failure, counted.
    Absorbed,
    /// The controller moved to `Failed`.
    Escalated,
    /// Started before the last stop; ignored.
    Stale,
}

type DetectOutcome = Result<Result<Detection, DetectError>, JoinError>;

struct InFlight {
    epoch: u64,
    task: JoinHandle<Result<Detection, DetectError>>,
}

/// Cloneable remote control for a running [`ScanController`].
#[derive(Clone)]
pub struct ScanHandle {
    commands: mpsc::UnboundedSender<ScanCommand>,
    snapshots: watch::Receiver<ScanSnapshot>,
}

impl ScanHandle {
    /// Returns false when the controller is gone.
    pub fn send(&self, command: ScanCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn start(&self) -> bool {
        self.send(ScanCommand::Start)
    }

    pub fn stop(&self) -> bool {
        self.send(ScanCommand::Stop)
    }

    pub fn retry(&self) -> bool {
        self.send(ScanCommand::Retry)
    }

    pub fn shutdown(&self) -> bool {
        self.send(ScanCommand::Shutdown)
    }

    pub fn snapshot(&self) -> ScanSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn snapshots(&self) -> watch::Receiver<ScanSnapshot> {
        self.snapshots.clone()
    }
}

/// The scan state machine.
///
/// Holds the capture session while scanning and at most one detection in
/// flight. Detections are stamped with the [`Epoch`] current when they
/// start; `stop` advances it so late results are dropped. An in-flight task
/// is never aborted, and no new one starts until it has been collected.
pub struct ScanController<S: FrameSource, D: Detector> {
    source: S,
    detector: Arc<D>,
    config: ScanConfig,
    status: ScanStatus,
    session: Option<CaptureSession>,
    last_result: Option<DetectionResult>,
    in_flight: Option<InFlight>,
    epoch: Epoch,
    failures: u32,
    timer: Option<Interval>,
    snapshots: watch::Sender<ScanSnapshot>,
    // only handles hold the sender, so the channel closes with the last one
    command_tx: mpsc::WeakUnboundedSender<ScanCommand>,
    command_rx: mpsc::UnboundedReceiver<ScanCommand>,
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn next_completion(in_flight: &mut Option<InFlight>) -> (u64, DetectOutcome) {
    match in_flight {
        Some(in_flight) => (in_flight.epoch, (&mut in_flight.task).await),
        None => std::future::pending().await,
    }
}

/// Wait for a command that aborts an acquisition, ignoring the rest.
async fn next_interrupt(commands: &mut mpsc::UnboundedReceiver<ScanCommand>) -> ScanCommand {
    loop {
        match commands.recv().await {
            Some(ScanCommand::Stop) => return ScanCommand::Stop,
            Some(ScanCommand::Shutdown) | None => return ScanCommand::Shutdown,
            Some(command) => log::debug!("{:?} ignored while acquiring the camera", command),
        }
    }
}

impl<S: FrameSource, D: Detector> ScanController<S, D> {
    pub fn new(source: S, detector: D, config: ScanConfig) -> Self {
        let (snapshots, _) = watch::channel(ScanSnapshot::default());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let command_tx = command_tx.downgrade();
        Self {
            source,
            detector: Arc::new(detector),
            config,
            status: ScanStatus::Idle,
            session: None,
            last_result: None,
            in_flight: None,
            epoch: Epoch::new(),
            failures: 0,
            timer: None,
            snapshots,
            command_tx,
            command_rx,
        }
    }

    /// Remote control for [`ScanController::run`]. Once every handle is
    /// dropped, `run` stops and releases the camera.
    pub fn handle(&mut self) -> ScanHandle {
        let commands = match self.command_tx.upgrade() {
            Some(commands) => commands,
            None => {
                let (commands, command_rx) = mpsc::unbounded_channel();
                self.command_tx = commands.downgrade();
                self.command_rx = command_rx;
                commands
            }
        };
        ScanHandle {
            commands,
            snapshots: self.snapshots.subscribe(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn status(&self) -> &ScanStatus {
        &self.status
    }

    pub fn last_result(&self) -> Option<&DetectionResult> {
        self.last_result.as_ref()
    }

    pub fn session(&self) -> Option<&CaptureSession> {
        self.session.as_ref()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    pub fn is_inferring(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    fn publish(&self) {
        let snapshot = ScanSnapshot {
            status: self.status.clone(),
            result: self.last_result.clone(),
        };
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    fn set_status(&mut self, status: ScanStatus) {
        if self.status == status {
            return;
        }
        match (&self.status, &status) {
            (ScanStatus::Ready, ScanStatus::Inferring) | (ScanStatus::Inferring, ScanStatus::Ready) => {
                log::debug!("scan: {} -> {}", self.status, status)
            }
            (_, ScanStatus::Failed(_)) => log::error!("scan: {} -> {}", self.status, status),
            _ => log::info!("scan: {} -> {}", self.status, status),
        }
        self.status = status;
        self.publish();
    }

    fn begin_acquire(&mut self) -> bool {
        if self.status != ScanStatus::Idle {
            log::debug!("start ignored in state {}", self.status);
            return false;
        }
        self.set_status(ScanStatus::AcquiringDevice);
        true
    }

    fn finish_acquire(&mut self, result: Result<CaptureSession, DeviceError>) {
        match result {
            Ok(session) => {
                self.session = Some(session);
                self.failures = 0;
                let period = self.config.interval();
                let mut timer = tokio::time::interval_at(Instant::now() + period, period);
                timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
                self.timer = Some(timer);
                self.set_status(ScanStatus::Ready);
            }
            Err(error) => {
                if error.needs_user_action() {
                    log::warn!("camera needs user action: {}", error);
                }
                self.set_status(ScanStatus::Failed(ScanError::Device(error)));
            }
        }
    }

    /// Acquire the camera and begin scanning. Only valid from `Idle`.
    pub async fn start(&mut self) {
        if !self.begin_acquire() {
            return;
        }
        let result = self
            .source
            .acquire(self.config.facing(), self.config.size_hint())
            .await;
        self.finish_acquire(result);
    }

    /// Returns true when shutdown was requested during acquisition.
    async fn start_interruptible(&mut self) -> bool {
        if !self.begin_acquire() {
            return false;
        }
        let (facing, size_hint) = (self.config.facing(), self.config.size_hint());
        let interrupt = tokio::select! {
            result = self.source.acquire(facing, size_hint) => {
                self.finish_acquire(result);
                return false;
            }
            command = next_interrupt(&mut self.command_rx) => command,
        };
        log::info!("acquisition abandoned on {:?}", interrupt);
        self.stop();
        interrupt == ScanCommand::Shutdown
    }

    fn count_failure(&mut self, reason: String) -> bool {
        self.failures += 1;
        let max = self.config.max_consecutive_failures();
        if self.failures >= max {
            self.timer = None;
            self.set_status(ScanStatus::Failed(ScanError::TooManyFailures {
                count: self.failures,
                last: reason,
            }));
            true
        } else {
            log::warn!("scan failure {}/{}: {}", self.failures, max, reason);
            false
        }
    }

    /// Grab the latest frame and start a detection on it.
    pub fn tick(&mut self) -> TickOutcome {
        if self.status != ScanStatus::Ready || self.in_flight.is_some() {
            log::debug!("tick dropped in state {}", self.status);
            return TickOutcome::Dropped;
        }
        let Some(session) = &self.session else {
            log::debug!("tick dropped without a session");
            return TickOutcome::Dropped;
        };

        match self.source.current_frame(session) {
            Ok(frame) => {
                let detector = Arc::clone(&self.detector);
                let task = tokio::spawn(async move { detector.detect(frame).await });
                self.in_flight = Some(InFlight {
                    epoch: self.epoch.current(),
                    task,
                });
                self.set_status(ScanStatus::Inferring);
                TickOutcome::Started
            }
            Err(FrameError::NotReady) => {
                self.count_failure(FrameError::NotReady.to_string());
                TickOutcome::Skipped
            }
            Err(error) => {
                self.timer = None;
                self.set_status(ScanStatus::Failed(ScanError::Device(
                    DeviceError::PlaybackFailed(error.to_string()),
                )));
                TickOutcome::Skipped
            }
        }
    }

    fn complete(&mut self, epoch: u64, outcome: DetectOutcome) -> Completion {
        self.in_flight = None;
        if !self.epoch.is_current(epoch) {
            log::debug!("discarding result from epoch {}", epoch);
            return Completion::Stale;
        }
        if self.status == ScanStatus::Inferring {
            self.set_status(ScanStatus::Ready);
        }

        let result = outcome.unwrap_or_else(|error| {
            Err(DetectError::BackendUnavailable(format!("detect task failed: {error}")))
        });
        match result {
            Ok(detection) => {
                self.failures = 0;
                if detection.confidence >= self.config.threshold() {
                    let result = DetectionResult::new(detection);
                    log::info!("detected {} ({:.1}%)", result.label, result.percent());
                    self.last_result = Some(result);
                    self.publish();
                    Completion::Published
                } else {
                    log::debug!(
                        "{} at {:.2} below threshold {:.2}",
                        detection.label,
                        detection.confidence,
                        self.config.threshold()
                    );
                    Completion::BelowThreshold
                }
            }
            Err(error) if error.is_fatal() => {
                self.timer = None;
                self.set_status(ScanStatus::Failed(ScanError::Detect(error)));
                Completion::Escalated
            }
            Err(error) => {
                if self.count_failure(error.to_string()) {
                    Completion::Escalated
                } else {
                    Completion::Absorbed
                }
            }
        }
    }

    /// Wait for the in-flight detection, if any, and apply its result.
    pub async fn settle(&mut self) -> Option<Completion> {
        let in_flight = self.in_flight.as_mut()?;
        let outcome = (&mut in_flight.task).await;
        let epoch = in_flight.epoch;
        Some(self.complete(epoch, outcome))
    }

    /// Stop scanning and release the camera. The model stays loaded and the
    /// last result stays published.
    pub fn stop(&mut self) {
        self.timer = None;
        self.epoch.advance();
        if let Some(session) = self.session.take() {
            self.source.release(&session);
        }
        self.failures = 0;
        self.set_status(ScanStatus::Idle);
    }

    /// Back to a clean `Idle`: camera released, result and counters cleared.
    pub fn reset(&mut self) {
        self.stop();
        if self.last_result.take().is_some() {
            self.publish();
        }
    }

    /// Leave `Failed` and acquire the camera again.
    pub async fn retry(&mut self) {
        if !self.status.is_failed() {
            log::debug!("retry ignored in state {}", self.status);
            return;
        }
        self.reset();
        self.start().await;
    }

    /// Serve commands, ticks and completions until `Shutdown` or until the
    /// last [`ScanHandle`] is dropped.
    ///
    /// The controller is left `Idle` with the camera released.
    pub async fn run(&mut self) {
        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(ScanCommand::Start) => {
                        if self.start_interruptible().await {
                            break;
                        }
                    }
                    Some(ScanCommand::Stop) => self.stop(),
                    Some(ScanCommand::Retry) => {
                        if self.status.is_failed() {
                            self.reset();
                            if self.start_interruptible().await {
                                break;
                            }
                        } else {
                            log::debug!("retry ignored in state {}", self.status);
                        }
                    }
                    Some(ScanCommand::Shutdown) | None => break,
                },
                _ = next_tick(&mut self.timer) => {
                    self.tick();
                }
                (epoch, outcome) = next_completion(&mut self.in_flight) => {
                    self.complete(epoch, outcome);
                }
            }
        }
        self.stop();
        log::info!("scan controller shut down");
    }
}

impl<S: FrameSource, D: Detector> Drop for ScanController<S, D> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.source.release(&session);
        }
    }
}

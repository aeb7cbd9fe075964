use {
    crate::*,
    prism_base::Vec2,
    std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        time::Duration,
    },
    tokio::{
        sync::{oneshot, watch},
        task::{JoinHandle, spawn_blocking},
    },
};

/// Owner of the camera device, seen from the scan loop.
#[allow(async_fn_in_trait)]
pub trait FrameSource {
    /// Acquire a camera facing `facing`, treating `size_hint` as a hint.
    ///
    /// This is the only call that may trigger a permission prompt, so it must
    /// only run in response to an explicit user action.
    async fn acquire(
        &mut self,
        facing: Facing,
        size_hint: Option<Vec2<usize>>,
    ) -> Result<CaptureSession, DeviceError>;

    /// Most recent frame of `session`. Never waits for a new one.
    fn current_frame(&self, session: &CaptureSession) -> Result<Frame, FrameError>;

    /// Stop the device behind `session`. Releasing twice is a no-op.
    fn release(&mut self, session: &CaptureSession);
}

type InitResult = Result<(Negotiated, Capabilities), DeviceError>;

// pause between polls of a device that had no frame ready
const IDLE_BACKOFF: Duration = Duration::from_millis(5);

struct Worker {
    session_id: u64,
    frames: watch::Receiver<Option<Frame>>,
    cancel: Arc<AtomicBool>,
    lost: Arc<AtomicBool>,
    ready: bool,
    task: Option<JoinHandle<()>>,
}

impl Worker {
    fn retire(mut self) -> Option<JoinHandle<()>> {
        self.cancel.store(true, Ordering::Release);
        self.task.take()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // the thread closes the device on its next pass
        self.cancel.store(true, Ordering::Release);
    }
}

/// [`FrameSource`] running one capture worker per session.
///
/// The worker runs on tokio's blocking pool and opens, streams and closes the
/// device; the latest frame is published through a `watch` channel so readers
/// never block. Releasing signals the worker without joining it on the
/// caller's thread. The next `acquire`, or [`CameraSource::closed`], awaits
/// retired workers before another device is opened.
pub struct CameraSource<P: DeviceProvider> {
    provider: Arc<P>,
    frame_rate: Option<f32>,
    next_id: u64,
    worker: Option<Worker>,
    closing: Vec<JoinHandle<()>>,
}

impl<P: DeviceProvider> CameraSource<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
            frame_rate: None,
            next_id: 1,
            worker: None,
            closing: Vec::new(),
        }
    }

    /// Frame rate to request on top of facing and size.
    pub fn with_frame_rate(mut self, frame_rate: f32) -> Self {
        self.frame_rate = Some(frame_rate);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Id of the live session, if any.
    pub fn active_session(&self) -> Option<u64> {
        self.worker
            .as_ref()
            .filter(|worker| worker.ready)
            .map(|worker| worker.session_id)
    }

    /// Wait until every released device has been closed.
    pub async fn closed(&mut self) {
        while let Some(task) = self.closing.pop() {
            if let Err(error) = task.await {
                log::error!("capture worker failed: {}", error);
            }
        }
    }

    fn retire(&mut self, worker: Worker) {
        if let Some(task) = worker.retire() {
            self.closing.push(task);
        }
    }
}

fn open_with_fallback(device: &mut dyn CaptureDevice, constraints: &Constraints) -> InitResult {
    match device.open(constraints) {
        Ok(negotiated) => Ok((
            negotiated,
            Capabilities {
                extended_constraints: constraints.is_compound(),
                minimal_fallback: false,
            },
        )),
        Err(DeviceError::NegotiationFailed(reason)) if constraints.is_compound() => {
            log::warn!("camera rejected {:?} ({}), retrying with facing only", constraints, reason);
            device.close();
            let negotiated = device.open(&constraints.minimal())?;
            Ok((
                negotiated,
                Capabilities {
                    extended_constraints: false,
                    minimal_fallback: true,
                },
            ))
        }
        Err(error) => Err(error),
    }
}

fn run_worker<P: DeviceProvider>(
    provider: Arc<P>,
    constraints: Constraints,
    init: oneshot::Sender<InitResult>,
    frames: watch::Sender<Option<Frame>>,
    cancel: Arc<AtomicBool>,
    lost: Arc<AtomicBool>,
) {
    // open and stream on this thread; some backends are bound to the thread
    // that opened them
    let mut device = match provider.create(constraints.facing) {
        Ok(device) => device,
        Err(error) => {
            let _ = init.send(Err(error));
            return;
        }
    };

    let opened = open_with_fallback(device.as_mut(), &constraints)
        .and_then(|opened| device.start().map(|_| opened));
    match opened {
        Ok(opened) => {
            if init.send(Ok(opened)).is_err() {
                log::debug!("capture worker: acquisition abandoned");
                device.close();
                return;
            }
        }
        Err(error) => {
            device.close();
            let _ = init.send(Err(error));
            return;
        }
    }

    let mut sequence = 0u64;
    let mut dropped = 0u64;
    while !cancel.load(Ordering::Acquire) {
        match device.blocking_capture() {
            Ok(Some(raw)) => match raw.decode() {
                Ok(image) => {
                    sequence += 1;
                    frames.send_replace(Some(Frame::new(image, sequence)));
                }
                Err(error) => {
                    dropped += 1;
                    log::warn!("capture worker: dropping undecodable frame: {}", error);
                }
            },
            Ok(None) => std::thread::sleep(IDLE_BACKOFF),
            Err(error) => {
                log::error!("capture worker: {}", error);
                lost.store(true, Ordering::Release);
                break;
            }
        }
    }
    device.close();
    log::debug!(
        "capture worker: device closed after {} frames ({} dropped)",
        sequence,
        dropped
    );
}

impl<P: DeviceProvider> FrameSource for CameraSource<P> {
    async fn acquire(
        &mut self,
        facing: Facing,
        size_hint: Option<Vec2<usize>>,
    ) -> Result<CaptureSession, DeviceError> {
        if let Some(previous) = self.worker.take() {
            if previous.ready {
                log::warn!("acquire while session {} is live, releasing it", previous.session_id);
            } else {
                log::debug!("reclaiming abandoned acquisition {}", previous.session_id);
            }
            self.retire(previous);
        }
        self.closed().await;

        let constraints = Constraints::new(facing)
            .with_size(size_hint)
            .with_frame_rate(self.frame_rate);
        let (init_tx, init_rx) = oneshot::channel::<InitResult>();
        let (frame_tx, frame_rx) = watch::channel::<Option<Frame>>(None);
        let cancel = Arc::new(AtomicBool::new(false));
        let lost = Arc::new(AtomicBool::new(false));

        let task = spawn_blocking({
            let provider = Arc::clone(&self.provider);
            let cancel = Arc::clone(&cancel);
            let lost = Arc::clone(&lost);
            move || run_worker(provider, constraints, init_tx, frame_tx, cancel, lost)
        });

        let session_id = self.next_id;
        self.next_id += 1;
        // registered before awaiting init so a dropped acquire still gets
        // cancelled and joined
        self.worker = Some(Worker {
            session_id,
            frames: frame_rx,
            cancel,
            lost,
            ready: false,
            task: Some(task),
        });

        let opened = init_rx.await.unwrap_or_else(|_| {
            Err(DeviceError::PlaybackFailed(
                "capture worker exited during acquisition".to_string(),
            ))
        });
        let (negotiated, capabilities) = match opened {
            Ok(opened) => opened,
            Err(error) => {
                if let Some(worker) = self.worker.take() {
                    self.retire(worker);
                }
                self.closed().await;
                return Err(error);
            }
        };
        if let Some(worker) = self.worker.as_mut() {
            worker.ready = true;
        }

        log::info!(
            "camera acquired: session {} {:?} {} @ {:.1} fps{}",
            session_id,
            facing,
            negotiated.size,
            negotiated.frame_rate,
            if capabilities.minimal_fallback { " (minimal constraints)" } else { "" }
        );
        Ok(CaptureSession::new(session_id, facing, negotiated, capabilities))
    }

    fn current_frame(&self, session: &CaptureSession) -> Result<Frame, FrameError> {
        let worker = match &self.worker {
            Some(worker) if worker.ready && worker.session_id == session.id() => worker,
            _ => return Err(FrameError::Released),
        };
        if worker.lost.load(Ordering::Acquire) {
            return Err(FrameError::Lost);
        }
        worker.frames.borrow().clone().ok_or(FrameError::NotReady)
    }

    fn release(&mut self, session: &CaptureSession) {
        match self.worker.take() {
            Some(worker) if worker.ready && worker.session_id == session.id() => {
                self.retire(worker);
                log::info!("camera released: session {}", session.id());
            }
            other => {
                self.worker = other;
                log::debug!("release of inactive session {} ignored", session.id());
            }
        }
    }
}

#![allow(dead_code)]

use {
    prism_base::{Tensor, Vec2},
    prism_camera::{
        Capabilities, CaptureSession, DeviceError, Facing, Frame, FrameError, FrameSource,
        Negotiated,
    },
    prism_image::{Image, PixelFormat},
    prism_scan::{DetectError, Detection, Detector},
    std::{
        collections::VecDeque,
        future::Future,
        sync::{
            Arc, Mutex,
            atomic::{AtomicU64, AtomicUsize, Ordering},
        },
        time::Duration,
    },
    tokio::sync::{Notify, Semaphore},
};

#[derive(Clone, Default)]
pub struct SourceProbe {
    pub acquires: Arc<AtomicUsize>,
    pub releases: Arc<Mutex<Vec<u64>>>,
    pub acquire_results: Arc<Mutex<VecDeque<Result<(), DeviceError>>>>,
    pub frames: Arc<Mutex<VecDeque<FrameError>>>,
    pub acquire_gate: Arc<Mutex<Option<Arc<Notify>>>>,
}

impl SourceProbe {
    pub fn fail_next_acquire(&self, error: DeviceError) {
        self.acquire_results.lock().unwrap().push_back(Err(error));
    }

    /// Queue frame errors; ticks past the queue get a frame.
    pub fn queue_frame_errors(&self, errors: &[FrameError]) {
        self.frames.lock().unwrap().extend(errors.iter().copied());
    }

    pub fn release_count(&self) -> usize {
        self.releases.lock().unwrap().len()
    }

    pub fn acquire_count(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }
}

pub struct MockSource {
    probe: SourceProbe,
    next_id: u64,
    live: Option<u64>,
    sequence: AtomicU64,
}

impl MockSource {
    pub fn new() -> (Self, SourceProbe) {
        let probe = SourceProbe::default();
        (
            Self {
                probe: probe.clone(),
                next_id: 1,
                live: None,
                sequence: AtomicU64::new(0),
            },
            probe,
        )
    }
}

impl FrameSource for MockSource {
    async fn acquire(
        &mut self,
        facing: Facing,
        size_hint: Option<Vec2<usize>>,
    ) -> Result<CaptureSession, DeviceError> {
        self.probe.acquires.fetch_add(1, Ordering::SeqCst);
        let gate = self.probe.acquire_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let scripted = self.probe.acquire_results.lock().unwrap().pop_front();
        scripted.unwrap_or(Ok(()))?;

        let id = self.next_id;
        self.next_id += 1;
        self.live = Some(id);
        Ok(CaptureSession::new(
            id,
            facing,
            Negotiated {
                size: size_hint.unwrap_or(Vec2::new(64, 48)),
                frame_rate: 30.0,
                format: PixelFormat::Rgb8,
            },
            Capabilities {
                extended_constraints: size_hint.is_some(),
                minimal_fallback: false,
            },
        ))
    }

    fn current_frame(&self, session: &CaptureSession) -> Result<Frame, FrameError> {
        if self.live != Some(session.id()) {
            return Err(FrameError::Released);
        }
        if let Some(error) = self.probe.frames.lock().unwrap().pop_front() {
            return Err(error);
        }
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let image = Image::U8(Tensor::zeros(vec![48, 64, 3]).unwrap());
        Ok(Frame::new(image, sequence))
    }

    fn release(&mut self, session: &CaptureSession) {
        if self.live == Some(session.id()) {
            self.live = None;
            self.probe.releases.lock().unwrap().push(session.id());
        }
    }
}

#[derive(Clone, Default)]
pub struct DetectorProbe {
    pub calls: Arc<AtomicUsize>,
    pub active: Arc<AtomicUsize>,
    pub max_active: Arc<AtomicUsize>,
    pub responses: Arc<Mutex<VecDeque<Result<Detection, DetectError>>>>,
}

impl DetectorProbe {
    /// Queue responses; calls past the queue detect `A` at 0.92.
    pub fn queue(&self, response: Result<Detection, DetectError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

pub struct MockDetector {
    probe: DetectorProbe,
    delay: Duration,
    gate: Option<Arc<Semaphore>>,
}

impl MockDetector {
    pub fn new() -> (Self, DetectorProbe) {
        let probe = DetectorProbe::default();
        (
            Self {
                probe: probe.clone(),
                delay: Duration::ZERO,
                gate: None,
            },
            probe,
        )
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every detect waits for one permit of `gate`.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }
}

impl Detector for MockDetector {
    fn detect(&self, _frame: Frame) -> impl Future<Output = Result<Detection, DetectError>> + Send {
        let probe = self.probe.clone();
        let delay = self.delay;
        let gate = self.gate.clone();
        async move {
            probe.calls.fetch_add(1, Ordering::SeqCst);
            let active = probe.active.fetch_add(1, Ordering::SeqCst) + 1;
            probe.max_active.fetch_max(active, Ordering::SeqCst);

            if let Some(gate) = gate {
                gate.acquire().await.unwrap().forget();
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let response = probe
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Detection::new("A", 0.92)));

            probe.active.fetch_sub(1, Ordering::SeqCst);
            response
        }
    }
}

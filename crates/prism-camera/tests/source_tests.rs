use prism_base::Vec2;
use prism_camera::{
    CameraSource, CaptureDevice, CaptureSession, Constraints, DeviceError, DeviceProvider, Facing,
    Frame, FrameError, FrameSource, Negotiated, RawFrame,
};
use prism_image::PixelFormat;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::time::Duration;

#[derive(Clone, Default)]
struct Script {
    reject_compound: bool,
    deny_permission: bool,
    fail_start: bool,
    fail_capture: bool,
    open_delay: Option<Duration>,
    corrupt_frames: usize,
}

#[derive(Clone, Default)]
struct Probe {
    opens: Arc<Mutex<Vec<Constraints>>>,
    stopped_streams: Arc<AtomicUsize>,
    frames_ready: Arc<AtomicBool>,
    streaming_now: Arc<AtomicUsize>,
    max_streaming: Arc<AtomicUsize>,
    captures: Arc<AtomicUsize>,
}

struct ScriptedProvider {
    script: Script,
    probe: Probe,
}

struct ScriptedDevice {
    script: Script,
    probe: Probe,
    streaming: bool,
    corrupt_left: usize,
}

impl DeviceProvider for ScriptedProvider {
    fn create(&self, _facing: Facing) -> Result<Box<dyn CaptureDevice>, DeviceError> {
        Ok(Box::new(ScriptedDevice {
            script: self.script.clone(),
            probe: self.probe.clone(),
            streaming: false,
            corrupt_left: self.script.corrupt_frames,
        }))
    }
}

impl CaptureDevice for ScriptedDevice {
    fn open(&mut self, constraints: &Constraints) -> Result<Negotiated, DeviceError> {
        self.probe.opens.lock().unwrap().push(constraints.clone());
        if let Some(delay) = self.script.open_delay {
            std::thread::sleep(delay);
        }
        if self.script.deny_permission {
            return Err(DeviceError::PermissionDenied("user said no".to_string()));
        }
        if self.script.reject_compound && constraints.is_compound() {
            return Err(DeviceError::NegotiationFailed("overconstrained".to_string()));
        }
        Ok(Negotiated {
            size: constraints.size.unwrap_or(Vec2::new(4, 2)),
            frame_rate: 30.0,
            format: PixelFormat::Rgb8,
        })
    }

    fn start(&mut self) -> Result<(), DeviceError> {
        if self.script.fail_start {
            return Err(DeviceError::PlaybackFailed("play() rejected".to_string()));
        }
        self.streaming = true;
        let now = self.probe.streaming_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_streaming.fetch_max(now, Ordering::SeqCst);
        Ok(())
    }

    fn blocking_capture(&mut self) -> Result<Option<RawFrame>, DeviceError> {
        std::thread::sleep(Duration::from_millis(1));
        self.probe.captures.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_capture {
            return Err(DeviceError::PlaybackFailed("unplugged".to_string()));
        }
        if !self.probe.frames_ready.load(Ordering::SeqCst) {
            return Ok(None);
        }
        if self.corrupt_left > 0 {
            self.corrupt_left -= 1;
            return Ok(Some(RawFrame::new(
                PixelFormat::Jpeg,
                Vec2::new(4, 2),
                vec![0xFF, 0xD8, 0x00, 0x13],
            )));
        }
        Ok(Some(RawFrame::new(PixelFormat::Rgb8, Vec2::new(4, 2), vec![9u8; 24])))
    }

    fn close(&mut self) {
        if self.streaming {
            self.streaming = false;
            self.probe.streaming_now.fetch_sub(1, Ordering::SeqCst);
            self.probe.stopped_streams.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn source(script: Script) -> (CameraSource<ScriptedProvider>, Probe) {
    let probe = Probe::default();
    let source = CameraSource::new(ScriptedProvider {
        script,
        probe: probe.clone(),
    });
    (source, probe)
}

async fn wait_for_frame(
    source: &CameraSource<ScriptedProvider>,
    session: &CaptureSession,
) -> Result<Frame, FrameError> {
    let mut last = Err(FrameError::NotReady);
    for _ in 0..500 {
        last = source.current_frame(session);
        if !matches!(last, Err(FrameError::NotReady)) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    last
}

async fn wait_for_stopped(probe: &Probe, count: usize) -> bool {
    for _ in 0..500 {
        if probe.stopped_streams.load(Ordering::SeqCst) >= count {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    false
}

#[tokio::test]
async fn test_acquire_with_compound_constraints() {
    let (mut source, probe) = source(Script::default());
    let session = source
        .acquire(Facing::Environment, Some(Vec2::new(1280, 720)))
        .await
        .unwrap();

    assert_eq!(session.resolution(), Vec2::new(1280, 720));
    assert_eq!(session.facing(), Facing::Environment);
    assert!(session.capabilities().extended_constraints);
    assert!(!session.capabilities().minimal_fallback);
    assert_eq!(probe.opens.lock().unwrap().len(), 1);
    source.release(&session);
}

#[tokio::test]
async fn test_rejected_constraints_retry_once_with_facing_only() {
    let (mut source, probe) = source(Script {
        reject_compound: true,
        ..Default::default()
    });
    let session = source
        .acquire(Facing::Environment, Some(Vec2::new(1280, 720)))
        .await
        .unwrap();

    let opens = probe.opens.lock().unwrap().clone();
    assert_eq!(opens.len(), 2);
    assert!(opens[0].is_compound());
    assert_eq!(opens[1], Constraints::new(Facing::Environment));
    assert!(session.capabilities().minimal_fallback);
    assert!(!session.capabilities().extended_constraints);
    source.release(&session);
}

#[tokio::test]
async fn test_permission_denied_is_not_retried() {
    let (mut source, probe) = source(Script {
        deny_permission: true,
        ..Default::default()
    });
    let result = source
        .acquire(Facing::Environment, Some(Vec2::new(640, 480)))
        .await;

    assert!(matches!(result, Err(DeviceError::PermissionDenied(_))));
    assert_eq!(probe.opens.lock().unwrap().len(), 1);
    assert_eq!(source.active_session(), None);
}

#[tokio::test]
async fn test_playback_failure_is_reported() {
    let (mut source, probe) = source(Script {
        fail_start: true,
        ..Default::default()
    });
    let result = source.acquire(Facing::Environment, None).await;
    assert!(matches!(result, Err(DeviceError::PlaybackFailed(_))));
    assert_eq!(probe.stopped_streams.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_current_frame_not_ready_until_device_warms_up() {
    let (mut source, probe) = source(Script::default());
    let session = source.acquire(Facing::Environment, None).await.unwrap();

    assert_eq!(source.current_frame(&session).unwrap_err(), FrameError::NotReady);

    probe.frames_ready.store(true, Ordering::SeqCst);
    let frame = wait_for_frame(&source, &session).await.expect("no frame arrived");
    assert_eq!(frame.size(), Vec2::new(4, 2));
    assert!(frame.sequence >= 1);
    source.release(&session);
}

#[tokio::test]
async fn test_release_is_idempotent() {
    let (mut source, probe) = source(Script::default());
    let session = source.acquire(Facing::Environment, None).await.unwrap();

    source.release(&session);
    source.release(&session);
    source.closed().await;

    assert_eq!(probe.stopped_streams.load(Ordering::SeqCst), 1);
    assert_eq!(source.active_session(), None);
    assert_eq!(source.current_frame(&session).unwrap_err(), FrameError::Released);
}

#[tokio::test]
async fn test_second_acquire_replaces_first_session() {
    let (mut source, probe) = source(Script::default());
    let first = source.acquire(Facing::Environment, None).await.unwrap();
    let second = source.acquire(Facing::User, None).await.unwrap();

    assert_ne!(first.id(), second.id());
    assert_eq!(probe.stopped_streams.load(Ordering::SeqCst), 1);
    assert_eq!(source.active_session(), Some(second.id()));

    // stale token must not touch the live session
    source.release(&first);
    assert_eq!(source.active_session(), Some(second.id()));
    source.release(&second);
    source.closed().await;
    assert_eq!(probe.stopped_streams.load(Ordering::SeqCst), 2);
    assert_eq!(probe.max_streaming.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_capture_error_marks_stream_lost() {
    let (mut source, _probe) = source(Script {
        fail_capture: true,
        ..Default::default()
    });
    let session = source.acquire(Facing::Environment, None).await.unwrap();

    let mut lost = false;
    for _ in 0..500 {
        if matches!(source.current_frame(&session), Err(FrameError::Lost)) {
            lost = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert!(lost);
    source.release(&session);
}

#[tokio::test]
async fn test_drop_stops_the_device() {
    let (mut source, probe) = source(Script::default());
    let _session = source.acquire(Facing::Environment, None).await.unwrap();
    drop(source);
    assert!(wait_for_stopped(&probe, 1).await);
}

#[tokio::test]
async fn test_idle_device_is_polled_with_backoff() {
    let (mut source, probe) = source(Script::default());
    let session = source.acquire(Facing::Environment, None).await.unwrap();
    // no frames ready: the worker keeps polling with a backoff, not spinning
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(probe.captures.load(Ordering::SeqCst) < 25);

    source.release(&session);
    assert_eq!(source.active_session(), None);
    source.closed().await;
    assert_eq!(probe.stopped_streams.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_abandoned_acquire_closes_the_device() {
    let (mut source, probe) = source(Script {
        open_delay: Some(Duration::from_millis(30)),
        ..Default::default()
    });
    let abandoned = tokio::time::timeout(
        Duration::from_millis(5),
        source.acquire(Facing::Environment, None),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(source.active_session(), None);

    // the worker finishes opening, finds nobody waiting and closes again
    assert!(wait_for_stopped(&probe, 1).await);
    assert_eq!(probe.streaming_now.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_acquire_after_abandoned_acquire_opens_one_device_at_a_time() {
    let (mut source, probe) = source(Script {
        open_delay: Some(Duration::from_millis(30)),
        ..Default::default()
    });
    let abandoned = tokio::time::timeout(
        Duration::from_millis(5),
        source.acquire(Facing::Environment, None),
    )
    .await;
    assert!(abandoned.is_err());

    let session = source.acquire(Facing::Environment, None).await.unwrap();
    assert_eq!(source.active_session(), Some(session.id()));
    assert_eq!(probe.max_streaming.load(Ordering::SeqCst), 1);
    assert_eq!(probe.stopped_streams.load(Ordering::SeqCst), 1);

    source.release(&session);
    source.closed().await;
    assert_eq!(probe.streaming_now.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_dropping_source_after_abandoned_acquire_closes_the_device() {
    let (mut source, probe) = source(Script::default());
    probe.frames_ready.store(true, Ordering::SeqCst);
    {
        let mut acquire = std::pin::pin!(source.acquire(Facing::Environment, None));
        // poll once so the worker is spawned, then let it start streaming
        std::future::poll_fn(|cx| {
            let _ = acquire.as_mut().poll(cx);
            std::task::Poll::Ready(())
        })
        .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    drop(source);
    assert!(wait_for_stopped(&probe, 1).await);
    assert_eq!(probe.streaming_now.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_undecodable_frames_are_skipped() {
    let (mut source, probe) = source(Script {
        corrupt_frames: 3,
        ..Default::default()
    });
    let session = source.acquire(Facing::Environment, None).await.unwrap();
    probe.frames_ready.store(true, Ordering::SeqCst);

    let frame = wait_for_frame(&source, &session).await.expect("stream was dropped");
    assert_eq!(frame.size(), Vec2::new(4, 2));
    assert!(frame.sequence >= 1);
    assert!(!matches!(source.current_frame(&session), Err(FrameError::Lost)));
    source.release(&session);
}


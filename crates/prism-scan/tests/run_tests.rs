mod common;

use {
    common::{MockDetector, MockSource},
    prism_camera::DeviceError,
    prism_scan::{ScanConfig, ScanController, ScanStatus},
    std::{sync::Arc, time::Duration},
    tokio::sync::Notify,
};

#[tokio::test(start_paused = true)]
async fn test_run_loop_never_overlaps() {
    let (source, source_probe) = MockSource::new();
    let (detector, probe) = MockDetector::new();
    let mut controller = ScanController::new(
        source,
        detector.with_delay(Duration::from_millis(250)),
        ScanConfig::new().with_interval(Duration::from_millis(100)),
    );
    let handle = controller.handle();

    let driver = async {
        assert!(handle.start());
        tokio::time::sleep(Duration::from_secs(3)).await;
        let snapshot = handle.snapshot();
        assert!(snapshot.status.is_scanning());
        assert_eq!(snapshot.result.unwrap().label, "A");
        assert!(handle.shutdown());
    };
    tokio::join!(controller.run(), driver);

    assert!(probe.call_count() >= 5);
    assert_eq!(probe.max_concurrent(), 1);
    assert_eq!(source_probe.release_count(), 1);
    assert_eq!(controller.status(), &ScanStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_first_capture_after_one_interval() {
    let (source, _source_probe) = MockSource::new();
    let (detector, probe) = MockDetector::new();
    let mut controller = ScanController::new(source, detector, ScanConfig::new());
    let handle = controller.handle();

    let driver = async {
        handle.start();
        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(probe.call_count(), 0);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(probe.call_count(), 1);
        handle.shutdown();
    };
    tokio::join!(controller.run(), driver);
}

#[tokio::test(start_paused = true)]
async fn test_stop_while_acquiring() {
    let (source, source_probe) = MockSource::new();
    let (detector, probe) = MockDetector::new();
    let gate = Arc::new(Notify::new());
    *source_probe.acquire_gate.lock().unwrap() = Some(Arc::clone(&gate));
    let mut controller = ScanController::new(source, detector, ScanConfig::new());
    let handle = controller.handle();

    let driver = async {
        let mut snapshots = handle.snapshots();
        handle.start();
        snapshots
            .wait_for(|s| s.status == ScanStatus::AcquiringDevice)
            .await
            .unwrap();
        handle.stop();
        snapshots
            .wait_for(|s| s.status == ScanStatus::Idle)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        handle.shutdown();
    };
    tokio::join!(controller.run(), driver);

    assert_eq!(source_probe.acquire_count(), 1);
    assert_eq!(source_probe.release_count(), 0);
    assert_eq!(probe.call_count(), 0);
    assert!(controller.session().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_retry_command_recovers() {
    let (source, source_probe) = MockSource::new();
    source_probe.fail_next_acquire(DeviceError::NoDevice("unplugged".to_string()));
    let (detector, _probe) = MockDetector::new();
    let mut controller = ScanController::new(source, detector, ScanConfig::new());
    let handle = controller.handle();

    let driver = async {
        let mut snapshots = handle.snapshots();
        handle.start();
        snapshots.wait_for(|s| s.status.is_failed()).await.unwrap();
        handle.retry();
        snapshots
            .wait_for(|s| s.result.is_some())
            .await
            .unwrap();
        handle.shutdown();
    };
    tokio::join!(controller.run(), driver);

    assert_eq!(source_probe.acquire_count(), 2);
    assert_eq!(source_probe.release_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_ends_when_every_handle_is_dropped() {
    let (source, source_probe) = MockSource::new();
    let (detector, _probe) = MockDetector::new();
    let mut controller = ScanController::new(source, detector, ScanConfig::new());
    let handle = controller.handle();
    let other = handle.clone();

    let driver = async move {
        let mut snapshots = handle.snapshots();
        handle.start();
        snapshots.wait_for(|s| s.status.is_scanning()).await.unwrap();
        drop(handle);
        tokio::time::sleep(Duration::from_secs(2)).await;
        drop(other);
    };
    let finished = tokio::time::timeout(Duration::from_secs(10), async {
        tokio::join!(controller.run(), driver);
    })
    .await;

    assert!(finished.is_ok());
    assert_eq!(source_probe.release_count(), 1);
    assert_eq!(controller.status(), &ScanStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_run_without_handles_returns_at_once() {
    let (source, source_probe) = MockSource::new();
    let (detector, _probe) = MockDetector::new();
    let mut controller = ScanController::new(source, detector, ScanConfig::new());
    drop(controller.handle());

    let finished = tokio::time::timeout(Duration::from_secs(1), controller.run()).await;
    assert!(finished.is_ok());
    assert_eq!(source_probe.acquire_count(), 0);

    // a fresh handle reopens the command channel
    let handle = controller.handle();
    let driver = async {
        let mut snapshots = handle.snapshots();
        handle.start();
        snapshots.wait_for(|s| s.status.is_scanning()).await.unwrap();
        handle.shutdown();
    };
    tokio::join!(controller.run(), driver);
    assert_eq!(source_probe.acquire_count(), 1);
    assert_eq!(source_probe.release_count(), 1);
}

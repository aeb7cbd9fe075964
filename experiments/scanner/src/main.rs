mod args;

use {
    anyhow::{Context, Result},
    args::{DetectorChoice, ScannerArgs},
    prism_base::{init_file_logger, init_stdout_logger, log},
    prism_camera::{CameraConfig, CameraSource, V4l2Provider},
    prism_infer::{InferenceEngine, ModelLocation, OnnxBackend},
    prism_scan::{
        AnyDetector, LocalDetector, RemoteConfig, RemoteDetector, ScanController, ScanHandle,
        ScanSnapshot, ScanStatus,
    },
    std::sync::Arc,
    tokio::{
        io::{AsyncBufReadExt, BufReader},
        sync::watch,
    },
};

fn build_detector(args: &ScannerArgs) -> Result<AnyDetector> {
    match &args.detector {
        DetectorChoice::Local { model, labels } => {
            let engine = Arc::new(
                InferenceEngine::new(OnnxBackend::new(args.device.clone()))
                    .with_input_spec(args.input_spec()),
            );
            let location = ModelLocation::files(model, labels);

            // warm up in the background; a failed load is retried by the next scan
            log::info!("loading {} ({})", model.display(), labels.display());
            tokio::spawn({
                let engine = Arc::clone(&engine);
                let location = location.clone();
                async move {
                    if let Err(error) = engine.load(location).await {
                        println!("! model not loaded: {error}");
                    }
                }
            });
            Ok(LocalDetector::new(engine, location).into())
        }
        DetectorChoice::Remote { endpoint } => {
            let config = RemoteConfig::new(endpoint.clone()).with_jpeg_quality(args.jpeg_quality);
            log::info!("remote detection via {}", config.scan_url());
            Ok(RemoteDetector::new(config)?.into())
        }
    }
}

/// Print status changes and newly published results.
async fn print_snapshots(mut snapshots: watch::Receiver<ScanSnapshot>) {
    let mut last = ScanSnapshot::default();
    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow_and_update().clone();

        let scanning_toggle = last.status.is_scanning() && snapshot.status.is_scanning();
        if snapshot.status != last.status && !scanning_toggle {
            match &snapshot.status {
                ScanStatus::Failed(error) => println!("! {error} (type 'retry')"),
                status => println!("- {status}"),
            }
        }
        if snapshot.result != last.result {
            match &snapshot.result {
                Some(result) => match &result.product_id {
                    Some(id) => println!("> {} [{}] {:.1}%", result.label, id, result.percent()),
                    None => println!("> {} {:.1}%", result.label, result.percent()),
                },
                None => println!("> (no result)"),
            }
        }
        last = snapshot;
    }
}

/// Map stdin lines to controller commands. EOF shuts the controller down.
async fn read_commands(handle: ScanHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => {
                log::error!("stdin: {}", error);
                break;
            }
        };
        let sent = match line.trim() {
            "" => continue,
            "start" | "s" => handle.start(),
            "stop" | "x" => handle.stop(),
            "retry" | "r" => handle.retry(),
            "quit" | "q" | "exit" => break,
            other => {
                println!("unknown command '{other}', expected start, stop, retry or quit");
                continue;
            }
        };
        if !sent {
            return;
        }
    }
    handle.shutdown();
}

#[tokio::main]
async fn main() -> Result<()> {
    let argv: Vec<String> = std::env::args().collect();
    let args = ScannerArgs::from_args(&argv)?;

    match &args.log_dir {
        Some(dir) => init_file_logger(dir)
            .with_context(|| format!("cannot log to {}", dir.display()))?,
        None => init_stdout_logger(),
    }

    let detector = build_detector(&args)?;

    let mut camera = CameraConfig::default()
        .with_environment_device(&args.camera)
        .with_format(args.format);
    if let Some(front) = &args.front_camera {
        camera = camera.with_user_device(front);
    }
    let source = CameraSource::new(V4l2Provider::new(camera));

    let mut controller = ScanController::new(source, detector, args.scan_config());
    let handle = controller.handle();

    tokio::spawn(print_snapshots(handle.snapshots()));
    tokio::spawn(read_commands(handle.clone()));
    tokio::spawn({
        let handle = handle.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                handle.shutdown();
            }
        }
    });

    println!("commands: start, stop, retry, quit");
    if args.start {
        handle.start();
    }
    controller.run().await;
    controller.source_mut().closed().await;

    if let AnyDetector::Local(local) = controller.detector() {
        local.unload().await;
    }
    Ok(())
}

use {
    anyhow::{Context, Result, anyhow, bail},
    prism_base::Vec2,
    prism_camera::Facing,
    prism_image::PixelFormat,
    prism_infer::{Device, InputSpec, Normalization},
    prism_scan::ScanConfig,
    std::{path::PathBuf, time::Duration},
};

const USAGE: &str = "Usage: scanner (--model <path> --labels <path> | --remote <url>) \
[--camera <dev>] [--front-camera <dev>] [--facing environment|user] [--format mjpeg|yuyv] \
[--size <WxH>|none] [--interval-ms <n>] [--threshold <0-1>] [--max-failures <n>] \
[--input-size <px>] [--normalization unit|signed|imagenet] [--cuda <id>] \
[--jpeg-quality <1-100>] [--log-dir <dir>] [--start]";

#[derive(Clone, Debug)]
pub enum DetectorChoice {
    Local { model: PathBuf, labels: PathBuf },
    Remote { endpoint: String },
}

#[derive(Clone, Debug)]
pub struct ScannerArgs {
    pub detector: DetectorChoice,
    pub camera: PathBuf,
    pub front_camera: Option<PathBuf>,
    pub facing: Facing,
    pub format: PixelFormat,
    pub size_hint: Option<Vec2<usize>>,
    pub interval: Duration,
    pub threshold: f32,
    pub max_failures: u32,
    pub input_size: usize,
    pub normalization: Normalization,
    pub device: Device,
    pub jpeg_quality: u8,
    pub log_dir: Option<PathBuf>,
    pub start: bool,
}

fn value<'a>(args: &'a [String], idx: usize, flag: &str) -> Result<&'a str> {
    args.get(idx)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("{flag} requires a value"))
}

fn parse_size(text: &str) -> Result<Option<Vec2<usize>>> {
    if text == "none" {
        return Ok(None);
    }
    let (width, height) = text
        .split_once('x')
        .ok_or_else(|| anyhow!("--size must look like 1280x720"))?;
    let width = width.parse::<usize>().context("--size width must be an integer")?;
    let height = height.parse::<usize>().context("--size height must be an integer")?;
    if width == 0 || height == 0 {
        bail!("--size must be non-zero");
    }
    Ok(Some(Vec2::new(width, height)))
}

impl ScannerArgs {
    pub fn from_args(args: &[String]) -> Result<Self> {
        let defaults = ScanConfig::default();
        let mut model: Option<PathBuf> = None;
        let mut labels: Option<PathBuf> = None;
        let mut remote: Option<String> = None;
        let mut camera = PathBuf::from("/dev/video0");
        let mut front_camera: Option<PathBuf> = None;
        let mut facing = Facing::Environment;
        let mut format = PixelFormat::Jpeg;
        let mut size_hint = defaults.size_hint();
        let mut interval = defaults.interval();
        let mut threshold = defaults.threshold();
        let mut max_failures = defaults.max_consecutive_failures();
        let mut input_size = 224usize;
        let mut normalization = Normalization::default();
        let mut device = Device::Cpu;
        let mut jpeg_quality = 80u8;
        let mut log_dir: Option<PathBuf> = None;
        let mut start = false;

        let mut idx = 1;
        while idx < args.len() {
            let flag = args[idx].as_str();
            match flag {
                "--model" => model = Some(PathBuf::from(value(args, idx + 1, flag)?)),
                "--labels" => labels = Some(PathBuf::from(value(args, idx + 1, flag)?)),
                "--remote" => remote = Some(value(args, idx + 1, flag)?.to_string()),
                "--camera" => camera = PathBuf::from(value(args, idx + 1, flag)?),
                "--front-camera" => front_camera = Some(PathBuf::from(value(args, idx + 1, flag)?)),
                "--facing" => {
                    facing = match value(args, idx + 1, flag)? {
                        "environment" | "rear" => Facing::Environment,
                        "user" | "front" => Facing::User,
                        other => bail!("--facing must be environment or user, got {other}"),
                    }
                }
                "--format" => {
                    format = match value(args, idx + 1, flag)? {
                        "mjpeg" | "jpeg" => PixelFormat::Jpeg,
                        "yuyv" => PixelFormat::Yuyv,
                        "rgb" => PixelFormat::Rgb8,
                        other => bail!("--format must be mjpeg, yuyv or rgb, got {other}"),
                    }
                }
                "--size" => size_hint = parse_size(value(args, idx + 1, flag)?)?,
                "--interval-ms" => {
                    let ms = value(args, idx + 1, flag)?
                        .parse::<u64>()
                        .context("--interval-ms must be an integer")?;
                    if ms == 0 {
                        bail!("--interval-ms must be at least 1");
                    }
                    interval = Duration::from_millis(ms);
                }
                "--threshold" => {
                    threshold = value(args, idx + 1, flag)?
                        .parse::<f32>()
                        .context("--threshold must be a number")?;
                    if !(0.0..=1.0).contains(&threshold) {
                        bail!("--threshold must be between 0 and 1");
                    }
                }
                "--max-failures" => {
                    max_failures = value(args, idx + 1, flag)?
                        .parse::<u32>()
                        .context("--max-failures must be an integer")?;
                    if max_failures == 0 {
                        bail!("--max-failures must be at least 1");
                    }
                }
                "--input-size" => {
                    input_size = value(args, idx + 1, flag)?
                        .parse::<usize>()
                        .context("--input-size must be an integer")?;
                    if input_size == 0 {
                        bail!("--input-size must be at least 1");
                    }
                }
                "--normalization" => {
                    normalization = match value(args, idx + 1, flag)? {
                        "unit" => Normalization::UnitRange,
                        "signed" => Normalization::SignedUnit,
                        "imagenet" => Normalization::IMAGENET,
                        other => bail!("--normalization must be unit, signed or imagenet, got {other}"),
                    }
                }
                "--cuda" => {
                    let device_id = value(args, idx + 1, flag)?
                        .parse::<i32>()
                        .context("--cuda must be a device index")?;
                    device = Device::Cuda { device_id };
                }
                "--jpeg-quality" => {
                    jpeg_quality = value(args, idx + 1, flag)?
                        .parse::<u8>()
                        .context("--jpeg-quality must be between 1 and 100")?;
                    if !(1..=100).contains(&jpeg_quality) {
                        bail!("--jpeg-quality must be between 1 and 100");
                    }
                }
                "--log-dir" => log_dir = Some(PathBuf::from(value(args, idx + 1, flag)?)),
                "--start" => {
                    start = true;
                    idx += 1;
                    continue;
                }
                "--help" | "-h" => bail!(USAGE),
                other => bail!("unrecognised argument: {other}\n\n{USAGE}"),
            }
            idx += 2;
        }

        let detector = match (model, labels, remote) {
            (Some(model), Some(labels), None) => DetectorChoice::Local { model, labels },
            (None, None, Some(endpoint)) => DetectorChoice::Remote { endpoint },
            (Some(_), None, None) => bail!("--model needs --labels\n\n{USAGE}"),
            (None, Some(_), None) => bail!("--labels needs --model\n\n{USAGE}"),
            (None, None, None) => bail!(USAGE),
            _ => bail!("use either --model/--labels or --remote, not both\n\n{USAGE}"),
        };

        Ok(Self {
            detector,
            camera,
            front_camera,
            facing,
            format,
            size_hint,
            interval,
            threshold,
            max_failures,
            input_size,
            normalization,
            device,
            jpeg_quality,
            log_dir,
            start,
        })
    }

    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig::new()
            .with_interval(self.interval)
            .with_threshold(self.threshold)
            .with_max_consecutive_failures(self.max_failures)
            .with_facing(self.facing)
            .with_size_hint(self.size_hint)
    }

    pub fn input_spec(&self) -> InputSpec {
        InputSpec::new()
            .with_size(Vec2::new(self.input_size, self.input_size))
            .with_normalization(self.normalization)
    }
}

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use spot_detect::common::{ClassVocabulary, DevicePreference, ModelConfig, OutputMode};
use spot_detect::data::FsAccess;
use spot_detect::rendering::{save_overlay, Artifact};
use spot_detect::{SpotDetector, SpotError};

/// Detect free, occupied and partially free parking spaces in an image.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image to analyse
    #[arg(long, value_name = "IMAGE")]
    image: PathBuf,
    /// Output representation: json or overlay
    #[arg(long, default_value = "json")]
    mode: OutputMode,
    /// Where to write the overlay PNG (default: output/output.png)
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// ONNX checkpoint, overrides SPOT_MODEL_PATH
    #[arg(long, value_name = "ONNX")]
    model: Option<PathBuf>,
    /// Class names file, one per line, overrides SPOT_LABELS_PATH
    #[arg(long, value_name = "FILE")]
    labels: Option<PathBuf>,
    /// Confidence threshold, overrides SPOT_CONF_THRESHOLD
    #[arg(long)]
    threshold: Option<f32>,
    /// auto, cpu, cuda[:id], tensorrt[:id] or coreml, overrides SPOT_DEVICE
    #[arg(long)]
    device: Option<String>,
}

fn build_config(args: &Args) -> Result<ModelConfig, SpotError> {
    let mut config = ModelConfig::from_env()?;
    if let Some(model) = &args.model {
        config.weights_path = model.clone();
    }
    if let Some(labels) = &args.labels {
        config.vocabulary = ClassVocabulary::from_file(labels)?;
    }
    if let Some(threshold) = args.threshold {
        config = config.with_threshold(threshold);
    }
    if let Some(device) = &args.device {
        config = config.with_device(DevicePreference::parse(device)?);
    }
    config.validate()?;
    Ok(config)
}

fn run(args: Args) -> Result<(), SpotError> {
    let config = build_config(&args)?;

    // model first, so a bad checkpoint fails before any input is read
    let detector = SpotDetector::init(config)?;

    let bytes = std::fs::read(&args.image)
        .map_err(|err| SpotError::ImageDecode(format!("cannot read {}: {err}", args.image.display())))?;

    let now = Instant::now();
    let artifact = detector.process_image(&bytes, args.mode)?;
    log::info!("Processed {} in {:.2?}", args.image.display(), now.elapsed());

    match artifact {
        Artifact::Json(map) => {
            let text = serde_json::to_string_pretty(&map)
                .map_err(|err| SpotError::Render(err.to_string()))?;
            println!("{text}");
        }
        Artifact::Png(png) => {
            let path = match args.output {
                Some(path) => path,
                None => FsAccess::output_dir()
                    .map_err(|err| SpotError::Render(err.to_string()))?
                    .join("output.png"),
            };
            let saved = save_overlay(&png, &path)?;
            log::info!("Overlay written to {}", saved.display());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    log::debug!("{args:?}");

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            if err.is_fatal() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

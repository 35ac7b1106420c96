use anyhow::{Context, Result};
use camshot::config::{AppConfig, ConfigError};
use camshot::orchestrator::{run_with_retries, CaptureOrchestrator, CaptureResult, RetryPolicy};
use camshot::persistence::ImageStore;
use camshot::provider::RtspProvider;
use camshot::telemetry::{init_subscriber, TracingTelemetry};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "camshot", about = "Capture a single frame from a network camera")]
struct Cli {
    /// Configuration file (.yaml, .yml or .json)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Write the image here instead of the configured output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Print the capture result as JSON
    #[arg(long)]
    json: bool,

    /// ffmpeg executable used to decode the stream
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (mut config, applied) = match AppConfig::load(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            report_config_error(&cli.config, &e);
            return ExitCode::from(2);
        }
    };
    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.clone();
    }

    match run(&cli, &config, &applied) {
        Ok(result) if result.success => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn report_config_error(path: &std::path::Path, error: &ConfigError) {
    eprintln!("Configuration error in {}: {}", path.display(), error);
}

fn run(cli: &Cli, config: &AppConfig, applied: &[&str]) -> Result<CaptureResult> {
    init_subscriber(&config.logging).context("Failed to initialise logging")?;

    let camera_id = config.camera.camera_id.as_str();
    tracing::info!(
        camera_id,
        config = %cli.config.display(),
        "Configuration loaded"
    );
    for var in applied {
        tracing::info!(camera_id, var, "Applied environment override");
    }

    let provider = RtspProvider::new(config.camera.clone()).with_ffmpeg(cli.ffmpeg.as_str());
    let store = ImageStore::from_config(&config.output);
    let telemetry = TracingTelemetry::new(camera_id);
    let mut orchestrator =
        CaptureOrchestrator::new(config.camera.clone(), provider, store, telemetry);

    let result = run_with_retries(&mut orchestrator, &RetryPolicy::from_config(config))
        .context("Capture lifecycle sequencing failed")?;

    if cli.json {
        let rendered =
            serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
        println!("{}", rendered);
    } else {
        print_summary(&result);
    }

    Ok(result)
}

fn print_summary(result: &CaptureResult) {
    match &result.image_info {
        Some(info) if result.success => {
            println!("Captured {} from {}", info.file_path.display(), result.camera_id);
            println!(
                "  {}x{} {}, {} bytes",
                info.width, info.height, info.format, info.size
            );
        }
        _ => {
            println!("Capture from {} failed", result.camera_id);
            if let Some(stage) = result.failure_stage {
                println!("  stage: {}", stage);
            }
            if let Some(message) = &result.error_message {
                println!("  error: {}", message);
            }
        }
    }
    println!(
        "  state: {}, attempts: {}, took {:.1} ms",
        result.final_state, result.attempts, result.execution_time_ms
    );
}

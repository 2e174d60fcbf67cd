use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use channelcast_transcoder::capabilities::{self, CodecCapabilities};
use channelcast_transcoder::probe;
use channelcast_transcoder::state::HardwareAccelerationMode;
use channelcast_transcoder::step::EnvironmentVariable;
use channelcast_transcoder::{PipelineBuilder, PipelineRequest, TranscoderConfig};

#[derive(Parser, Debug)]
#[command(name = "channelcast")]
#[command(about = "Compile ffmpeg command lines for channel playout")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a pipeline request into an ffmpeg invocation
    Compile {
        /// Request JSON; read from stdin when omitted
        request: Option<PathBuf>,
    },
    /// Print the media facts ffprobe reports for a file
    Probe { file: PathBuf },
}

/// A compiled command, ready for a process supervisor to spawn.
#[derive(Serialize)]
struct CompiledCommand {
    program: PathBuf,
    environment: Vec<EnvironmentVariable>,
    arguments: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let config = config_from_env();

    match args.command {
        Command::Compile { request } => compile(&config, request.as_deref()).await,
        Command::Probe { file } => {
            let info = probe::probe(&config.ffprobe_path, &file)
                .await
                .with_context(|| format!("failed to probe {}", file.display()))?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
    }
}

async fn compile(config: &TranscoderConfig, request_path: Option<&Path>) -> anyhow::Result<()> {
    let raw = match request_path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("failed to read request from stdin")?;
            buf
        }
    };
    let request: PipelineRequest =
        serde_json::from_str(&raw).context("failed to parse pipeline request")?;

    let capabilities = load_capabilities(config, request.target.hardware_acceleration).await?;
    let pipeline = PipelineBuilder::new(&request, &capabilities, config)
        .build()
        .context("failed to compile pipeline")?;
    info!(
        inputs = pipeline.inputs().len(),
        hardware = pipeline.uses_hardware(),
        "pipeline compiled"
    );

    let command = CompiledCommand {
        program: config.ffmpeg_path.clone(),
        environment: pipeline.environment(),
        arguments: pipeline.arguments(),
    };
    println!("{}", serde_json::to_string_pretty(&command)?);
    Ok(())
}

/// Capability facts from `CHANNELCAST_CAPABILITIES` when set, otherwise from
/// the local ffmpeg codec listing.
async fn load_capabilities(
    config: &TranscoderConfig,
    mode: HardwareAccelerationMode,
) -> anyhow::Result<CodecCapabilities> {
    if let Ok(path) = std::env::var("CHANNELCAST_CAPABILITIES") {
        let raw = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read capabilities from {path}"))?;
        return serde_json::from_str(&raw).context("failed to parse capabilities");
    }
    if !mode.is_hardware() {
        return Ok(CodecCapabilities::default());
    }

    let listing = capabilities::query(&config.ffmpeg_path).await;
    let preferred = listing.preferred_acceleration();
    if preferred != mode {
        info!(requested = %mode, %preferred, "requested accelerator is not the preferred one");
    }
    Ok(listing.capabilities_for(mode))
}

fn config_from_env() -> TranscoderConfig {
    let defaults = TranscoderConfig::default();
    let var = |key: &str| std::env::var(key).ok();

    TranscoderConfig {
        ffmpeg_path: var("CHANNELCAST_FFMPEG")
            .map(PathBuf::from)
            .unwrap_or(defaults.ffmpeg_path),
        ffprobe_path: var("CHANNELCAST_FFPROBE")
            .map(PathBuf::from)
            .unwrap_or(defaults.ffprobe_path),
        reports_dir: var("CHANNELCAST_REPORTS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.reports_dir),
        fonts_dir: var("CHANNELCAST_FONTS_DIR")
            .map(PathBuf::from)
            .or(defaults.fonts_dir),
        vaapi_device: var("CHANNELCAST_VAAPI_DEVICE").unwrap_or(defaults.vaapi_device),
        hls_segment_secs: var("CHANNELCAST_HLS_SEGMENT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.hls_segment_secs),
    }
}

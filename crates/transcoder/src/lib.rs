#![allow(clippy::collapsible_if, clippy::redundant_closure)]
pub mod capabilities;
pub mod decision;
pub mod decoder;
pub mod encoder;
pub mod filter;
pub mod format;
pub mod input;
pub mod options;
pub mod pipeline;
pub mod probe;
pub mod profile;
pub mod state;
pub mod step;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::HardwareAccelerationMode;

pub use capabilities::{CodecCapabilities, FfmpegCodecList, HardwareCapabilities, SoftwareOnly};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineRequest};

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("no {step} for {format} with {mode} acceleration")]
    UnsupportedCombination {
        step: &'static str,
        format: String,
        mode: HardwareAccelerationMode,
    },
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("ffprobe failed: {0}")]
    ProbeFailed(String),
    #[error("ffmpeg failed: {0}")]
    FfmpegFailed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Global transcoder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscoderConfig {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// Where `FFREPORT` logs go when a playout item asks for a report.
    pub reports_dir: PathBuf,
    pub fonts_dir: Option<PathBuf>,
    /// Render node used when a VAAPI target does not name one.
    pub vaapi_device: String,
    pub hls_segment_secs: u32,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            reports_dir: PathBuf::from("/tmp/channelcast/reports"),
            fonts_dir: None,
            vaapi_device: "/dev/dri/renderD128".into(),
            hls_segment_secs: 4,
        }
    }
}

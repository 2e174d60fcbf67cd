//! Hardware capability facts.
//!
//! The compiler never probes devices itself. Callers hand it an implementation
//! of [`HardwareCapabilities`], typically built from already-parsed `vainfo`
//! output or an `ffmpeg -encoders` listing such as [`query`] returns.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::TranscodeError;
use crate::format::{PixelFormat, VideoFormat};
use crate::state::HardwareAccelerationMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Hardware,
    Software,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RateControlMode {
    Cqp,
    Cbr,
    Vbr,
}

impl RateControlMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cqp => "CQP",
            Self::Cbr => "CBR",
            Self::Vbr => "VBR",
        }
    }
}

pub trait HardwareCapabilities {
    fn can_decode(&self, format: VideoFormat, pixel_format: Option<PixelFormat>) -> Capability;

    fn can_encode(&self, format: VideoFormat, pixel_format: Option<PixelFormat>) -> Capability;

    fn rate_control_mode(&self, _format: VideoFormat) -> Option<RateControlMode> {
        None
    }
}

/// No accelerator available; everything runs in software.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareOnly;

impl HardwareCapabilities for SoftwareOnly {
    fn can_decode(&self, _: VideoFormat, _: Option<PixelFormat>) -> Capability {
        Capability::Software
    }

    fn can_encode(&self, _: VideoFormat, _: Option<PixelFormat>) -> Capability {
        Capability::Software
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecSupport {
    pub format: VideoFormat,
    #[serde(default = "eight_bit")]
    pub bit_depths: Vec<u8>,
}

fn eight_bit() -> Vec<u8> {
    vec![8]
}

impl CodecSupport {
    pub fn new(format: VideoFormat, bit_depths: &[u8]) -> Self {
        Self {
            format,
            bit_depths: bit_depths.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateControlSupport {
    pub format: VideoFormat,
    pub mode: RateControlMode,
}

/// Per-backend codec support as plain data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecCapabilities {
    #[serde(default)]
    pub decoders: Vec<CodecSupport>,
    #[serde(default)]
    pub encoders: Vec<CodecSupport>,
    #[serde(default)]
    pub rate_control: Vec<RateControlSupport>,
}

fn supports(list: &[CodecSupport], format: VideoFormat, pixel_format: Option<PixelFormat>) -> Capability {
    let depth = pixel_format.map(|pf| pf.bit_depth()).unwrap_or(8);
    let found = list
        .iter()
        .any(|c| c.format == format && c.bit_depths.contains(&depth));
    if found {
        Capability::Hardware
    } else {
        Capability::Software
    }
}

impl HardwareCapabilities for CodecCapabilities {
    fn can_decode(&self, format: VideoFormat, pixel_format: Option<PixelFormat>) -> Capability {
        supports(&self.decoders, format, pixel_format)
    }

    fn can_encode(&self, format: VideoFormat, pixel_format: Option<PixelFormat>) -> Capability {
        supports(&self.encoders, format, pixel_format)
    }

    fn rate_control_mode(&self, format: VideoFormat) -> Option<RateControlMode> {
        self.rate_control
            .iter()
            .find(|r| r.format == format)
            .map(|r| r.mode)
    }
}

/// Codec name fragment used in hardware decoder and encoder names.
pub(crate) fn hardware_codec_name(format: VideoFormat) -> Option<&'static str> {
    match format {
        VideoFormat::H264 => Some("h264"),
        VideoFormat::Hevc => Some("hevc"),
        VideoFormat::Mpeg2Video => Some("mpeg2"),
        VideoFormat::Mpeg4 => Some("mpeg4"),
        VideoFormat::Vc1 => Some("vc1"),
        VideoFormat::Vp9 => Some("vp9"),
        VideoFormat::Av1 => Some("av1"),
        _ => None,
    }
}

const PROBED_FORMATS: [VideoFormat; 7] = [
    VideoFormat::H264,
    VideoFormat::Hevc,
    VideoFormat::Mpeg2Video,
    VideoFormat::Mpeg4,
    VideoFormat::Vc1,
    VideoFormat::Vp9,
    VideoFormat::Av1,
];

static CODEC_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[VAS][A-Z.]{5}\s+(\S+)").unwrap());

/// Codec names from `ffmpeg -hide_banner -encoders` and `-decoders`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FfmpegCodecList {
    pub encoders: BTreeSet<String>,
    pub decoders: BTreeSet<String>,
}

impl FfmpegCodecList {
    pub fn parse(encoders: &str, decoders: &str) -> Self {
        Self {
            encoders: parse_names(encoders),
            decoders: parse_names(decoders),
        }
    }

    /// Pick the best available accelerator, or None for CPU.
    pub fn preferred_acceleration(&self) -> HardwareAccelerationMode {
        [
            HardwareAccelerationMode::Nvenc,
            HardwareAccelerationMode::Qsv,
            HardwareAccelerationMode::Vaapi,
            HardwareAccelerationMode::VideoToolbox,
            HardwareAccelerationMode::Amf,
        ]
        .into_iter()
        .find(|mode| self.encoders.contains(&format!("h264_{}", mode.as_str())))
        .unwrap_or(HardwareAccelerationMode::None)
    }

    /// Capability facts for one backend as far as the codec listing can tell.
    ///
    /// VAAPI and VideoToolbox decode through `-hwaccel`, which the listing does
    /// not show; common profiles are assumed when their encoder is present.
    pub fn capabilities_for(&self, mode: HardwareAccelerationMode) -> CodecCapabilities {
        let suffix = match mode {
            HardwareAccelerationMode::None => return CodecCapabilities::default(),
            m => m.as_str(),
        };

        let mut caps = CodecCapabilities::default();
        for format in PROBED_FORMATS {
            let Some(name) = hardware_codec_name(format) else {
                continue;
            };
            let depths: &[u8] = match format {
                VideoFormat::Hevc | VideoFormat::Vp9 | VideoFormat::Av1 => &[8, 10],
                _ => &[8],
            };

            if self.encoders.contains(&format!("{name}_{suffix}")) {
                caps.encoders.push(CodecSupport::new(format, depths));
            }

            let decodes = match mode {
                HardwareAccelerationMode::Nvenc => {
                    self.decoders.contains(&format!("{name}_cuvid"))
                }
                HardwareAccelerationMode::Qsv => self.decoders.contains(&format!("{name}_qsv")),
                HardwareAccelerationMode::Vaapi | HardwareAccelerationMode::VideoToolbox => {
                    self.encoders.contains(&format!("h264_{suffix}"))
                        && format != VideoFormat::Mpeg4
                }
                _ => false,
            };
            if decodes {
                caps.decoders.push(CodecSupport::new(format, depths));
            }
        }
        caps
    }
}

fn parse_names(listing: &str) -> BTreeSet<String> {
    listing
        .lines()
        .filter_map(|line| CODEC_LINE.captures(line))
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|name| name != "=")
        .collect()
}

/// List the codecs an ffmpeg binary offers. A binary that cannot be run
/// yields an empty listing, which compiles software-only pipelines.
pub async fn query(ffmpeg_path: &Path) -> FfmpegCodecList {
    let listing = async {
        let encoders = codec_listing(ffmpeg_path, "-encoders").await?;
        let decoders = codec_listing(ffmpeg_path, "-decoders").await?;
        Ok::<_, TranscodeError>(FfmpegCodecList::parse(&encoders, &decoders))
    };
    match listing.await {
        Ok(list) => {
            info!(
                encoders = list.encoders.len(),
                decoders = list.decoders.len(),
                preferred = %list.preferred_acceleration(),
                "ffmpeg codec query complete"
            );
            list
        }
        Err(e) => {
            warn!(error = %e, "could not query ffmpeg codecs, assuming software only");
            FfmpegCodecList::default()
        }
    }
}

async fn codec_listing(ffmpeg_path: &Path, flag: &str) -> Result<String, TranscodeError> {
    let output = tokio::process::Command::new(ffmpeg_path)
        .args(["-hide_banner", flag])
        .output()
        .await?;

    if !output.status.success() {
        return Err(TranscodeError::FfmpegFailed(format!(
            "{flag}: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

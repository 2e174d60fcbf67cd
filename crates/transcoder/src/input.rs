//! Input files and the input-level options that apply to them.
//!
//! Every optional input option carries an applicability predicate; adding an
//! option to an input that it does not apply to is a no-op.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::format::{FrameSize, PixelFormat, format_timestamp};

/// Probed facts about a video stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoStream {
    pub index: u32,
    pub codec: String,
    #[serde(default)]
    pub profile: Option<String>,
    /// ffprobe `pix_fmt`.
    #[serde(default)]
    pub pixel_format: Option<String>,
    pub frame_size: FrameSize,
    #[serde(default)]
    pub sample_aspect_ratio: Option<String>,
    #[serde(default)]
    pub display_aspect_ratio: Option<String>,
    /// Computed upstream; squares pixels vertically instead of horizontally.
    #[serde(default)]
    pub anamorphic_edge_case: bool,
    #[serde(default)]
    pub interlaced: bool,
    #[serde(default)]
    pub still_image: bool,
    #[serde(default)]
    pub color_transfer: Option<String>,
    #[serde(default)]
    pub frame_rate: Option<f64>,
}

impl VideoStream {
    pub fn pixel_format(&self) -> Option<PixelFormat> {
        self.pixel_format
            .as_deref()
            .and_then(PixelFormat::from_ffmpeg_name)
    }

    pub fn bit_depth(&self) -> u8 {
        self.pixel_format().map(|pf| pf.bit_depth()).unwrap_or(8)
    }

    pub fn is_anamorphic(&self) -> bool {
        match self.sample_aspect_ratio.as_deref().and_then(parse_ratio) {
            Some((num, den)) => num != den,
            None => false,
        }
    }

    pub fn is_hdr(&self) -> bool {
        matches!(
            self.color_transfer.as_deref(),
            Some("smpte2084") | Some("arib-std-b67")
        )
    }

    /// Frame size once non-square pixels have been squared.
    pub fn square_pixel_size(&self) -> FrameSize {
        let size = self.frame_size;
        let Some((num, den)) = self.sample_aspect_ratio.as_deref().and_then(parse_ratio) else {
            return size;
        };
        if num == den {
            return size;
        }
        if self.anamorphic_edge_case {
            let height = u64::from(size.height) * u64::from(num) / u64::from(den);
            FrameSize::new(size.width, height as u32)
        } else {
            let width = u64::from(size.width) * u64::from(num) / u64::from(den);
            FrameSize::new(width as u32, size.height)
        }
    }
}

/// Parse `num:den`, rejecting zero components.
fn parse_ratio(s: &str) -> Option<(u32, u32)> {
    let (num, den) = s.split_once(':')?;
    let num: u32 = num.trim().parse().ok()?;
    let den: u32 = den.trim().parse().ok()?;
    if num == 0 || den == 0 {
        None
    } else {
        Some((num, den))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioStream {
    pub index: u32,
    pub codec: String,
    pub channels: u32,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubtitleStream {
    pub index: u32,
    pub codec: String,
    #[serde(default)]
    pub language: Option<String>,
}

impl SubtitleStream {
    pub fn is_image_based(&self) -> bool {
        matches!(
            self.codec.as_str(),
            "hdmv_pgs_subtitle" | "pgssub" | "dvd_subtitle" | "dvdsub" | "dvb_subtitle"
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InputKind {
    Video(VideoStream),
    Audio(AudioStream),
    Concat,
    Watermark(VideoStream),
    Subtitle(SubtitleStream),
    GraphicsOverlay { size: FrameSize, frame_rate: u32 },
    NullAudio,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputFile {
    pub path: String,
    pub kind: InputKind,
    #[serde(default)]
    options: Vec<InputOption>,
}

impl InputFile {
    pub fn new(path: impl Into<String>, kind: InputKind) -> Self {
        Self {
            path: path.into(),
            kind,
            options: Vec::new(),
        }
    }

    /// Silence for sources without an audio stream.
    pub fn null_audio(channels: u32) -> Self {
        let layout = if channels > 2 { "5.1" } else { "stereo" };
        Self::new(
            format!("anullsrc=channel_layout={layout}:sample_rate=48000"),
            InputKind::NullAudio,
        )
    }

    pub fn is_still_image(&self) -> bool {
        match &self.kind {
            InputKind::Video(s) | InputKind::Watermark(s) => s.still_image,
            _ => false,
        }
    }

    pub fn codec(&self) -> Option<&str> {
        match &self.kind {
            InputKind::Video(s) | InputKind::Watermark(s) => Some(&s.codec),
            InputKind::Audio(s) => Some(&s.codec),
            InputKind::Subtitle(s) => Some(&s.codec),
            _ => None,
        }
    }

    pub fn stream_index(&self) -> u32 {
        match &self.kind {
            InputKind::Video(s) | InputKind::Watermark(s) => s.index,
            InputKind::Audio(s) => s.index,
            InputKind::Subtitle(s) => s.index,
            _ => 0,
        }
    }

    /// Register an option if it applies to this input. Returns whether it was kept.
    pub fn add_option(&mut self, option: InputOption) -> bool {
        if option.applies_to(self) {
            self.options.push(option);
            true
        } else {
            trace!(path = %self.path, ?option, "input option does not apply");
            false
        }
    }

    pub fn options(&self) -> &[InputOption] {
        &self.options
    }

    pub fn option_arguments(&self) -> Vec<String> {
        self.options
            .iter()
            .flat_map(|o| o.arguments(self))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputOption {
    StreamSeek(Duration),
    CopyTimestamp,
    InfiniteLoop,
    Readrate { initial_burst: u32 },
    DoNotIgnoreLoop,
    ConcatFormat,
    LavfiFormat,
    RawVideoFormat,
}

impl InputOption {
    pub fn applies_to(&self, input: &InputFile) -> bool {
        use InputKind::*;

        let still = input.is_still_image();
        match self {
            Self::StreamSeek(_) => matches!(input.kind, Video(_) | Audio(_)) && !still,
            Self::CopyTimestamp => matches!(input.kind, Video(_)),
            Self::InfiniteLoop => {
                matches!(input.kind, Video(_) | Audio(_) | Concat | Watermark(_))
            }
            Self::Readrate { .. } => matches!(input.kind, Video(_) | Audio(_) | Concat) && !still,
            Self::DoNotIgnoreLoop => matches!(input.kind, Watermark(_)) && !still,
            Self::ConcatFormat => matches!(input.kind, Concat),
            Self::LavfiFormat => matches!(input.kind, NullAudio),
            Self::RawVideoFormat => matches!(input.kind, GraphicsOverlay { .. }),
        }
    }

    pub fn arguments(&self, input: &InputFile) -> Vec<String> {
        match self {
            Self::StreamSeek(start) => vec!["-ss".into(), format_timestamp(*start)],
            Self::CopyTimestamp => vec!["-copyts".into()],
            Self::InfiniteLoop if input.is_still_image() => vec!["-loop".into(), "1".into()],
            Self::InfiniteLoop => vec!["-stream_loop".into(), "-1".into()],
            Self::Readrate { initial_burst } => {
                let mut args = vec!["-readrate".to_string(), "1.0".to_string()];
                if *initial_burst > 0 {
                    args.push("-readrate_initial_burst".into());
                    args.push(initial_burst.to_string());
                }
                args
            }
            Self::DoNotIgnoreLoop => vec!["-ignore_loop".into(), "0".into()],
            Self::ConcatFormat => [
                "-f",
                "concat",
                "-safe",
                "0",
                "-protocol_whitelist",
                "file,http,tcp,https,tcp,tls",
                "-probesize",
                "32",
            ]
            .map(String::from)
            .to_vec(),
            Self::LavfiFormat => vec!["-f".into(), "lavfi".into()],
            Self::RawVideoFormat => match &input.kind {
                InputKind::GraphicsOverlay { size, frame_rate } => vec![
                    "-f".into(),
                    "rawvideo".into(),
                    "-pix_fmt".into(),
                    "bgra".into(),
                    "-s".into(),
                    size.to_string(),
                    "-r".into(),
                    frame_rate.to_string(),
                ],
                _ => Vec::new(),
            },
        }
    }
}

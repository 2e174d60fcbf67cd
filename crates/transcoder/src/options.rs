//! Global options, output options and output formats.

use std::time::Duration;

use crate::filter::SubtitleMethod;
use crate::format::{PixelFormat, format_timestamp};
use crate::profile::ChannelMetadata;
use crate::state::{FrameState, HardwareAccelerationMode, OutputFormatKind};
use crate::step::{EnvironmentVariable, PipelineStep};

/// Device setup for the accelerator the pipeline uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareInit {
    pub mode: HardwareAccelerationMode,
    /// Whether the decoder runs on the device.
    pub decode: bool,
    pub device: Option<String>,
    pub driver: Option<String>,
}

impl HardwareInit {
    fn options(&self) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        let mut push = |items: &[&str]| args.extend(items.iter().map(|s| s.to_string()));
        match self.mode {
            HardwareAccelerationMode::Nvenc => {
                if self.decode {
                    push(&["-hwaccel", "cuda", "-hwaccel_output_format", "cuda"]);
                } else {
                    push(&["-init_hw_device", "cuda"]);
                }
            }
            HardwareAccelerationMode::Qsv => {
                match &self.device {
                    Some(device) => {
                        let va = format!("vaapi=va:{device}");
                        push(&["-init_hw_device", va.as_str(), "-init_hw_device", "qsv=hw@va"]);
                    }
                    None => push(&["-init_hw_device", "qsv=hw"]),
                }
                push(&["-filter_hw_device", "hw"]);
                if self.decode {
                    push(&["-hwaccel", "qsv", "-hwaccel_output_format", "qsv"]);
                }
            }
            HardwareAccelerationMode::Vaapi => {
                if self.decode {
                    push(&["-hwaccel", "vaapi", "-hwaccel_output_format", "vaapi"]);
                }
                let device = self.device.as_deref().unwrap_or("/dev/dri/renderD128");
                push(&["-vaapi_device", device]);
            }
            HardwareAccelerationMode::VideoToolbox => {
                if self.decode {
                    push(&["-hwaccel", "videotoolbox"]);
                }
            }
            HardwareAccelerationMode::None | HardwareAccelerationMode::Amf => {}
        }
        args
    }

    fn environment(&self) -> Vec<EnvironmentVariable> {
        match (self.mode, &self.device, &self.driver) {
            (HardwareAccelerationMode::Nvenc, Some(device), _) => {
                vec![EnvironmentVariable::new("CUDA_VISIBLE_DEVICES", device)]
            }
            (HardwareAccelerationMode::Vaapi | HardwareAccelerationMode::Qsv, _, Some(driver)) => {
                vec![EnvironmentVariable::new("LIBVA_DRIVER_NAME", driver)]
            }
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobalOption {
    HardwareAcceleration(HardwareInit),
    Threads(u32),
    /// `-nostdin -hide_banner -nostats -loglevel error`
    Quiet,
    /// Regenerate timestamps and drop corrupt packets.
    GenerateTimestamps,
    /// Write an ffmpeg report into a folder.
    Report(String),
}

impl PipelineStep for GlobalOption {
    fn environment_variables(&self) -> Vec<EnvironmentVariable> {
        match self {
            Self::HardwareAcceleration(init) => init.environment(),
            Self::Report(folder) => vec![EnvironmentVariable::new(
                "FFREPORT",
                format!("file={}/ffmpeg-%t.log:level=32", folder.trim_end_matches('/')),
            )],
            _ => Vec::new(),
        }
    }

    fn global_options(&self) -> Vec<String> {
        match self {
            Self::HardwareAcceleration(init) => init.options(),
            Self::Threads(n) => vec!["-threads".into(), n.to_string()],
            Self::Quiet => ["-nostdin", "-hide_banner", "-nostats", "-loglevel", "error"]
                .map(String::from)
                .to_vec(),
            Self::GenerateTimestamps => vec!["-fflags".into(), "+genpts+discardcorrupt+igndts".into()],
            Self::Report(_) => Vec::new(),
        }
    }

    fn next_state(&self, current: &FrameState) -> FrameState {
        match self {
            Self::HardwareAcceleration(init) => FrameState {
                hardware_acceleration_mode: init.mode,
                ..current.clone()
            },
            _ => current.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputOption {
    /// `-muxdelay 0 -muxpreload 0`
    NoMuxDelay,
    FastStart { fragmented: bool },
    ClosedGop,
    SceneChangeThreshold(u64),
    NoAutoScale,
    VideoTrackTimescale,
    VideoBitrate { bitrate: u32, buffer_size: u32 },
    FrameRate(u32),
    PixelFormat(PixelFormat),
    AudioChannels(u32),
    AudioBitrate { bitrate: u32, buffer_size: u32 },
    AudioSampleRate(u32),
    Duration(Duration),
    /// `-c copy` for every stream.
    CopyAll,
    Metadata(ChannelMetadata),
    SubtitleCodec(SubtitleMethod),
    /// A plain `-vf` chain for single-input jobs.
    SimpleVideoFilter(String),
}

fn kilo(n: u32) -> String {
    if n % 1000 == 0 {
        format!("{}k", n / 1000)
    } else {
        n.to_string()
    }
}

impl PipelineStep for OutputOption {
    fn output_options(&self) -> Vec<String> {
        let args: Vec<String> = match self {
            Self::NoMuxDelay => vec!["-muxdelay".into(), "0".into(), "-muxpreload".into(), "0".into()],
            Self::FastStart { fragmented: false } => vec!["-movflags".into(), "+faststart".into()],
            Self::FastStart { fragmented: true } => vec![
                "-movflags".into(),
                "+faststart+frag_keyframe+separate_moof+omit_tfhd_offset+empty_moov+delay_moov".into(),
            ],
            Self::ClosedGop => vec!["-flags".into(), "cgop".into()],
            Self::SceneChangeThreshold(n) => vec!["-sc_threshold".into(), n.to_string()],
            Self::NoAutoScale => vec!["-noautoscale".into()],
            Self::VideoTrackTimescale => vec!["-video_track_timescale".into(), "90000".into()],
            Self::VideoBitrate {
                bitrate,
                buffer_size,
            } => vec![
                "-b:v".into(),
                format!("{bitrate}k"),
                "-maxrate:v".into(),
                format!("{bitrate}k"),
                "-bufsize:v".into(),
                format!("{buffer_size}k"),
            ],
            Self::FrameRate(r) => vec!["-r".into(), r.to_string(), "-vsync".into(), "cfr".into()],
            Self::PixelFormat(pf) => vec!["-pix_fmt".into(), pf.ffmpeg_name().into()],
            Self::AudioChannels(n) => vec!["-ac".into(), n.to_string()],
            Self::AudioBitrate {
                bitrate,
                buffer_size,
            } => vec![
                "-b:a".into(),
                format!("{bitrate}k"),
                "-maxrate:a".into(),
                format!("{bitrate}k"),
                "-bufsize:a".into(),
                format!("{buffer_size}k"),
            ],
            Self::AudioSampleRate(rate) => vec!["-ar".into(), kilo(*rate)],
            Self::Duration(d) => vec!["-t".into(), format_timestamp(*d)],
            Self::CopyAll => vec!["-c".into(), "copy".into()],
            Self::Metadata(metadata) => {
                let mut args = vec!["-map_metadata".to_string(), "-1".to_string()];
                if let Some(provider) = &metadata.service_provider {
                    args.push("-metadata".into());
                    args.push(format!("service_provider=\"{provider}\""));
                }
                if let Some(name) = &metadata.service_name {
                    args.push("-metadata".into());
                    args.push(format!("service_name=\"{name}\""));
                }
                if let Some(language) = &metadata.audio_language {
                    args.push("-metadata:s:a:0".into());
                    args.push(format!("language={language}"));
                }
                args
            }
            Self::SubtitleCodec(method) => match method {
                SubtitleMethod::Copy => vec!["-c:s".into(), "copy".into()],
                SubtitleMethod::Convert => vec!["-c:s".into(), "dvdsub".into()],
                SubtitleMethod::Burn => Vec::new(),
            },
            Self::SimpleVideoFilter(chain) => vec!["-vf".into(), chain.clone()],
        };
        args
    }

    fn next_state(&self, current: &FrameState) -> FrameState {
        match self {
            Self::VideoBitrate {
                bitrate,
                buffer_size,
            } => FrameState {
                video_bitrate: Some(*bitrate),
                video_buffer_size: Some(*buffer_size),
                ..current.clone()
            },
            Self::FrameRate(r) => FrameState {
                frame_rate: Some(*r),
                ..current.clone()
            },
            Self::PixelFormat(pf) => current.with_pixel_format(*pf),
            _ => current.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlsOutput {
    pub playlist_path: String,
    pub segment_template: String,
    pub segment_secs: u32,
    pub frame_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    MpegTs,
    Mp4,
    Mkv,
    Nut,
    Hls(HlsOutput),
    /// Write to a file and let ffmpeg infer the muxer from its extension.
    File(String),
}

impl OutputFormat {
    pub fn kind(&self) -> Option<OutputFormatKind> {
        match self {
            Self::MpegTs => Some(OutputFormatKind::MpegTs),
            Self::Mp4 => Some(OutputFormatKind::Mp4),
            Self::Mkv => Some(OutputFormatKind::Mkv),
            Self::Nut => Some(OutputFormatKind::Nut),
            Self::Hls(_) => Some(OutputFormatKind::Hls),
            Self::File(_) => None,
        }
    }
}

impl PipelineStep for OutputFormat {
    fn output_options(&self) -> Vec<String> {
        let pipe = |format: &str| vec!["-f".to_string(), format.to_string(), "pipe:1".to_string()];
        match self {
            Self::MpegTs => vec![
                "-f".into(),
                "mpegts".into(),
                "-mpegts_flags".into(),
                "+initial_discontinuity".into(),
                "pipe:1".into(),
            ],
            Self::Mp4 => pipe("mp4"),
            Self::Mkv => pipe("matroska"),
            Self::Nut => pipe("nut"),
            Self::Hls(hls) => {
                let gop = (hls.frame_rate * hls.segment_secs).to_string();
                let secs = hls.segment_secs.to_string();
                vec![
                    "-g".into(),
                    gop.clone(),
                    "-keyint_min".into(),
                    gop,
                    "-force_key_frames".into(),
                    format!("expr:gte(t,n_forced*{secs})"),
                    "-f".into(),
                    "hls".into(),
                    "-hls_time".into(),
                    secs,
                    "-hls_list_size".into(),
                    "0".into(),
                    "-segment_list_flags".into(),
                    "+live".into(),
                    "-hls_segment_type".into(),
                    "mpegts".into(),
                    "-hls_segment_filename".into(),
                    hls.segment_template.clone(),
                    "-hls_flags".into(),
                    "program_date_time+append_list+omit_endlist+independent_segments".into(),
                    hls.playlist_path.clone(),
                ]
            }
            Self::File(path) => vec![path.clone()],
        }
    }

    fn next_state(&self, current: &FrameState) -> FrameState {
        match self {
            Self::Hls(hls) => FrameState {
                output_format_kind: Some(OutputFormatKind::Hls),
                hls_playlist_path: Some(hls.playlist_path.clone()),
                hls_segment_template: Some(hls.segment_template.clone()),
                ..current.clone()
            },
            other => FrameState {
                output_format_kind: other.kind(),
                ..current.clone()
            },
        }
    }
}

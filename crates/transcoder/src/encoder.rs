//! Video and audio encoder selection.

use tracing::{debug, warn};

use crate::TranscodeError;
use crate::capabilities::{RateControlMode, hardware_codec_name};
use crate::format::{AudioFormat, PixelFormat, VideoFormat};
use crate::state::{FrameDataLocation, FrameState, HardwareAccelerationMode};
use crate::step::PipelineStep;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSettings {
    pub format: VideoFormat,
    pub pixel_format: PixelFormat,
    pub profile: Option<String>,
    pub preset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoEncoder {
    Copy,
    /// Leave the choice to ffmpeg.
    Implicit,
    Software(EncoderSettings),
    Nvenc(EncoderSettings),
    Qsv(EncoderSettings),
    Vaapi {
        settings: EncoderSettings,
        rate_control: Option<RateControlMode>,
    },
    VideoToolbox(EncoderSettings),
    Amf(EncoderSettings),
}

fn software_encoder_name(format: VideoFormat) -> Option<&'static str> {
    match format {
        VideoFormat::H264 => Some("libx264"),
        VideoFormat::Hevc => Some("libx265"),
        VideoFormat::Mpeg2Video => Some("mpeg2video"),
        VideoFormat::RawVideo => Some("rawvideo"),
        _ => None,
    }
}

/// Name of the hardware encoder for a backend, when it has one.
pub fn hardware_encoder_name(mode: HardwareAccelerationMode, format: VideoFormat) -> Option<String> {
    let codec = hardware_codec_name(format)?;
    let supported = match mode {
        HardwareAccelerationMode::None => false,
        HardwareAccelerationMode::Nvenc | HardwareAccelerationMode::Amf => {
            matches!(format, VideoFormat::H264 | VideoFormat::Hevc | VideoFormat::Av1)
        }
        HardwareAccelerationMode::Qsv | HardwareAccelerationMode::Vaapi => matches!(
            format,
            VideoFormat::H264 | VideoFormat::Hevc | VideoFormat::Mpeg2Video | VideoFormat::Av1
        ),
        HardwareAccelerationMode::VideoToolbox => {
            matches!(format, VideoFormat::H264 | VideoFormat::Hevc)
        }
    };
    supported.then(|| format!("{codec}_{}", mode.as_str()))
}

impl VideoEncoder {
    fn settings(&self) -> Option<&EncoderSettings> {
        match self {
            Self::Copy | Self::Implicit => None,
            Self::Vaapi { settings, .. } => Some(settings),
            Self::Software(s)
            | Self::Nvenc(s)
            | Self::Qsv(s)
            | Self::VideoToolbox(s)
            | Self::Amf(s) => Some(s),
        }
    }

    pub fn mode(&self) -> HardwareAccelerationMode {
        match self {
            Self::Copy | Self::Implicit | Self::Software(_) => HardwareAccelerationMode::None,
            Self::Nvenc(_) => HardwareAccelerationMode::Nvenc,
            Self::Qsv(_) => HardwareAccelerationMode::Qsv,
            Self::Vaapi { .. } => HardwareAccelerationMode::Vaapi,
            Self::VideoToolbox(_) => HardwareAccelerationMode::VideoToolbox,
            Self::Amf(_) => HardwareAccelerationMode::Amf,
        }
    }

    pub fn name(&self) -> Option<String> {
        match self {
            Self::Copy => Some("copy".into()),
            Self::Implicit => None,
            Self::Software(s) => software_encoder_name(s.format).map(String::from),
            other => {
                let s = other.settings()?;
                hardware_encoder_name(other.mode(), s.format)
            }
        }
    }

    /// The video format this encoder produces.
    pub fn video_format(&self) -> Option<VideoFormat> {
        self.settings().map(|s| s.format)
    }

    /// The pixel format this encoder consumes.
    pub fn pixel_format(&self) -> Option<PixelFormat> {
        self.settings().map(|s| s.pixel_format)
    }

    /// Where frames must be when they reach this encoder.
    pub fn required_location(&self) -> Option<FrameDataLocation> {
        match self {
            Self::Copy | Self::Implicit => None,
            Self::Nvenc(_) | Self::Qsv(_) | Self::Vaapi { .. } => Some(FrameDataLocation::Hardware),
            Self::Software(_) | Self::VideoToolbox(_) | Self::Amf(_) => {
                Some(FrameDataLocation::Software)
            }
        }
    }

    pub fn is_hardware(&self) -> bool {
        self.mode().is_hardware()
    }
}

impl PipelineStep for VideoEncoder {
    fn output_options(&self) -> Vec<String> {
        let Some(name) = self.name() else {
            return Vec::new();
        };
        let mut args = vec!["-c:v".to_string(), name];
        let Some(settings) = self.settings() else {
            return args;
        };

        if settings.format == VideoFormat::Hevc {
            args.extend(["-tag:v".into(), "hvc1".into()]);
        }
        match self {
            Self::Software(s) if s.format == VideoFormat::Hevc => {
                args.extend(["-x265-params".into(), "log-level=error".into()]);
            }
            Self::Qsv(_) => {
                args.extend(["-low_power".into(), "0".into(), "-look_ahead".into(), "0".into()]);
            }
            Self::Vaapi {
                rate_control: Some(rc),
                ..
            } => {
                args.extend(["-rc_mode".into(), rc.as_str().into()]);
            }
            _ => {}
        }

        if let Some(profile) = &settings.profile {
            args.extend(["-profile:v".into(), profile.clone()]);
        }
        if matches!(self, Self::Software(_) | Self::Nvenc(_)) {
            if let Some(preset) = &settings.preset {
                args.extend(["-preset".into(), preset.clone()]);
            }
        }
        args
    }

    fn next_state(&self, current: &FrameState) -> FrameState {
        match self.video_format() {
            Some(format) => FrameState {
                video_format: format,
                ..current.clone()
            },
            None => current.clone(),
        }
    }
}

/// The pixel format an encoder consumes for a requested bit depth.
fn encoder_pixel_format(mode: HardwareAccelerationMode, format: VideoFormat, desired: PixelFormat) -> PixelFormat {
    let desired = if format == VideoFormat::Mpeg2Video {
        PixelFormat::YUV420P
    } else {
        desired
    };
    match mode {
        HardwareAccelerationMode::Nvenc
        | HardwareAccelerationMode::Qsv
        | HardwareAccelerationMode::Vaapi => desired.semi_planar(),
        HardwareAccelerationMode::VideoToolbox | HardwareAccelerationMode::Amf
            if desired.is_ten_bit() =>
        {
            desired.semi_planar()
        }
        _ => desired,
    }
}

/// Choose the video encoder.
///
/// `mode` is the encoder acceleration already reconciled with the capability
/// facts. Formats without an encoder on that backend fall back to software.
pub fn select_video_encoder(
    format: VideoFormat,
    desired_pixel_format: PixelFormat,
    mode: HardwareAccelerationMode,
    profile: Option<String>,
    preset: Option<String>,
    rate_control: Option<RateControlMode>,
) -> Result<VideoEncoder, TranscodeError> {
    match format {
        VideoFormat::Copy => return Ok(VideoEncoder::Copy),
        VideoFormat::Undetermined => return Ok(VideoEncoder::Implicit),
        _ => {}
    }

    let mode = if hardware_encoder_name(mode, format).is_some() {
        mode
    } else {
        if mode.is_hardware() {
            debug!(%format, %mode, "no hardware encoder for format, using software");
        }
        HardwareAccelerationMode::None
    };

    if mode == HardwareAccelerationMode::None && software_encoder_name(format).is_none() {
        return Err(TranscodeError::UnsupportedCombination {
            step: "encoder",
            format: format.to_string(),
            mode,
        });
    }

    let settings = EncoderSettings {
        format,
        pixel_format: encoder_pixel_format(mode, format, desired_pixel_format),
        profile,
        preset,
    };
    Ok(match mode {
        HardwareAccelerationMode::None => VideoEncoder::Software(settings),
        HardwareAccelerationMode::Nvenc => VideoEncoder::Nvenc(settings),
        HardwareAccelerationMode::Qsv => VideoEncoder::Qsv(settings),
        HardwareAccelerationMode::Vaapi => VideoEncoder::Vaapi {
            settings,
            rate_control,
        },
        HardwareAccelerationMode::VideoToolbox => VideoEncoder::VideoToolbox(settings),
        HardwareAccelerationMode::Amf => VideoEncoder::Amf(settings),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoder {
    Aac,
    Ac3,
    Copy,
}

impl AudioEncoder {
    pub fn audio_format(&self) -> AudioFormat {
        match self {
            Self::Aac => AudioFormat::Aac,
            Self::Ac3 => AudioFormat::Ac3,
            Self::Copy => AudioFormat::Copy,
        }
    }
}

impl PipelineStep for AudioEncoder {
    fn output_options(&self) -> Vec<String> {
        vec!["-c:a".into(), self.audio_format().as_str().into()]
    }

    fn next_state(&self, current: &FrameState) -> FrameState {
        FrameState {
            audio_format: Some(self.audio_format()),
            ..current.clone()
        }
    }
}

/// Choose the audio encoder. Unknown formats yield no encoder rather than an error.
pub fn select_audio_encoder(format: Option<&str>) -> Option<AudioEncoder> {
    let name = format?;
    match AudioFormat::from_name(name) {
        Some(AudioFormat::Aac) => Some(AudioEncoder::Aac),
        Some(AudioFormat::Ac3) => Some(AudioEncoder::Ac3),
        Some(AudioFormat::Copy) => Some(AudioEncoder::Copy),
        None => {
            warn!(format = name, "unable to select audio encoder; letting ffmpeg choose");
            None
        }
    }
}

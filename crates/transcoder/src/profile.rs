//! Operator-selected target profile and per-item playout settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::TranscodeError;
use crate::format::{AudioFormat, FrameSize, PixelFormat, VideoFormat};
use crate::input::VideoStream;
use crate::state::{FrameDataLocation, FrameState, HardwareAccelerationMode, OutputFormatKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingBehavior {
    #[default]
    ScaleAndPad,
    Stretch,
    Crop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoudnessNormalization {
    #[default]
    Off,
    LoudNorm,
    DynAudNorm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioProfile {
    /// Codec name; unknown names compile without an explicit audio encoder.
    pub format: Option<String>,
    pub channels: u32,
    pub bitrate: Option<u32>,
    pub buffer_size: Option<u32>,
    pub sample_rate: Option<u32>,
    pub normalize_loudness: LoudnessNormalization,
    /// Pad audio with silence up to this duration.
    pub pad_to: Option<Duration>,
}

impl Default for AudioProfile {
    fn default() -> Self {
        Self {
            format: Some("aac".into()),
            channels: 2,
            bitrate: Some(192),
            buffer_size: Some(384),
            sample_rate: Some(48_000),
            normalize_loudness: LoudnessNormalization::Off,
            pad_to: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetProfile {
    pub resolution: FrameSize,
    pub scaling: ScalingBehavior,
    pub video_format: VideoFormat,
    pub video_profile: Option<String>,
    pub video_preset: Option<String>,
    pub bit_depth: u8,
    pub video_bitrate: Option<u32>,
    pub video_buffer_size: Option<u32>,
    pub frame_rate: Option<u32>,
    pub hardware_acceleration: HardwareAccelerationMode,
    /// Render node, QSV device or CUDA device index, depending on the backend.
    pub device: Option<String>,
    pub vaapi_driver: Option<String>,
    pub deinterlace: bool,
    pub tonemap_algorithm: String,
    pub thread_count: Option<u32>,
    pub allow_copy: bool,
    pub audio: AudioProfile,
}

impl Default for TargetProfile {
    fn default() -> Self {
        Self {
            resolution: FrameSize::new(1920, 1080),
            scaling: ScalingBehavior::ScaleAndPad,
            video_format: VideoFormat::H264,
            video_profile: None,
            video_preset: None,
            bit_depth: 8,
            video_bitrate: Some(2000),
            video_buffer_size: Some(4000),
            frame_rate: None,
            hardware_acceleration: HardwareAccelerationMode::None,
            device: None,
            vaapi_driver: None,
            deinterlace: true,
            tonemap_algorithm: "linear".into(),
            thread_count: None,
            allow_copy: true,
            audio: AudioProfile::default(),
        }
    }
}

impl TargetProfile {
    pub fn validate(&self) -> Result<(), TranscodeError> {
        if self.resolution.is_empty() {
            return Err(TranscodeError::InvalidTarget(format!(
                "resolution {} is empty",
                self.resolution
            )));
        }
        if !matches!(self.bit_depth, 8 | 10) {
            return Err(TranscodeError::InvalidTarget(format!(
                "bit depth {} is not 8 or 10",
                self.bit_depth
            )));
        }
        if self.video_bitrate == Some(0) || self.video_buffer_size == Some(0) {
            return Err(TranscodeError::InvalidTarget(
                "video bitrate and buffer size must be positive".into(),
            ));
        }
        if self.frame_rate == Some(0) {
            return Err(TranscodeError::InvalidTarget("frame rate must be positive".into()));
        }
        if self.audio.channels == 0 {
            return Err(TranscodeError::InvalidTarget("audio channels must be positive".into()));
        }
        Ok(())
    }

    pub fn pixel_format(&self) -> PixelFormat {
        if self.bit_depth == 10 {
            PixelFormat::YUV420P10LE
        } else {
            PixelFormat::YUV420P
        }
    }

    pub fn audio_format(&self) -> Option<AudioFormat> {
        self.audio.format.as_deref().and_then(AudioFormat::from_name)
    }

    /// The frame state the encoders expect, derived from the source facts.
    pub fn desired_state(
        &self,
        source: &VideoStream,
        playout: &PlayoutSettings,
    ) -> Result<FrameState, TranscodeError> {
        self.validate()?;

        let square = source.square_pixel_size();
        let resolution = self.resolution;
        let (scaled_size, cropped_size) = if square.is_empty() {
            (resolution, None)
        } else {
            match self.scaling {
                ScalingBehavior::ScaleAndPad => (fit_within(square, resolution), None),
                ScalingBehavior::Stretch => (resolution, None),
                ScalingBehavior::Crop => (cover(square, resolution), Some(resolution)),
            }
        };

        let (hls_playlist_path, hls_segment_template) = match &playout.hls {
            Some(hls) => (
                Some(hls.playlist_path.clone()),
                Some(hls.segment_template.clone()),
            ),
            None => (None, None),
        };

        Ok(FrameState {
            realtime: playout.realtime,
            infinite_loop: playout.infinite_loop,
            video_format: self.video_format,
            pixel_format: Some(self.pixel_format()),
            frame_data_location: FrameDataLocation::Software,
            scaled_size,
            padded_size: resolution,
            cropped_size,
            is_anamorphic: false,
            deinterlaced: self.deinterlace && source.interlaced,
            is_hdr: false,
            frame_rate: self.frame_rate,
            video_bitrate: self.video_bitrate,
            video_buffer_size: self.video_buffer_size,
            audio_format: self.audio_format(),
            hardware_acceleration_mode: self.hardware_acceleration,
            output_format_kind: Some(playout.output_format),
            hls_playlist_path,
            hls_segment_template,
        })
    }
}

fn even(n: u64) -> u32 {
    (n - n % 2).max(2) as u32
}

fn even_up(n: u64) -> u32 {
    (n + n % 2) as u32
}

/// Largest even size with the source aspect ratio that fits inside `target`.
fn fit_within(source: FrameSize, target: FrameSize) -> FrameSize {
    let (sw, sh) = (u64::from(source.width), u64::from(source.height));
    let (tw, th) = (u64::from(target.width), u64::from(target.height));
    if sw * th <= tw * sh {
        FrameSize::new(even(sw * th / sh), target.height)
    } else {
        FrameSize::new(target.width, even(sh * tw / sw))
    }
}

/// Smallest even size with the source aspect ratio that covers `target`.
fn cover(source: FrameSize, target: FrameSize) -> FrameSize {
    let (sw, sh) = (u64::from(source.width), u64::from(source.height));
    let (tw, th) = (u64::from(target.width), u64::from(target.height));
    if sw * th >= tw * sh {
        FrameSize::new(even_up((sw * th).div_ceil(sh)), target.height)
    } else {
        FrameSize::new(target.width, even_up((sh * tw).div_ceil(sw)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HlsSettings {
    pub playlist_path: String,
    pub segment_template: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMetadata {
    pub service_provider: Option<String>,
    pub service_name: Option<String>,
    pub audio_language: Option<String>,
}

/// Settings for one playout item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayoutSettings {
    pub start: Option<Duration>,
    pub finish: Option<Duration>,
    pub realtime: bool,
    pub readrate_initial_burst: u32,
    pub infinite_loop: bool,
    pub output_format: OutputFormatKind,
    pub hls: Option<HlsSettings>,
    pub metadata: ChannelMetadata,
    pub save_report: bool,
}

impl Default for PlayoutSettings {
    fn default() -> Self {
        Self {
            start: None,
            finish: None,
            realtime: true,
            readrate_initial_burst: 0,
            infinite_loop: false,
            output_format: OutputFormatKind::MpegTs,
            hls: None,
            metadata: ChannelMetadata::default(),
            save_report: false,
        }
    }
}

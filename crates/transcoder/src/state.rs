use std::fmt;

use serde::{Deserialize, Serialize};

use crate::format::{AudioFormat, FrameSize, PixelFormat, VideoFormat};
use crate::input::VideoStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HardwareAccelerationMode {
    #[default]
    None,
    Nvenc,
    Qsv,
    Vaapi,
    VideoToolbox,
    Amf,
}

impl HardwareAccelerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Nvenc => "nvenc",
            Self::Qsv => "qsv",
            Self::Vaapi => "vaapi",
            Self::VideoToolbox => "videotoolbox",
            Self::Amf => "amf",
        }
    }

    pub fn is_hardware(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for HardwareAccelerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FrameDataLocation {
    #[default]
    Software,
    Hardware,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormatKind {
    #[default]
    MpegTs,
    Mp4,
    Mkv,
    Nut,
    Hls,
}

/// Snapshot of the frames flowing through the pipeline.
///
/// Steps never mutate a state; `next_state` builds a new one with struct
/// update syntax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameState {
    pub realtime: bool,
    pub infinite_loop: bool,
    pub video_format: VideoFormat,
    pub pixel_format: Option<PixelFormat>,
    pub frame_data_location: FrameDataLocation,
    pub scaled_size: FrameSize,
    pub padded_size: FrameSize,
    pub cropped_size: Option<FrameSize>,
    pub is_anamorphic: bool,
    pub deinterlaced: bool,
    pub is_hdr: bool,
    pub frame_rate: Option<u32>,
    pub video_bitrate: Option<u32>,
    pub video_buffer_size: Option<u32>,
    pub audio_format: Option<AudioFormat>,
    pub hardware_acceleration_mode: HardwareAccelerationMode,
    pub output_format_kind: Option<OutputFormatKind>,
    pub hls_playlist_path: Option<String>,
    pub hls_segment_template: Option<String>,
}

impl FrameState {
    /// The state of decoded frames before any step has run.
    pub fn from_source(stream: &VideoStream, realtime: bool, infinite_loop: bool) -> Self {
        Self {
            realtime,
            infinite_loop,
            video_format: VideoFormat::from_codec_name(&stream.codec)
                .unwrap_or(VideoFormat::Undetermined),
            pixel_format: stream.pixel_format(),
            frame_data_location: FrameDataLocation::Software,
            scaled_size: stream.frame_size,
            padded_size: stream.frame_size,
            cropped_size: None,
            is_anamorphic: stream.is_anamorphic(),
            deinterlaced: false,
            is_hdr: stream.is_hdr(),
            frame_rate: stream.frame_rate.map(|r| r.round() as u32),
            video_bitrate: None,
            video_buffer_size: None,
            audio_format: None,
            hardware_acceleration_mode: HardwareAccelerationMode::None,
            output_format_kind: None,
            hls_playlist_path: None,
            hls_segment_template: None,
        }
    }

    pub fn is_hardware(&self) -> bool {
        self.frame_data_location == FrameDataLocation::Hardware
    }

    pub fn bit_depth(&self) -> u8 {
        self.pixel_format.map(|pf| pf.bit_depth()).unwrap_or(8)
    }

    pub fn with_location(&self, location: FrameDataLocation) -> Self {
        Self {
            frame_data_location: location,
            ..self.clone()
        }
    }

    pub fn with_pixel_format(&self, pixel_format: PixelFormat) -> Self {
        Self {
            pixel_format: Some(pixel_format),
            ..self.clone()
        }
    }
}

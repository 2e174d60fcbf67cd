//! Pixel formats, codecs and frame sizes shared by every pipeline step.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormatName {
    Yuv420p,
    Yuvj420p,
    Yuv420p10le,
    Yuv444p,
    Yuv444p10le,
    Yuva420p,
    Nv12,
    P010le,
    Vaapi,
    Qsv,
    Cuda,
}

impl PixelFormatName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yuv420p => "yuv420p",
            Self::Yuvj420p => "yuvj420p",
            Self::Yuv420p10le => "yuv420p10le",
            Self::Yuv444p => "yuv444p",
            Self::Yuv444p10le => "yuv444p10le",
            Self::Yuva420p => "yuva420p",
            Self::Nv12 => "nv12",
            Self::P010le => "p010le",
            Self::Vaapi => "vaapi",
            Self::Qsv => "qsv",
            Self::Cuda => "cuda",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "yuv420p" => Some(Self::Yuv420p),
            "yuvj420p" => Some(Self::Yuvj420p),
            "yuv420p10le" => Some(Self::Yuv420p10le),
            "yuv444p" => Some(Self::Yuv444p),
            "yuv444p10le" => Some(Self::Yuv444p10le),
            "yuva420p" => Some(Self::Yuva420p),
            "nv12" => Some(Self::Nv12),
            "p010le" | "p010" => Some(Self::P010le),
            "vaapi" => Some(Self::Vaapi),
            "qsv" => Some(Self::Qsv),
            "cuda" => Some(Self::Cuda),
            _ => None,
        }
    }

    fn is_surface(&self) -> bool {
        matches!(self, Self::Vaapi | Self::Qsv | Self::Cuda)
    }

    fn bit_depth(&self) -> u8 {
        match self {
            Self::Yuv420p10le | Self::Yuv444p10le | Self::P010le => 10,
            _ => 8,
        }
    }
}

/// A pixel format as the pipeline tracks it.
///
/// `name` is the logical format of the picture; `wire` is the token ffmpeg
/// sees. They differ when a planar format travels in a semi-planar layout
/// (yuv420p carried as nv12) or inside a hardware surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelFormat {
    name: PixelFormatName,
    wire: PixelFormatName,
}

impl PixelFormat {
    pub const YUV420P: Self = Self::new(PixelFormatName::Yuv420p);
    pub const YUV420P10LE: Self = Self::new(PixelFormatName::Yuv420p10le);
    pub const YUVA420P: Self = Self::new(PixelFormatName::Yuva420p);
    pub const NV12: Self = Self::new(PixelFormatName::Nv12);
    pub const P010LE: Self = Self::new(PixelFormatName::P010le);

    pub const fn new(name: PixelFormatName) -> Self {
        Self { name, wire: name }
    }

    /// Parse an ffprobe `pix_fmt` value.
    pub fn from_ffmpeg_name(s: &str) -> Option<Self> {
        PixelFormatName::from_name(s).map(Self::new)
    }

    pub fn name(&self) -> &'static str {
        self.name.as_str()
    }

    pub fn ffmpeg_name(&self) -> &'static str {
        self.wire.as_str()
    }

    pub fn bit_depth(&self) -> u8 {
        if self.wire.is_surface() {
            self.name.bit_depth()
        } else {
            self.wire.bit_depth()
        }
    }

    pub fn is_ten_bit(&self) -> bool {
        self.bit_depth() == 10
    }

    /// The same picture carried as nv12 or p010le.
    pub fn semi_planar(self) -> Self {
        let wire = if self.is_ten_bit() {
            PixelFormatName::P010le
        } else {
            PixelFormatName::Nv12
        };
        Self {
            name: self.name,
            wire,
        }
    }

    pub fn is_semi_planar(&self) -> bool {
        matches!(self.wire, PixelFormatName::Nv12 | PixelFormatName::P010le)
    }

    /// The software format a downloaded frame should be converted to.
    pub fn software_equivalent(self) -> Self {
        available_pixel_formats::for_name(self.name()).unwrap_or(self)
    }

    /// Compares only the token ffmpeg sees.
    pub fn same_wire(&self, other: &Self) -> bool {
        self.wire == other.wire
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ffmpeg_name())
    }
}

/// Lookup of concrete software formats by logical name.
pub mod available_pixel_formats {
    use super::{PixelFormat, PixelFormatName};

    pub fn for_name(name: &str) -> Option<PixelFormat> {
        match PixelFormatName::from_name(name)? {
            PixelFormatName::Vaapi | PixelFormatName::Qsv | PixelFormatName::Cuda => None,
            n => Some(PixelFormat::new(n)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    H264,
    Hevc,
    Mpeg1Video,
    Mpeg2Video,
    Mpeg4,
    MsMpeg4V2,
    MsMpeg4V3,
    Vc1,
    Vp9,
    Av1,
    RawVideo,
    Copy,
    Undetermined,
}

impl VideoFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::H264 => "h264",
            Self::Hevc => "hevc",
            Self::Mpeg1Video => "mpeg1video",
            Self::Mpeg2Video => "mpeg2video",
            Self::Mpeg4 => "mpeg4",
            Self::MsMpeg4V2 => "msmpeg4v2",
            Self::MsMpeg4V3 => "msmpeg4v3",
            Self::Vc1 => "vc1",
            Self::Vp9 => "vp9",
            Self::Av1 => "av1",
            Self::RawVideo => "rawvideo",
            Self::Copy => "copy",
            Self::Undetermined => "undetermined",
        }
    }

    pub fn from_codec_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "h264" => Some(Self::H264),
            "hevc" | "h265" => Some(Self::Hevc),
            "mpeg1video" => Some(Self::Mpeg1Video),
            "mpeg2video" => Some(Self::Mpeg2Video),
            "mpeg4" => Some(Self::Mpeg4),
            "msmpeg4v2" => Some(Self::MsMpeg4V2),
            "msmpeg4v3" => Some(Self::MsMpeg4V3),
            "vc1" => Some(Self::Vc1),
            "vp9" => Some(Self::Vp9),
            "av1" => Some(Self::Av1),
            "rawvideo" => Some(Self::RawVideo),
            "copy" => Some(Self::Copy),
            "" | "undetermined" => Some(Self::Undetermined),
            _ => None,
        }
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Aac,
    Ac3,
    Copy,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Ac3 => "ac3",
            Self::Copy => "copy",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "aac" => Some(Self::Aac),
            "ac3" => Some(Self::Ac3),
            "copy" => Some(Self::Copy),
            _ => None,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// `HH:MM:SS` with a millisecond fraction only when one is present.
pub fn format_timestamp(d: Duration) -> String {
    let total = d.as_secs();
    let millis = d.subsec_millis();
    let (h, m, s) = (total / 3600, (total / 60) % 60, total % 60);
    if millis == 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{h:02}:{m:02}:{s:02}.{millis:03}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semi_planar_keeps_logical_name() {
        let pf = PixelFormat::YUV420P10LE.semi_planar();
        assert_eq!(pf.name(), "yuv420p10le");
        assert_eq!(pf.ffmpeg_name(), "p010le");
        assert_eq!(pf.bit_depth(), 10);

        let pf = PixelFormat::YUV420P.semi_planar();
        assert_eq!(pf.ffmpeg_name(), "nv12");
        assert_eq!(pf.software_equivalent(), PixelFormat::YUV420P);
    }

    #[test]
    fn available_formats_skip_surfaces() {
        assert_eq!(
            available_pixel_formats::for_name("yuv420p"),
            Some(PixelFormat::YUV420P)
        );
        assert!(available_pixel_formats::for_name("vaapi").is_none());
        assert!(available_pixel_formats::for_name("rgb48").is_none());
    }

    #[test]
    fn codec_names_parse() {
        assert_eq!(VideoFormat::from_codec_name("HEVC"), Some(VideoFormat::Hevc));
        assert_eq!(
            VideoFormat::from_codec_name("mpeg2video"),
            Some(VideoFormat::Mpeg2Video)
        );
        assert!(VideoFormat::from_codec_name("prores").is_none());
        assert_eq!(AudioFormat::from_name("ac3"), Some(AudioFormat::Ac3));
        assert!(AudioFormat::from_name("opus").is_none());
    }

    #[test]
    fn timestamps() {
        assert_eq!(format_timestamp(Duration::from_secs(1)), "00:00:01");
        assert_eq!(format_timestamp(Duration::from_secs(3725)), "01:02:05");
        assert_eq!(format_timestamp(Duration::from_millis(61_500)), "00:01:01.500");
    }
}

//! Watermarks, picture subtitles and graphics composited over the main frames.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::format::FrameSize;
use crate::input::{SubtitleStream, VideoStream};

use super::FilterBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkLocation {
    TopLeft,
    TopMiddle,
    TopRight,
    LeftMiddle,
    MiddleCenter,
    RightMiddle,
    BottomLeft,
    BottomMiddle,
    #[default]
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkSize {
    #[default]
    ActualSize,
    /// Width as a percentage of the frame width.
    Scaled { width_percent: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FadePoint {
    pub at: Duration,
    pub fade_in: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Watermark {
    pub path: String,
    pub stream: VideoStream,
    #[serde(default)]
    pub location: WatermarkLocation,
    #[serde(default)]
    pub size: WatermarkSize,
    /// 0 to 100.
    #[serde(default = "full_opacity")]
    pub opacity: u32,
    #[serde(default)]
    pub horizontal_margin_percent: f64,
    #[serde(default)]
    pub vertical_margin_percent: f64,
    /// Position relative to the scaled content instead of the padded frame.
    #[serde(default)]
    pub place_within_source_content: bool,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default)]
    pub fade_points: Vec<FadePoint>,
}

fn full_opacity() -> u32 {
    100
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleMethod {
    #[default]
    Burn,
    Copy,
    Convert,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtitle {
    pub path: String,
    pub stream: SubtitleStream,
    /// Position among the file's subtitle streams.
    #[serde(default)]
    pub relative_index: u32,
    #[serde(default)]
    pub method: SubtitleMethod,
}

impl Subtitle {
    /// Picture subtitles are overlaid; text subtitles are rendered by libass.
    pub fn is_picture(&self) -> bool {
        self.stream.is_image_based()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsOverlay {
    /// Usually `pipe:0`, fed raw BGRA frames by the caller.
    pub path: String,
    pub size: FrameSize,
    pub frame_rate: u32,
    #[serde(default)]
    pub z_index: i32,
}

/// `x=..:y=..` expression for a 9-point anchor with percentage margins.
pub fn overlay_position(
    location: WatermarkLocation,
    frame: FrameSize,
    horizontal_margin_percent: f64,
    vertical_margin_percent: f64,
    offset: (u32, u32),
) -> String {
    let x = (horizontal_margin_percent / 100.0 * f64::from(frame.width)).round() as u32 + offset.0;
    let y = (vertical_margin_percent / 100.0 * f64::from(frame.height)).round() as u32 + offset.1;
    match location {
        WatermarkLocation::TopLeft => format!("x={x}:y={y}"),
        WatermarkLocation::TopMiddle => format!("x=(W-w)/2:y={y}"),
        WatermarkLocation::TopRight => format!("x=W-w-{x}:y={y}"),
        WatermarkLocation::LeftMiddle => format!("x={x}:y=(H-h)/2"),
        WatermarkLocation::MiddleCenter => "x=(W-w)/2:y=(H-h)/2".into(),
        WatermarkLocation::RightMiddle => format!("x=W-w-{x}:y=(H-h)/2"),
        WatermarkLocation::BottomLeft => format!("x={x}:y=H-h-{y}"),
        WatermarkLocation::BottomMiddle => format!("x=(W-w)/2:y=H-h-{y}"),
        WatermarkLocation::BottomRight => format!("x=W-w-{x}:y=H-h-{y}"),
    }
}

/// The compositing filter itself.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayFilter {
    backend: FilterBackend,
    position: Option<String>,
    software_format: Option<&'static str>,
}

impl OverlayFilter {
    pub fn new(backend: FilterBackend, position: Option<String>) -> Self {
        Self {
            backend,
            position,
            software_format: None,
        }
    }

    pub fn filter(&self) -> String {
        let name = match self.backend {
            FilterBackend::Software => "overlay",
            FilterBackend::Cuda => "overlay_cuda",
            FilterBackend::Qsv => "overlay_qsv",
            FilterBackend::Vaapi => "overlay_vaapi",
        };
        let options: Vec<&str> = self
            .position
            .as_deref()
            .into_iter()
            .chain(self.software_format)
            .collect();
        if options.is_empty() {
            name.to_string()
        } else {
            format!("{name}={}", options.join(":"))
        }
    }
}

/// One composited layer: a prepared side chain and the overlay that consumes it.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLayer {
    pub input: (usize, u32),
    pub label: &'static str,
    pub prepare: Vec<String>,
    pub overlay: OverlayFilter,
    pub z_index: i32,
}

impl OverlayLayer {
    pub fn output_label(&self) -> String {
        format!("v{}", self.label)
    }
}

/// Pixel layout the overlay filter of each backend accepts for alpha content.
fn alpha_format(backend: FilterBackend) -> &'static str {
    match backend {
        FilterBackend::Software | FilterBackend::Cuda => "yuva420p",
        FilterBackend::Qsv | FilterBackend::Vaapi => "bgra",
    }
}

fn side_upload(backend: FilterBackend) -> Option<&'static str> {
    match backend {
        FilterBackend::Software => None,
        FilterBackend::Cuda => Some("hwupload_cuda"),
        FilterBackend::Qsv => Some("hwupload=extra_hw_frames=64"),
        FilterBackend::Vaapi => Some("hwupload"),
    }
}

fn side_scale(backend: FilterBackend, size: FrameSize) -> String {
    let FrameSize { width, height } = size;
    match backend {
        FilterBackend::Software => format!("scale={width}:{height}"),
        FilterBackend::Cuda => format!("scale_cuda={width}:{height}"),
        FilterBackend::Qsv => format!("scale_qsv=w={width}:h={height}"),
        FilterBackend::Vaapi => format!("scale_vaapi={width}:{height}"),
    }
}

fn even(n: f64) -> u32 {
    let n = n.round().max(2.0) as u32;
    n - n % 2
}

/// Build the watermark layer. `scaled` and `padded` describe the main frames
/// at the point the watermark is composited.
pub fn watermark_layer(
    watermark: &Watermark,
    input: (usize, u32),
    backend: FilterBackend,
    scaled: FrameSize,
    padded: FrameSize,
) -> OverlayLayer {
    let mut prepare = Vec::new();
    if watermark.opacity < 100 {
        prepare.push(format!(
            "colorchannelmixer=aa={:.2}",
            f64::from(watermark.opacity) / 100.0
        ));
    }
    prepare.push(format!("format={}", alpha_format(backend)));
    for fade in &watermark.fade_points {
        prepare.push(format!(
            "fade={}:st={}:d=1:alpha=1",
            if fade.fade_in { "in" } else { "out" },
            fade.at.as_secs_f64()
        ));
    }
    if let Some(upload) = side_upload(backend) {
        prepare.push(upload.into());
    }

    let frame = if watermark.place_within_source_content {
        scaled
    } else {
        padded
    };
    if let WatermarkSize::Scaled { width_percent } = watermark.size {
        let source = watermark.stream.frame_size;
        let width = even(width_percent / 100.0 * f64::from(frame.width));
        let height = if source.is_empty() {
            width
        } else {
            even(f64::from(width) * f64::from(source.height) / f64::from(source.width))
        };
        prepare.push(side_scale(backend, FrameSize::new(width, height)));
    }

    let offset = if watermark.place_within_source_content {
        (
            padded.width.saturating_sub(scaled.width) / 2,
            padded.height.saturating_sub(scaled.height) / 2,
        )
    } else {
        (0, 0)
    };
    let position = overlay_position(
        watermark.location,
        frame,
        watermark.horizontal_margin_percent,
        watermark.vertical_margin_percent,
        offset,
    );

    OverlayLayer {
        input,
        label: "wm",
        prepare,
        overlay: OverlayFilter::new(backend, Some(position)),
        z_index: watermark.z_index,
    }
}

/// Picture subtitles are authored for the source size; scale them to the
/// padded frame and center them.
pub fn picture_subtitle_layer(
    input: (usize, u32),
    backend: FilterBackend,
    source: FrameSize,
    padded: FrameSize,
) -> OverlayLayer {
    let mut prepare = Vec::new();
    if source != padded {
        prepare.push(format!(
            "scale={}:{}:force_original_aspect_ratio=decrease",
            padded.width, padded.height
        ));
    }
    if let Some(upload) = side_upload(backend) {
        prepare.push(format!("format={}", alpha_format(backend)));
        prepare.push(upload.into());
    }
    OverlayLayer {
        input,
        label: "st",
        prepare,
        overlay: OverlayFilter::new(backend, Some("x=(W-w)/2:y=(H-h)/2".into())),
        z_index: i32::MIN,
    }
}

pub fn graphics_layer(
    graphics: &GraphicsOverlay,
    input: (usize, u32),
    backend: FilterBackend,
    ten_bit: bool,
) -> OverlayLayer {
    let mut prepare = Vec::new();
    if let Some(upload) = side_upload(backend) {
        prepare.push(format!("format={}", alpha_format(backend)));
        prepare.push(upload.into());
    }
    let mut overlay = OverlayFilter::new(backend, None);
    if backend == FilterBackend::Software {
        overlay.software_format = Some(if ten_bit {
            "format=yuv420p10"
        } else {
            "format=yuv420"
        });
    }
    OverlayLayer {
        input,
        label: "gfx",
        prepare,
        overlay,
        z_index: graphics.z_index,
    }
}

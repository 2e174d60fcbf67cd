//! Video filters on the main frame path.

use crate::format::{FrameSize, PixelFormat};
use crate::state::{FrameDataLocation, FrameState};
use crate::step::PipelineStep;

use super::FilterBackend;
use super::hardware::{download_fragment, fuse, relocate, upload_fragment, uploaded_pixel_format};

#[derive(Debug, Clone, PartialEq)]
pub struct Deinterlace {
    backend: FilterBackend,
    prefix: Option<String>,
}

impl Deinterlace {
    pub fn new(backend: FilterBackend, current: &FrameState) -> Self {
        let (prefix, _) = relocate(backend, current, backend.location());
        Self { backend, prefix }
    }

    pub fn filter(&self) -> String {
        let body = match self.backend {
            FilterBackend::Software => "yadif=1",
            FilterBackend::Cuda => "yadif_cuda",
            FilterBackend::Qsv => "deinterlace_qsv",
            FilterBackend::Vaapi => "deinterlace_vaapi",
        };
        fuse(&self.prefix, body)
    }

    fn next_state(&self, current: &FrameState) -> FrameState {
        let (_, moved) = relocate(self.backend, current, self.backend.location());
        FrameState {
            deinterlaced: true,
            ..moved
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tonemap {
    backend: FilterBackend,
    algorithm: String,
    pixel_format: PixelFormat,
    prefix: Option<String>,
}

impl Tonemap {
    pub fn new(
        backend: FilterBackend,
        current: &FrameState,
        algorithm: &str,
        desired: PixelFormat,
    ) -> Self {
        let (prefix, _) = relocate(backend, current, backend.location());
        let pixel_format = match backend {
            FilterBackend::Software | FilterBackend::Cuda => desired,
            FilterBackend::Qsv | FilterBackend::Vaapi => desired.semi_planar(),
        };
        Self {
            backend,
            algorithm: algorithm.to_string(),
            pixel_format,
            prefix,
        }
    }

    pub fn filter(&self) -> String {
        let alg = &self.algorithm;
        let pf = self.pixel_format.ffmpeg_name();
        let body = match self.backend {
            FilterBackend::Software => format!(
                "zscale=transfer=linear,tonemap={alg},zscale=transfer=bt709:matrix=bt709:primaries=bt709,format={pf}"
            ),
            FilterBackend::Cuda => format!(
                "hwupload=derive_device=vulkan,libplacebo=tonemapping={alg}:colorspace=bt709:color_primaries=bt709:color_trc=bt709:format={pf},hwupload=derive_device=cuda"
            ),
            FilterBackend::Qsv => format!("vpp_qsv=tonemap=1:format={pf}"),
            FilterBackend::Vaapi => format!(
                "hwmap=derive_device=opencl,tonemap_opencl=tonemap={alg}:transfer=bt709:matrix=bt709:primaries=bt709:format={pf},hwmap=derive_device=vaapi:reverse=1"
            ),
        };
        fuse(&self.prefix, &body)
    }

    fn next_state(&self, current: &FrameState) -> FrameState {
        let (_, moved) = relocate(self.backend, current, self.backend.location());
        FrameState {
            pixel_format: Some(self.pixel_format),
            is_hdr: false,
            ..moved
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Decrease,
    Increase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resize {
    /// Box handed to the scale filter.
    pub target: FrameSize,
    /// Size the frame has afterwards.
    pub scaled_size: FrameSize,
    pub aspect: Option<AspectRatio>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scale {
    backend: FilterBackend,
    prefix: Option<String>,
    resize: Option<Resize>,
    pixel_format: Option<PixelFormat>,
    /// Squaring pre-filter; `Some(true)` for the anamorphic edge case.
    square_pixels: Option<bool>,
}

impl Scale {
    pub fn resize(
        backend: FilterBackend,
        current: &FrameState,
        resize: Resize,
        pixel_format: Option<PixelFormat>,
        anamorphic_edge_case: bool,
    ) -> Self {
        let (prefix, _) = relocate(backend, current, backend.location());
        Self {
            backend,
            prefix,
            resize: Some(resize),
            pixel_format: pixel_format.filter(|_| backend.is_hardware()),
            square_pixels: current.is_anamorphic.then_some(anamorphic_edge_case),
        }
    }

    pub fn format_only(backend: FilterBackend, current: &FrameState, pixel_format: PixelFormat) -> Self {
        let (prefix, _) = relocate(backend, current, backend.location());
        Self {
            backend,
            prefix,
            resize: None,
            pixel_format: Some(pixel_format),
            square_pixels: None,
        }
    }

    pub fn is_format_only(&self) -> bool {
        self.resize.is_none()
    }

    fn name(&self) -> &'static str {
        match self.backend {
            FilterBackend::Software => "scale",
            FilterBackend::Cuda => "scale_cuda",
            FilterBackend::Qsv => "scale_qsv",
            FilterBackend::Vaapi => "scale_vaapi",
        }
    }

    pub fn filter(&self) -> String {
        let name = self.name();
        let format = self.pixel_format.map(|pf| pf.ffmpeg_name());

        let main = match (self.resize, self.backend) {
            (None, FilterBackend::Qsv) => format!("vpp_qsv=format={}", format.unwrap_or("nv12")),
            (None, FilterBackend::Software) => format!("format={}", format.unwrap_or("yuv420p")),
            (None, _) => format!("{name}=format={}", format.unwrap_or("nv12")),
            (Some(r), FilterBackend::Qsv) => {
                let mut s = format!("{name}=w={}:h={}", r.scaled_size.width, r.scaled_size.height);
                if let Some(f) = format {
                    s.push_str(&format!(":format={f}"));
                }
                s
            }
            (Some(r), backend) => {
                let mut s = format!("{name}={}:{}", r.target.width, r.target.height);
                if backend == FilterBackend::Software {
                    s.push_str(":flags=fast_bilinear");
                }
                match r.aspect {
                    Some(AspectRatio::Decrease) => s.push_str(":force_original_aspect_ratio=decrease"),
                    Some(AspectRatio::Increase) => s.push_str(":force_original_aspect_ratio=increase"),
                    None => {}
                }
                if let Some(f) = format {
                    s.push_str(&format!(":format={f}"));
                }
                s
            }
        };

        let body = match self.square_pixels {
            Some(true) => format!("{name}=iw:sar*ih,setsar=1,{main}"),
            Some(false) => format!("{name}=iw*sar:ih,setsar=1,{main}"),
            None => main,
        };
        fuse(&self.prefix, &body)
    }

    fn next_state(&self, current: &FrameState) -> FrameState {
        let (_, moved) = relocate(self.backend, current, self.backend.location());
        let (scaled_size, padded_size) = match self.resize {
            Some(r) => (r.scaled_size, r.scaled_size),
            None => (moved.scaled_size, moved.padded_size),
        };
        FrameState {
            scaled_size,
            padded_size,
            is_anamorphic: false,
            pixel_format: self.pixel_format.or(moved.pixel_format),
            ..moved
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pad {
    backend: FilterBackend,
    size: FrameSize,
    prefix: Option<String>,
}

impl Pad {
    /// Pads on VAAPI surfaces directly; other accelerators pad in host memory.
    pub fn new(backend: FilterBackend, current: &FrameState, size: FrameSize) -> Self {
        let backend = match backend {
            FilterBackend::Vaapi => FilterBackend::Vaapi,
            _ => FilterBackend::Software,
        };
        let (prefix, _) = relocate(backend, current, backend.location());
        Self {
            backend,
            size,
            prefix,
        }
    }

    pub fn filter(&self) -> String {
        let FrameSize { width, height } = self.size;
        let body = match self.backend {
            FilterBackend::Vaapi => {
                format!("pad_vaapi=w={width}:h={height}:x=-1:y=-1:color=black")
            }
            _ => format!("pad={width}:{height}:-1:-1:color=black"),
        };
        fuse(&self.prefix, &body)
    }

    fn next_state(&self, current: &FrameState) -> FrameState {
        let (_, moved) = relocate(self.backend, current, self.backend.location());
        FrameState {
            padded_size: self.size,
            ..moved
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Crop {
    size: FrameSize,
    prefix: Option<String>,
}

impl Crop {
    pub fn new(current: &FrameState, size: FrameSize) -> Self {
        let (prefix, _) = relocate(FilterBackend::Software, current, FrameDataLocation::Software);
        Self { size, prefix }
    }

    pub fn filter(&self) -> String {
        fuse(
            &self.prefix,
            &format!("crop={}:{}", self.size.width, self.size.height),
        )
    }

    fn next_state(&self, current: &FrameState) -> FrameState {
        let (_, moved) = relocate(FilterBackend::Software, current, FrameDataLocation::Software);
        FrameState {
            scaled_size: self.size,
            padded_size: self.size,
            ..moved
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HardwareDownload {
    pixel_format: PixelFormat,
    target: Option<PixelFormat>,
}

impl HardwareDownload {
    pub fn new(current: &FrameState, target: Option<PixelFormat>) -> Self {
        let pixel_format = current.pixel_format.unwrap_or(PixelFormat::NV12);
        Self {
            pixel_format,
            target: target.filter(|t| !t.same_wire(&pixel_format)),
        }
    }

    pub fn filter(&self) -> String {
        download_fragment(self.pixel_format, self.target)
    }

    fn next_state(&self, current: &FrameState) -> FrameState {
        FrameState {
            frame_data_location: FrameDataLocation::Software,
            pixel_format: Some(self.target.unwrap_or(self.pixel_format)),
            ..current.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HardwareUpload {
    backend: FilterBackend,
    pixel_format: Option<PixelFormat>,
}

impl HardwareUpload {
    pub fn new(backend: FilterBackend, pixel_format: Option<PixelFormat>) -> Self {
        Self {
            backend,
            pixel_format,
        }
    }

    pub fn filter(&self) -> String {
        upload_fragment(self.backend, self.pixel_format).unwrap_or_default()
    }

    fn next_state(&self, current: &FrameState) -> FrameState {
        if !self.backend.is_hardware() {
            return current.clone();
        }
        FrameState {
            frame_data_location: FrameDataLocation::Hardware,
            pixel_format: uploaded_pixel_format(self.backend, current.pixel_format, self.pixel_format),
            ..current.clone()
        }
    }
}

/// Burns text subtitles in host memory.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSubtitles {
    path: String,
    stream_index: u32,
    fonts_dir: Option<String>,
    prefix: Option<String>,
}

impl TextSubtitles {
    pub fn new(current: &FrameState, path: &str, stream_index: u32, fonts_dir: Option<&str>) -> Self {
        let (prefix, _) = relocate(FilterBackend::Software, current, FrameDataLocation::Software);
        Self {
            path: path.to_string(),
            stream_index,
            fonts_dir: fonts_dir.map(String::from),
            prefix,
        }
    }

    pub fn filter(&self) -> String {
        let mut body = format!(
            "subtitles={}:si={}",
            escape_filter_value(&self.path),
            self.stream_index
        );
        if let Some(fonts) = &self.fonts_dir {
            body.push_str(&format!(":fontsdir={}", escape_filter_value(fonts)));
        }
        fuse(&self.prefix, &body)
    }

    fn next_state(&self, current: &FrameState) -> FrameState {
        current.with_location(FrameDataLocation::Software)
    }
}

/// Escape a value for use inside a filter option list.
pub fn escape_filter_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | ':' | '\'' | ',' | ';' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Closed set of filters on the main frame path.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoFilter {
    Deinterlace(Deinterlace),
    Tonemap(Tonemap),
    Scale(Scale),
    Pad(Pad),
    Crop(Crop),
    HardwareDownload(HardwareDownload),
    HardwareUpload(HardwareUpload),
    TextSubtitles(TextSubtitles),
}

impl VideoFilter {
    pub fn filter(&self) -> String {
        match self {
            Self::Deinterlace(f) => f.filter(),
            Self::Tonemap(f) => f.filter(),
            Self::Scale(f) => f.filter(),
            Self::Pad(f) => f.filter(),
            Self::Crop(f) => f.filter(),
            Self::HardwareDownload(f) => f.filter(),
            Self::HardwareUpload(f) => f.filter(),
            Self::TextSubtitles(f) => f.filter(),
        }
    }

    pub fn is_format_only(&self) -> bool {
        matches!(self, Self::Scale(s) if s.is_format_only())
    }
}

impl PipelineStep for VideoFilter {
    fn filter_options(&self) -> Vec<String> {
        let f = self.filter();
        if f.is_empty() { Vec::new() } else { vec![f] }
    }

    fn next_state(&self, current: &FrameState) -> FrameState {
        match self {
            Self::Deinterlace(f) => f.next_state(current),
            Self::Tonemap(f) => f.next_state(current),
            Self::Scale(f) => f.next_state(current),
            Self::Pad(f) => f.next_state(current),
            Self::Crop(f) => f.next_state(current),
            Self::HardwareDownload(f) => f.next_state(current),
            Self::HardwareUpload(f) => f.next_state(current),
            Self::TextSubtitles(f) => f.next_state(current),
        }
    }
}

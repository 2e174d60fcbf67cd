//! Orders the main video chain.
//!
//! deinterlace, tonemap, scale, pad or crop, then whatever movement the
//! overlays and the encoder need. Each filter is built against the state the
//! previous one produced, so fused uploads and downloads land exactly where
//! the frames change location.

use tracing::debug;

use crate::encoder::VideoEncoder;
use crate::format::PixelFormat;
use crate::profile::ScalingBehavior;
use crate::state::{FrameDataLocation, FrameState};
use crate::step::PipelineStep;

use super::FilterBackend;
use super::video::{
    AspectRatio, Crop, Deinterlace, HardwareDownload, HardwareUpload, Pad, Resize, Scale,
    TextSubtitles, Tonemap, VideoFilter,
};

/// Text subtitles burned into the main chain.
#[derive(Debug, Clone)]
pub struct BurnedSubtitles<'a> {
    pub path: &'a str,
    pub stream_index: u32,
    pub fonts_dir: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct ChainRequest<'a> {
    pub backend: FilterBackend,
    pub encoder: &'a VideoEncoder,
    pub desired: &'a FrameState,
    pub scaling: ScalingBehavior,
    pub anamorphic_edge_case: bool,
    pub tonemap_algorithm: &'a str,
    pub burned_subtitles: Option<BurnedSubtitles<'a>>,
    /// Whether any watermark, picture subtitle or graphics layer follows.
    pub has_overlays: bool,
}

#[derive(Debug, Clone)]
pub struct VideoChain {
    pub filters: Vec<VideoFilter>,
    /// Backend the overlay layers composite on.
    pub overlay_backend: FilterBackend,
    /// State after the main chain, before any overlay.
    pub state: FrameState,
}

struct Builder {
    filters: Vec<VideoFilter>,
    state: FrameState,
}

impl Builder {
    fn push(&mut self, filter: VideoFilter) {
        self.state = filter.next_state(&self.state);
        self.filters.push(filter);
    }
}

fn hardware_target(encoder: &VideoEncoder) -> Option<PixelFormat> {
    match encoder.required_location() {
        Some(FrameDataLocation::Hardware) => encoder.pixel_format(),
        _ => None,
    }
}

pub fn compose_video_chain(request: &ChainRequest<'_>, current: FrameState) -> VideoChain {
    let backend = request.backend;
    let desired = request.desired;
    let encoder_format = hardware_target(request.encoder);
    let mut chain = Builder {
        filters: Vec::new(),
        state: current,
    };

    if desired.deinterlaced && !chain.state.deinterlaced {
        let f = Deinterlace::new(backend, &chain.state);
        chain.push(VideoFilter::Deinterlace(f));
    }

    if chain.state.is_hdr && !desired.is_hdr {
        let target = desired
            .pixel_format
            .unwrap_or(PixelFormat::YUV420P)
            .software_equivalent();
        let f = Tonemap::new(backend, &chain.state, request.tonemap_algorithm, target);
        chain.push(VideoFilter::Tonemap(f));
    }

    if chain.state.scaled_size != desired.scaled_size || chain.state.is_anamorphic {
        let resize = match (request.scaling, desired.cropped_size) {
            (ScalingBehavior::Crop, Some(cropped)) => Resize {
                target: cropped,
                scaled_size: desired.scaled_size,
                aspect: Some(AspectRatio::Increase),
            },
            (ScalingBehavior::Stretch, _) => Resize {
                target: desired.scaled_size,
                scaled_size: desired.scaled_size,
                aspect: None,
            },
            _ => Resize {
                target: desired.padded_size,
                scaled_size: desired.scaled_size,
                aspect: Some(AspectRatio::Decrease),
            },
        };
        let f = Scale::resize(
            backend,
            &chain.state,
            resize,
            encoder_format,
            request.anamorphic_edge_case,
        );
        chain.push(VideoFilter::Scale(f));
    } else if let Some(pf) = encoder_format {
        let state = &chain.state;
        let differs = state.pixel_format.is_none_or(|current| !current.same_wire(&pf));
        if backend.is_hardware() && state.is_hardware() && differs {
            let f = Scale::format_only(backend, state, pf);
            chain.push(VideoFilter::Scale(f));
        }
    }

    match desired.cropped_size {
        Some(cropped) if chain.state.padded_size != cropped => {
            let f = Crop::new(&chain.state, cropped);
            chain.push(VideoFilter::Crop(f));
        }
        Some(_) => {}
        None if chain.state.padded_size != desired.padded_size => {
            let f = Pad::new(backend, &chain.state, desired.padded_size);
            chain.push(VideoFilter::Pad(f));
        }
        None => {}
    }

    if chain.state.is_hardware() && encoder_format.is_none() {
        let target = request
            .encoder
            .pixel_format()
            .or_else(|| chain.state.pixel_format.map(PixelFormat::software_equivalent));
        let f = HardwareDownload::new(&chain.state, target);
        chain.push(VideoFilter::HardwareDownload(f));
    }

    let software_overlays = request.burned_subtitles.is_some()
        || (request.has_overlays && (!backend.is_hardware() || chain.state.bit_depth() == 10));
    if software_overlays && chain.state.is_hardware() {
        let target = chain.state.pixel_format.map(PixelFormat::software_equivalent);
        let f = HardwareDownload::new(&chain.state, target);
        chain.push(VideoFilter::HardwareDownload(f));
    }

    if let Some(subs) = &request.burned_subtitles {
        let f = TextSubtitles::new(&chain.state, subs.path, subs.stream_index, subs.fonts_dir);
        chain.push(VideoFilter::TextSubtitles(f));
    }

    let overlay_backend = if chain.state.is_hardware() {
        backend
    } else {
        FilterBackend::Software
    };
    debug!(
        filters = chain.filters.len(),
        ?overlay_backend,
        location = ?chain.state.frame_data_location,
        "composed video chain"
    );

    VideoChain {
        filters: chain.filters,
        overlay_backend,
        state: chain.state,
    }
}

/// Upload after the overlays when the encoder consumes hardware frames.
pub fn final_relocation(
    backend: FilterBackend,
    encoder: &VideoEncoder,
    state: &FrameState,
) -> Option<VideoFilter> {
    let pf = hardware_target(encoder)?;
    if state.is_hardware() || !backend.is_hardware() {
        return None;
    }
    Some(VideoFilter::HardwareUpload(HardwareUpload::new(backend, Some(pf))))
}

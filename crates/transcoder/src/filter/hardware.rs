//! Fused upload and download fragments.
//!
//! Filters that need frames somewhere else prefix their own fragment with the
//! move instead of relying on a separate upload or download step.

use crate::format::PixelFormat;
use crate::state::{FrameDataLocation, FrameState};

use super::FilterBackend;

/// Fragment that moves host frames onto the backend's accelerator.
///
/// Cuda keeps the current layout unless a format is requested; QSV and VAAPI
/// surfaces always take nv12 or p010le.
pub fn upload_fragment(backend: FilterBackend, pixel_format: Option<PixelFormat>) -> Option<String> {
    let semi_planar = || {
        pixel_format
            .unwrap_or(PixelFormat::YUV420P)
            .semi_planar()
            .ffmpeg_name()
    };
    match backend {
        FilterBackend::Software => None,
        FilterBackend::Cuda => Some(match pixel_format {
            Some(pf) => format!("format={},hwupload_cuda", pf.ffmpeg_name()),
            None => "hwupload_cuda".into(),
        }),
        FilterBackend::Qsv => Some(format!("format={},hwupload=extra_hw_frames=64", semi_planar())),
        FilterBackend::Vaapi => Some(format!("format={}|vaapi,hwupload", semi_planar())),
    }
}

/// Pixel format of frames after [`upload_fragment`].
pub fn uploaded_pixel_format(
    backend: FilterBackend,
    current: Option<PixelFormat>,
    requested: Option<PixelFormat>,
) -> Option<PixelFormat> {
    match backend {
        FilterBackend::Software => current,
        FilterBackend::Cuda => requested.or(current),
        FilterBackend::Qsv | FilterBackend::Vaapi => Some(
            requested
                .or(current)
                .unwrap_or(PixelFormat::YUV420P)
                .semi_planar(),
        ),
    }
}

/// `hwdownload,format=<surface layout>` plus a conversion when one is needed.
pub fn download_fragment(current: PixelFormat, target: Option<PixelFormat>) -> String {
    let mut fragment = format!("hwdownload,format={}", current.ffmpeg_name());
    if let Some(target) = target.filter(|t| !t.same_wire(&current)) {
        fragment.push_str(",format=");
        fragment.push_str(target.ffmpeg_name());
    }
    fragment
}

/// Move frames to `target`, returning the prefix fragment and the moved state.
pub fn relocate(
    backend: FilterBackend,
    current: &FrameState,
    target: FrameDataLocation,
) -> (Option<String>, FrameState) {
    match (current.frame_data_location, target) {
        (FrameDataLocation::Software, FrameDataLocation::Hardware) if backend.is_hardware() => {
            // QSV and VAAPI surfaces must be told the bit depth they receive
            let requested = match backend {
                FilterBackend::Qsv | FilterBackend::Vaapi => current.pixel_format,
                _ => None,
            };
            let fragment = upload_fragment(backend, requested);
            let state = FrameState {
                frame_data_location: FrameDataLocation::Hardware,
                pixel_format: uploaded_pixel_format(backend, current.pixel_format, requested),
                ..current.clone()
            };
            (fragment, state)
        }
        (FrameDataLocation::Hardware, FrameDataLocation::Software) => {
            let pf = current.pixel_format.unwrap_or(PixelFormat::NV12);
            (
                Some(download_fragment(pf, None)),
                current.with_location(FrameDataLocation::Software),
            )
        }
        _ => (None, current.clone()),
    }
}

/// Join a fused prefix and a filter body.
pub(crate) fn fuse(prefix: &Option<String>, body: &str) -> String {
    match prefix {
        Some(p) if body.is_empty() => p.clone(),
        Some(p) => format!("{p},{body}"),
        None => body.to_string(),
    }
}

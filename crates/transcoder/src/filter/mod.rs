//! Video and audio filter chains.

pub mod audio;
pub mod chain;
pub mod complex;
pub mod hardware;
pub mod overlay;
pub mod video;

pub use audio::{AudioFilter, audio_filters};
pub use chain::{BurnedSubtitles, ChainRequest, VideoChain, compose_video_chain, final_relocation};
pub use complex::{ComplexFilter, StreamRef};
pub use overlay::{
    FadePoint, GraphicsOverlay, OverlayLayer, Subtitle, SubtitleMethod, Watermark,
    WatermarkLocation, WatermarkSize,
};
pub use video::VideoFilter;

use crate::state::{FrameDataLocation, HardwareAccelerationMode};

/// Where filters run. Only accelerators with their own filter family get a
/// hardware backend; VideoToolbox and AMF filter in software.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterBackend {
    Software,
    Cuda,
    Qsv,
    Vaapi,
}

impl FilterBackend {
    /// The backend for a pipeline whose decoder or encoder runs on `mode`.
    pub fn for_pipeline(
        mode: HardwareAccelerationMode,
        decoder_on_hardware: bool,
        encoder_on_hardware: bool,
    ) -> Self {
        if !(decoder_on_hardware || encoder_on_hardware) {
            return Self::Software;
        }
        match mode {
            HardwareAccelerationMode::Nvenc => Self::Cuda,
            HardwareAccelerationMode::Qsv => Self::Qsv,
            HardwareAccelerationMode::Vaapi => Self::Vaapi,
            HardwareAccelerationMode::None
            | HardwareAccelerationMode::VideoToolbox
            | HardwareAccelerationMode::Amf => Self::Software,
        }
    }

    pub fn is_hardware(&self) -> bool {
        !matches!(self, Self::Software)
    }

    pub fn location(&self) -> FrameDataLocation {
        if self.is_hardware() {
            FrameDataLocation::Hardware
        } else {
            FrameDataLocation::Software
        }
    }
}

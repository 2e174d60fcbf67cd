//! Decoder selection.

use tracing::debug;

use crate::TranscodeError;
use crate::capabilities::hardware_codec_name;
use crate::format::{PixelFormat, VideoFormat};
use crate::input::{InputFile, InputKind, VideoStream};
use crate::state::{FrameDataLocation, FrameState, HardwareAccelerationMode};
use crate::step::PipelineStep;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoder {
    /// Let the demuxer pick; contributes no arguments.
    Implicit,
    Software(VideoFormat),
    Cuvid { format: VideoFormat, deinterlace: bool },
    /// Decodes through the global `-hwaccel cuda`.
    ImplicitCuda,
    Qsv(VideoFormat),
    /// Decodes through the global `-hwaccel vaapi`.
    Vaapi,
    /// Decodes through the global `-hwaccel videotoolbox`; frames come back to host memory.
    VideoToolbox,
}

impl Decoder {
    pub fn name(&self) -> Option<String> {
        match self {
            Self::Software(VideoFormat::Av1) => Some("libdav1d".into()),
            Self::Software(format) => Some(format.as_str().into()),
            Self::Cuvid { format, .. } => hardware_codec_name(*format).map(|n| format!("{n}_cuvid")),
            Self::Qsv(format) => hardware_codec_name(*format).map(|n| format!("{n}_qsv")),
            Self::Implicit | Self::ImplicitCuda | Self::Vaapi | Self::VideoToolbox => None,
        }
    }

    pub fn is_hardware(&self) -> bool {
        !matches!(self, Self::Implicit | Self::Software(_))
    }
}

impl PipelineStep for Decoder {
    fn input_options(&self, input: &InputFile) -> Vec<String> {
        if !matches!(input.kind, InputKind::Video(_)) {
            return Vec::new();
        }
        let mut args = Vec::new();
        if let Some(name) = self.name() {
            args.push("-c:v".to_string());
            args.push(name);
        }
        if let Self::Cuvid {
            deinterlace: true, ..
        } = self
        {
            args.push("-deint".into());
            args.push("adaptive".into());
        }
        args
    }

    fn next_state(&self, current: &FrameState) -> FrameState {
        let semi_planar = current
            .pixel_format
            .unwrap_or(PixelFormat::YUV420P)
            .semi_planar();
        match self {
            Self::Implicit | Self::Software(_) => current.clone(),
            Self::VideoToolbox => current.with_pixel_format(semi_planar),
            Self::Cuvid { deinterlace, .. } => FrameState {
                frame_data_location: FrameDataLocation::Hardware,
                pixel_format: Some(semi_planar),
                deinterlaced: current.deinterlaced || *deinterlace,
                ..current.clone()
            },
            Self::ImplicitCuda | Self::Qsv(_) | Self::Vaapi => FrameState {
                frame_data_location: FrameDataLocation::Hardware,
                pixel_format: Some(semi_planar),
                ..current.clone()
            },
        }
    }
}

/// Choose the decoder for the main video stream.
///
/// `mode` is the decoder acceleration already reconciled with the capability
/// facts; a backend that cannot decode the source arrives here as `None`.
pub fn select_decoder(
    stream: &VideoStream,
    mode: HardwareAccelerationMode,
    deinterlace: bool,
) -> Result<Decoder, TranscodeError> {
    let format = match VideoFormat::from_codec_name(&stream.codec) {
        Some(f) => f,
        None if stream.still_image => return Ok(Decoder::Implicit),
        None => {
            return Err(TranscodeError::UnsupportedCombination {
                step: "decoder",
                format: stream.codec.clone(),
                mode,
            });
        }
    };

    if matches!(
        format,
        VideoFormat::Copy | VideoFormat::Undetermined | VideoFormat::RawVideo
    ) || stream.still_image
    {
        return Ok(Decoder::Implicit);
    }

    let ten_bit = stream.bit_depth() == 10;
    let decoder = match mode {
        HardwareAccelerationMode::Nvenc => match format {
            VideoFormat::H264 if ten_bit => Decoder::Software(format),
            VideoFormat::Av1 => Decoder::ImplicitCuda,
            VideoFormat::Mpeg2Video | VideoFormat::Vp9 => Decoder::Cuvid {
                format,
                deinterlace: deinterlace && stream.interlaced,
            },
            f if hardware_codec_name(f).is_some() => Decoder::Cuvid {
                format,
                deinterlace: false,
            },
            _ => Decoder::Software(format),
        },
        HardwareAccelerationMode::Qsv => match format {
            VideoFormat::H264 | VideoFormat::Hevc if ten_bit => Decoder::Software(format),
            VideoFormat::Mpeg4 => Decoder::Software(format),
            f if hardware_codec_name(f).is_some() => Decoder::Qsv(format),
            _ => Decoder::Software(format),
        },
        HardwareAccelerationMode::Vaapi => match hardware_codec_name(format) {
            Some(_) => Decoder::Vaapi,
            None => Decoder::Software(format),
        },
        HardwareAccelerationMode::VideoToolbox => match hardware_codec_name(format) {
            Some(_) => Decoder::VideoToolbox,
            None => Decoder::Software(format),
        },
        HardwareAccelerationMode::None | HardwareAccelerationMode::Amf => {
            Decoder::Software(format)
        }
    };

    debug!(codec = %stream.codec, %mode, ?decoder, "selected decoder");
    Ok(decoder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FrameSize;

    fn stream(codec: &str, pix_fmt: &str) -> VideoStream {
        VideoStream {
            codec: codec.into(),
            pixel_format: Some(pix_fmt.into()),
            frame_size: FrameSize::new(1920, 1080),
            ..Default::default()
        }
    }

    #[test]
    fn software_decoder_is_explicit() {
        let d = select_decoder(&stream("h264", "yuv420p"), HardwareAccelerationMode::None, false)
            .unwrap();
        assert_eq!(d, Decoder::Software(VideoFormat::H264));
        assert_eq!(d.name().as_deref(), Some("h264"));
    }

    #[test]
    fn nvidia_ten_bit_h264_decodes_in_software() {
        let d = select_decoder(
            &stream("h264", "yuv420p10le"),
            HardwareAccelerationMode::Nvenc,
            false,
        )
        .unwrap();
        assert_eq!(d, Decoder::Software(VideoFormat::H264));

        let d = select_decoder(&stream("hevc", "yuv420p10le"), HardwareAccelerationMode::Nvenc, false)
            .unwrap();
        assert_eq!(d.name().as_deref(), Some("hevc_cuvid"));
    }

    #[test]
    fn cuvid_deinterlaces_on_ingest() {
        let mut s = stream("mpeg2video", "yuv420p");
        s.interlaced = true;
        let d = select_decoder(&s, HardwareAccelerationMode::Nvenc, true).unwrap();
        let input = InputFile::new("/tmp/in.ts", InputKind::Video(s.clone()));
        assert_eq!(
            d.input_options(&input),
            vec!["-c:v", "mpeg2_cuvid", "-deint", "adaptive"]
        );

        let state = d.next_state(&FrameState::from_source(&s, true, false));
        assert!(state.deinterlaced);
        assert_eq!(state.frame_data_location, FrameDataLocation::Hardware);
        assert_eq!(state.pixel_format.map(|p| p.ffmpeg_name()), Some("nv12"));
    }

    #[test]
    fn qsv_ten_bit_hevc_decodes_in_software() {
        let d = select_decoder(&stream("hevc", "yuv420p10le"), HardwareAccelerationMode::Qsv, false)
            .unwrap();
        assert_eq!(d, Decoder::Software(VideoFormat::Hevc));

        let d = select_decoder(&stream("vc1", "yuv420p"), HardwareAccelerationMode::Qsv, false)
            .unwrap();
        assert_eq!(d.name().as_deref(), Some("vc1_qsv"));
    }

    #[test]
    fn vaapi_decodes_implicitly_into_p010() {
        let s = stream("hevc", "yuv420p10le");
        let d = select_decoder(&s, HardwareAccelerationMode::Vaapi, false).unwrap();
        assert_eq!(d, Decoder::Vaapi);
        let input = InputFile::new("/tmp/in.mkv", InputKind::Video(s.clone()));
        assert!(d.input_options(&input).is_empty());

        let state = d.next_state(&FrameState::from_source(&s, true, false));
        assert_eq!(state.frame_data_location, FrameDataLocation::Hardware);
        let pf = state.pixel_format.unwrap();
        assert_eq!(pf.ffmpeg_name(), "p010le");
        assert_eq!(pf.name(), "yuv420p10le");
    }

    #[test]
    fn videotoolbox_returns_frames_to_host_memory() {
        let s = stream("h264", "yuv420p");
        let d = select_decoder(&s, HardwareAccelerationMode::VideoToolbox, false).unwrap();
        let state = d.next_state(&FrameState::from_source(&s, true, false));
        assert_eq!(state.frame_data_location, FrameDataLocation::Software);
    }

    #[test]
    fn unknown_codec_is_unsupported() {
        let err = select_decoder(&stream("prores", "yuv422p10le"), HardwareAccelerationMode::None, false)
            .unwrap_err();
        assert!(matches!(
            err,
            TranscodeError::UnsupportedCombination { step: "decoder", .. }
        ));
    }

    #[test]
    fn still_images_use_implicit_decoder() {
        let mut s = stream("png", "rgb24");
        s.still_image = true;
        assert_eq!(
            select_decoder(&s, HardwareAccelerationMode::Vaapi, false).unwrap(),
            Decoder::Implicit
        );
    }
}

use serde::{Deserialize, Serialize};

use crate::format::AudioFormat;
use crate::input::AudioStream;
use crate::profile::{AudioProfile, LoudnessNormalization};
use crate::state::{FrameState, OutputFormatKind};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TranscodeReason {
    CopyNotAllowed,
    VideoFormatMismatch,
    PixelFormatMismatch,
    SizeMismatch,
    Anamorphic,
    Deinterlace,
    ToneMap,
    Overlays,
    RawVideoOutput,
    AudioFormatMismatch,
    ChannelMismatch,
    AudioFilters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyDecision {
    pub copy: bool,
    pub reasons: Vec<TranscodeReason>,
}

impl CopyDecision {
    fn from_reasons(reasons: Vec<TranscodeReason>) -> Self {
        Self {
            copy: reasons.is_empty(),
            reasons,
        }
    }
}

/// Whether the source video can pass through untouched.
pub fn decide_video(
    source: &FrameState,
    desired: &FrameState,
    allow_copy: bool,
    has_overlays: bool,
) -> CopyDecision {
    let mut reasons = Vec::new();

    if !allow_copy {
        reasons.push(TranscodeReason::CopyNotAllowed);
    }
    if source.video_format != desired.video_format {
        reasons.push(TranscodeReason::VideoFormatMismatch);
    }
    let same_pixel_format = match (source.pixel_format, desired.pixel_format) {
        (Some(a), Some(b)) => a.same_wire(&b),
        (None, None) => true,
        _ => false,
    };
    if !same_pixel_format {
        reasons.push(TranscodeReason::PixelFormatMismatch);
    }
    if source.scaled_size != desired.scaled_size || desired.scaled_size != desired.padded_size {
        reasons.push(TranscodeReason::SizeMismatch);
    }
    if source.is_anamorphic {
        reasons.push(TranscodeReason::Anamorphic);
    }
    if desired.deinterlaced && !source.deinterlaced {
        reasons.push(TranscodeReason::Deinterlace);
    }
    if source.is_hdr && !desired.is_hdr {
        reasons.push(TranscodeReason::ToneMap);
    }
    if has_overlays {
        reasons.push(TranscodeReason::Overlays);
    }
    if desired.output_format_kind == Some(OutputFormatKind::Nut) {
        reasons.push(TranscodeReason::RawVideoOutput);
    }

    CopyDecision::from_reasons(reasons)
}

/// Whether the source audio can pass through untouched.
pub fn decide_audio(source: &AudioStream, profile: &AudioProfile, allow_copy: bool) -> CopyDecision {
    let mut reasons = Vec::new();

    if !allow_copy {
        reasons.push(TranscodeReason::CopyNotAllowed);
    }
    let desired = profile.format.as_deref().and_then(AudioFormat::from_name);
    let source_format = AudioFormat::from_name(&source.codec);
    if source_format.is_none() || source_format != desired {
        reasons.push(TranscodeReason::AudioFormatMismatch);
    }
    if source.channels != profile.channels {
        reasons.push(TranscodeReason::ChannelMismatch);
    }
    if profile.normalize_loudness != LoudnessNormalization::Off || profile.pad_to.is_some() {
        reasons.push(TranscodeReason::AudioFilters);
    }

    CopyDecision::from_reasons(reasons)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::format::{FrameSize, VideoFormat};
    use crate::input::VideoStream;
    use crate::profile::{PlayoutSettings, TargetProfile};

    fn source() -> VideoStream {
        VideoStream {
            codec: "h264".into(),
            pixel_format: Some("yuv420p".into()),
            frame_size: FrameSize::new(1920, 1080),
            ..Default::default()
        }
    }

    fn states(stream: &VideoStream, target: &TargetProfile) -> (FrameState, FrameState) {
        let playout = PlayoutSettings::default();
        (
            FrameState::from_source(stream, playout.realtime, false),
            target.desired_state(stream, &playout).unwrap(),
        )
    }

    #[test]
    fn copy_when_everything_matches() {
        let (src, desired) = states(&source(), &TargetProfile::default());
        let d = decide_video(&src, &desired, true, false);
        assert!(d.copy);
        assert!(d.reasons.is_empty());
    }

    #[test]
    fn format_and_overlays_prevent_copy() {
        let target = TargetProfile {
            video_format: VideoFormat::Hevc,
            ..Default::default()
        };
        let (src, desired) = states(&source(), &target);
        let d = decide_video(&src, &desired, true, true);
        assert!(!d.copy);
        assert_eq!(
            d.reasons,
            vec![TranscodeReason::VideoFormatMismatch, TranscodeReason::Overlays]
        );
    }

    #[test]
    fn letterboxing_prevents_copy() {
        let mut stream = source();
        stream.frame_size = FrameSize::new(1920, 800);
        let (src, desired) = states(&stream, &TargetProfile::default());
        let d = decide_video(&src, &desired, true, false);
        assert_eq!(d.reasons, vec![TranscodeReason::SizeMismatch]);
    }

    #[test]
    fn copy_must_be_allowed() {
        let target = TargetProfile {
            allow_copy: false,
            ..Default::default()
        };
        let (src, desired) = states(&source(), &target);
        assert!(!decide_video(&src, &desired, target.allow_copy, false).copy);
    }

    #[test]
    fn audio_copy_needs_matching_layout() {
        let stereo = AudioStream {
            index: 1,
            codec: "aac".into(),
            channels: 2,
            language: None,
        };
        let profile = AudioProfile::default();
        assert!(decide_audio(&stereo, &profile, true).copy);

        let surround = AudioStream {
            channels: 6,
            ..stereo.clone()
        };
        assert_eq!(
            decide_audio(&surround, &profile, true).reasons,
            vec![TranscodeReason::ChannelMismatch]
        );

        let padded = AudioProfile {
            pad_to: Some(Duration::from_secs(30)),
            ..AudioProfile::default()
        };
        assert_eq!(
            decide_audio(&stereo, &padded, true).reasons,
            vec![TranscodeReason::AudioFilters]
        );
    }
}

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::TranscodeError;
use crate::format::FrameSize;
use crate::input::{AudioStream, SubtitleStream, VideoStream};

/// Stream facts extracted via ffprobe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub container: String,
    pub duration: Option<Duration>,
    pub video: Option<VideoStream>,
    pub audio: Vec<AudioStream>,
    pub subtitles: Vec<SubtitleStream>,
}

/// Run ffprobe on a file and parse the JSON output.
pub async fn probe(ffprobe_path: &Path, file: &Path) -> Result<MediaInfo, TranscodeError> {
    let output = tokio::process::Command::new(ffprobe_path)
        .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(file)
        .output()
        .await
        .map_err(|e| TranscodeError::ProbeFailed(format!("could not run ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(TranscodeError::ProbeFailed(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    let raw: serde_json::Value = serde_json::from_slice(&output.stdout)
        .map_err(|e| TranscodeError::ProbeFailed(format!("invalid ffprobe output: {e}")))?;
    parse_probe_output(&raw)
}

const IMAGE_CONTAINERS: &[&str] = &["image2", "png_pipe", "jpeg_pipe", "bmp_pipe", "webp_pipe"];

#[derive(Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    format_name: String,
    duration: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ProbeStream {
    index: u32,
    codec_type: String,
    codec_name: Option<String>,
    profile: Option<String>,
    width: u32,
    height: u32,
    pix_fmt: Option<String>,
    sample_aspect_ratio: Option<String>,
    display_aspect_ratio: Option<String>,
    field_order: Option<String>,
    color_transfer: Option<String>,
    r_frame_rate: Option<String>,
    channels: Option<u32>,
    tags: ProbeTags,
    disposition: ProbeDisposition,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ProbeTags {
    language: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ProbeDisposition {
    attached_pic: u8,
}

impl ProbeStream {
    fn codec(&self) -> String {
        self.codec_name.clone().unwrap_or_else(|| "unknown".into())
    }

    fn video(&self, still_image: bool) -> VideoStream {
        let mut stream = VideoStream {
            index: self.index,
            codec: self.codec(),
            profile: self.profile.clone(),
            pixel_format: self.pix_fmt.clone(),
            frame_size: FrameSize::new(self.width, self.height),
            sample_aspect_ratio: self.sample_aspect_ratio.clone(),
            display_aspect_ratio: self.display_aspect_ratio.clone(),
            anamorphic_edge_case: false,
            interlaced: matches!(self.field_order.as_deref(), Some("tt" | "bb" | "tb" | "bt")),
            still_image,
            color_transfer: self.color_transfer.clone(),
            frame_rate: self.r_frame_rate.as_deref().and_then(parse_fraction),
        };
        // ffprobe reports sar == dar for streams whose height, not width, is stretched
        stream.anamorphic_edge_case =
            stream.is_anamorphic() && stream.sample_aspect_ratio == stream.display_aspect_ratio;
        stream
    }
}

/// Extract stream facts from `ffprobe -print_format json` output.
pub fn parse_probe_output(raw: &serde_json::Value) -> Result<MediaInfo, TranscodeError> {
    let parsed = ProbeOutput::deserialize(raw)
        .map_err(|e| TranscodeError::ProbeFailed(format!("unexpected ffprobe output: {e}")))?;
    let format = parsed
        .format
        .ok_or_else(|| TranscodeError::ProbeFailed("no format section".into()))?;

    let still_image = format
        .format_name
        .split(',')
        .any(|name| IMAGE_CONTAINERS.contains(&name));
    let duration = format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(Duration::from_secs_f64);

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type == "video" && s.disposition.attached_pic == 0)
        .map(|s| s.video(still_image));
    let audio = parsed
        .streams
        .iter()
        .filter(|s| s.codec_type == "audio")
        .map(|s| AudioStream {
            index: s.index,
            codec: s.codec(),
            channels: s.channels.unwrap_or(2),
            language: s.tags.language.clone(),
        })
        .collect();
    let subtitles = parsed
        .streams
        .iter()
        .filter(|s| s.codec_type == "subtitle")
        .map(|s| SubtitleStream {
            index: s.index,
            codec: s.codec(),
            language: s.tags.language.clone(),
        })
        .collect();

    Ok(MediaInfo {
        container: format.format_name,
        duration,
        video,
        audio,
        subtitles,
    })
}

fn parse_fraction(s: &str) -> Option<f64> {
    match s.split_once('/') {
        Some((num, den)) => {
            let (num, den) = (num.parse::<f64>().ok()?, den.parse::<f64>().ok()?);
            (den > 0.0).then(|| num / den)
        }
        None => s.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hdr_feature_film() {
        let json = serde_json::json!({
            "format": {
                "format_name": "matroska,webm",
                "duration": "7200.123"
            },
            "streams": [
                {
                    "index": 0,
                    "codec_type": "video",
                    "codec_name": "hevc",
                    "profile": "Main 10",
                    "width": 3840,
                    "height": 2160,
                    "pix_fmt": "yuv420p10le",
                    "sample_aspect_ratio": "1:1",
                    "display_aspect_ratio": "16:9",
                    "field_order": "progressive",
                    "color_transfer": "smpte2084",
                    "r_frame_rate": "24000/1001"
                },
                {
                    "index": 1,
                    "codec_type": "audio",
                    "codec_name": "ac3",
                    "channels": 6,
                    "tags": { "language": "eng" }
                },
                {
                    "index": 2,
                    "codec_type": "subtitle",
                    "codec_name": "subrip",
                    "tags": { "language": "eng" }
                },
                {
                    "index": 3,
                    "codec_type": "subtitle",
                    "codec_name": "hdmv_pgs_subtitle"
                }
            ]
        });

        let info = parse_probe_output(&json).unwrap();
        assert_eq!(info.container, "matroska,webm");
        assert!((info.duration.unwrap().as_secs_f64() - 7200.123).abs() < 0.001);

        let v = info.video.unwrap();
        assert_eq!(v.codec, "hevc");
        assert_eq!(v.frame_size, FrameSize::new(3840, 2160));
        assert_eq!(v.bit_depth(), 10);
        assert!(v.is_hdr());
        assert!(!v.interlaced);
        assert!(!v.is_anamorphic());
        assert!(!v.still_image);
        assert!((v.frame_rate.unwrap() - 23.976).abs() < 0.01);

        assert_eq!(info.audio.len(), 1);
        assert_eq!(info.audio[0].channels, 6);
        assert_eq!(info.audio[0].language.as_deref(), Some("eng"));

        assert_eq!(info.subtitles.len(), 2);
        assert!(!info.subtitles[0].is_image_based());
        assert!(info.subtitles[1].is_image_based());
    }

    #[test]
    fn interlaced_anamorphic_dvd() {
        let json = serde_json::json!({
            "format": { "format_name": "mpeg" },
            "streams": [{
                "index": 0,
                "codec_type": "video",
                "codec_name": "mpeg2video",
                "width": 720,
                "height": 480,
                "pix_fmt": "yuv420p",
                "sample_aspect_ratio": "32:27",
                "display_aspect_ratio": "16:9",
                "field_order": "tt"
            }]
        });
        let v = parse_probe_output(&json).unwrap().video.unwrap();
        assert!(v.interlaced);
        assert!(v.is_anamorphic());
        assert!(!v.anamorphic_edge_case);
    }

    #[test]
    fn still_images_and_cover_art() {
        let json = serde_json::json!({
            "format": { "format_name": "png_pipe" },
            "streams": [{
                "index": 0,
                "codec_type": "video",
                "codec_name": "png",
                "width": 400,
                "height": 200
            }]
        });
        assert!(parse_probe_output(&json).unwrap().video.unwrap().still_image);

        let json = serde_json::json!({
            "format": { "format_name": "mp3" },
            "streams": [{
                "index": 0,
                "codec_type": "video",
                "codec_name": "mjpeg",
                "disposition": { "attached_pic": 1 }
            }]
        });
        assert!(parse_probe_output(&json).unwrap().video.is_none());
    }

    #[test]
    fn frame_rate_fractions() {
        assert!((parse_fraction("24000/1001").unwrap() - 23.976).abs() < 0.01);
        assert_eq!(parse_fraction("25"), Some(25.0));
        assert!(parse_fraction("0/0").is_none());
    }
}

use std::time::Duration;

use channelcast_transcoder::capabilities::{CodecCapabilities, CodecSupport};
use channelcast_transcoder::encoder::VideoEncoder;
use channelcast_transcoder::filter::{Subtitle, SubtitleMethod, Watermark};
use channelcast_transcoder::format::{FrameSize, VideoFormat};
use channelcast_transcoder::input::{AudioStream, SubtitleStream, VideoStream};
use channelcast_transcoder::pipeline::{
    AudioSource, VideoSource, concat_pipeline, resize_pipeline,
};
use channelcast_transcoder::profile::{ChannelMetadata, HlsSettings, PlayoutSettings, TargetProfile};
use channelcast_transcoder::state::{HardwareAccelerationMode, OutputFormatKind};
use channelcast_transcoder::step::Step;
use channelcast_transcoder::{
    Pipeline, PipelineBuilder, PipelineRequest, SoftwareOnly, TranscodeError, TranscoderConfig,
};

fn video(codec: &str, pix_fmt: &str, width: u32, height: u32) -> VideoStream {
    VideoStream {
        index: 0,
        codec: codec.into(),
        pixel_format: Some(pix_fmt.into()),
        frame_size: FrameSize::new(width, height),
        frame_rate: Some(29.97),
        ..Default::default()
    }
}

fn request(stream: VideoStream, target: TargetProfile) -> PipelineRequest {
    PipelineRequest {
        video: VideoSource {
            path: "/media/show.mkv".into(),
            stream,
        },
        audio: Some(AudioSource {
            path: "/media/show.mkv".into(),
            stream: AudioStream {
                index: 1,
                codec: "aac".into(),
                channels: 2,
                language: None,
            },
        }),
        watermark: None,
        subtitle: None,
        graphics: None,
        target,
        playout: PlayoutSettings::default(),
    }
}

fn vaapi_caps() -> CodecCapabilities {
    CodecCapabilities {
        decoders: vec![
            CodecSupport::new(VideoFormat::H264, &[8]),
            CodecSupport::new(VideoFormat::Hevc, &[8, 10]),
        ],
        encoders: vec![CodecSupport::new(VideoFormat::H264, &[8])],
        rate_control: Vec::new(),
    }
}

fn vaapi_target() -> TargetProfile {
    TargetProfile {
        hardware_acceleration: HardwareAccelerationMode::Vaapi,
        ..Default::default()
    }
}

fn build(req: &PipelineRequest, caps: &CodecCapabilities) -> Pipeline {
    PipelineBuilder::new(req, caps, &TranscoderConfig::default())
        .build()
        .unwrap()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn video_encoder(pipeline: &Pipeline) -> &VideoEncoder {
    pipeline
        .steps()
        .iter()
        .find_map(|s| match s {
            Step::VideoEncoder(e) => Some(e),
            _ => None,
        })
        .unwrap()
}

#[test]
fn vaapi_ten_bit_source_converts_on_the_gpu() {
    let req = request(video("hevc", "yuv420p10le", 1920, 1080), vaapi_target());
    let pipeline = build(&req, &vaapi_caps());

    assert!(pipeline.uses_hardware());
    assert!(pipeline.environment().is_empty());

    let filters = pipeline
        .steps()
        .iter()
        .find_map(|s| match s {
            Step::Filter(f) => Some(f.video_filters()),
            _ => None,
        })
        .unwrap();
    assert_eq!(filters.len(), 1);
    assert!(filters[0].is_format_only());
    assert!(matches!(video_encoder(&pipeline), VideoEncoder::Vaapi { .. }));

    assert_eq!(
        pipeline.arguments(),
        strings(&[
            "-hwaccel",
            "vaapi",
            "-hwaccel_output_format",
            "vaapi",
            "-vaapi_device",
            "/dev/dri/renderD128",
            "-threads",
            "1",
            "-nostdin",
            "-hide_banner",
            "-nostats",
            "-loglevel",
            "error",
            "-fflags",
            "+genpts+discardcorrupt+igndts",
            "-readrate",
            "1.0",
            "-i",
            "/media/show.mkv",
            "-filter_complex",
            "[0:1]aresample=async=1[a];[0:0]scale_vaapi=format=nv12[v]",
            "-map",
            "[v]",
            "-map",
            "[a]",
            "-muxdelay",
            "0",
            "-muxpreload",
            "0",
            "-movflags",
            "+faststart",
            "-flags",
            "cgop",
            "-sc_threshold",
            "0",
            "-noautoscale",
            "-video_track_timescale",
            "90000",
            "-b:v",
            "2000k",
            "-maxrate:v",
            "2000k",
            "-bufsize:v",
            "4000k",
            "-c:v",
            "h264_vaapi",
            "-c:a",
            "aac",
            "-b:a",
            "192k",
            "-maxrate:a",
            "192k",
            "-bufsize:a",
            "384k",
            "-ar",
            "48k",
            "-map_metadata",
            "-1",
            "-f",
            "mpegts",
            "-mpegts_flags",
            "+initial_discontinuity",
            "pipe:1",
        ])
    );
}

#[test]
fn vaapi_driver_is_exported() {
    let target = TargetProfile {
        vaapi_driver: Some("iHD".into()),
        device: Some("/dev/dri/renderD129".into()),
        ..vaapi_target()
    };
    let req = request(video("h264", "yuv420p", 1280, 720), target);
    let pipeline = build(&req, &vaapi_caps());

    let env = pipeline.environment();
    assert_eq!(env.len(), 1);
    assert_eq!(env[0].key, "LIBVA_DRIVER_NAME");
    assert_eq!(env[0].value, "iHD");

    let args = pipeline.arguments().join(" ");
    assert!(args.contains("-vaapi_device /dev/dri/renderD129"));
    assert!(args.contains("scale_vaapi=1920:1080:force_original_aspect_ratio=decrease:format=nv12"));
}

#[test]
fn compiling_twice_gives_identical_output() {
    let mut req = request(video("hevc", "yuv420p10le", 3840, 2160), vaapi_target());
    req.playout.start = Some(Duration::from_secs(90));
    req.playout.finish = Some(Duration::from_secs(1890));

    let a = build(&req, &vaapi_caps());
    let b = build(&req, &vaapi_caps());
    assert_eq!(a.arguments(), b.arguments());
    assert_eq!(a.environment(), b.environment());
    assert_eq!(a.final_state(), b.final_state());

    let args = a.arguments().join(" ");
    assert!(args.contains("-ss 00:01:30"));
    assert!(args.contains("-t 00:30:00"));
}

/// Decodes 8-bit sources on the device and encodes both bit depths, so 10-bit
/// sources take the software-decode-then-upload path.
fn eight_bit_decode_caps() -> CodecCapabilities {
    CodecCapabilities {
        decoders: vec![
            CodecSupport::new(VideoFormat::H264, &[8]),
            CodecSupport::new(VideoFormat::Hevc, &[8]),
            CodecSupport::new(VideoFormat::Mpeg2Video, &[8]),
        ],
        encoders: vec![
            CodecSupport::new(VideoFormat::H264, &[8]),
            CodecSupport::new(VideoFormat::Hevc, &[8, 10]),
        ],
        rate_control: Vec::new(),
    }
}

fn filter_graph(pipeline: &Pipeline) -> String {
    let args = pipeline.arguments();
    args.iter()
        .position(|a| a == "-filter_complex")
        .map(|i| args[i + 1].clone())
        .unwrap_or_default()
}

#[test]
fn final_state_agrees_with_encoders() {
    let mut interlaced = video("hevc", "yuv420p10le", 1920, 1080);
    interlaced.interlaced = true;
    let sources = [
        video("h264", "yuv420p", 1920, 1080),
        video("hevc", "yuv420p10le", 3840, 2160),
        interlaced,
        video("mpeg2video", "yuv420p", 720, 480),
    ];
    let modes = [
        HardwareAccelerationMode::None,
        HardwareAccelerationMode::Nvenc,
        HardwareAccelerationMode::Qsv,
        HardwareAccelerationMode::Vaapi,
        HardwareAccelerationMode::VideoToolbox,
        HardwareAccelerationMode::Amf,
    ];
    let formats = [(VideoFormat::H264, 8), (VideoFormat::Hevc, 10)];
    let caps = eight_bit_decode_caps();

    for source in &sources {
        for mode in modes {
            for (video_format, bit_depth) in formats {
                let target = TargetProfile {
                    hardware_acceleration: mode,
                    video_format,
                    bit_depth,
                    allow_copy: false,
                    ..Default::default()
                };
                let req = request(source.clone(), target);
                let pipeline = build(&req, &caps);
                let encoder = video_encoder(&pipeline);
                let state = pipeline.final_state();
                let case = format!("{} {mode} {video_format} {bit_depth}", source.codec);

                assert_eq!(Some(state.video_format), encoder.video_format(), "{case}");
                let pf = encoder.pixel_format().unwrap();
                assert!(state.pixel_format.unwrap().same_wire(&pf), "{case}");
                assert_eq!(state.bit_depth(), bit_depth, "{case}");
                assert_eq!(state.padded_size, FrameSize::new(1920, 1080), "{case}");

                let expected_mode = if pipeline.uses_hardware() {
                    mode
                } else {
                    HardwareAccelerationMode::None
                };
                assert_eq!(state.hardware_acceleration_mode, expected_mode, "{case}");

                // 10-bit frames never pass through an 8-bit surface
                if source.bit_depth() == 10 && bit_depth == 10 {
                    assert!(!filter_graph(&pipeline).contains("nv12"), "{case}");
                }
            }
        }
    }
}

#[test]
fn software_decoded_ten_bit_uploads_p010() {
    let mut stream = video("hevc", "yuv420p10le", 1920, 1080);
    stream.interlaced = true;
    let target = |mode| TargetProfile {
        hardware_acceleration: mode,
        video_format: VideoFormat::Hevc,
        bit_depth: 10,
        allow_copy: false,
        ..Default::default()
    };

    let qsv = build(
        &request(stream.clone(), target(HardwareAccelerationMode::Qsv)),
        &eight_bit_decode_caps(),
    );
    let args = qsv.arguments().join(" ");
    assert!(args.contains("-c:v hevc -i /media/show.mkv"));
    assert!(filter_graph(&qsv).contains("[0:0]format=p010le,hwupload=extra_hw_frames=64,deinterlace_qsv[v]"));
    assert!(args.contains("-c:v hevc_qsv"));
    assert_eq!(qsv.final_state().pixel_format.map(|p| p.ffmpeg_name()), Some("p010le"));

    let vaapi = build(
        &request(stream, target(HardwareAccelerationMode::Vaapi)),
        &eight_bit_decode_caps(),
    );
    assert!(filter_graph(&vaapi).contains("[0:0]format=p010le|vaapi,hwupload,deinterlace_vaapi[v]"));
    assert!(vaapi.arguments().join(" ").contains("-c:v hevc_vaapi"));
    assert_eq!(vaapi.final_state().pixel_format.map(|p| p.ffmpeg_name()), Some("p010le"));
}

#[test]
fn folded_state_records_the_accelerator() {
    let target = TargetProfile {
        allow_copy: false,
        ..vaapi_target()
    };
    let req = request(video("hevc", "yuv420p", 1920, 1080), target);
    let pipeline = build(&req, &vaapi_caps());
    assert!(pipeline.uses_hardware());
    assert_eq!(
        pipeline.final_state().hardware_acceleration_mode,
        HardwareAccelerationMode::Vaapi
    );

    let fallback = request(video("vp9", "yuv420p", 1920, 1080), vaapi_target());
    let pipeline = build(&fallback, &CodecCapabilities::default());
    assert!(!pipeline.uses_hardware());
    assert_eq!(
        pipeline.final_state().hardware_acceleration_mode,
        HardwareAccelerationMode::None
    );
}

#[test]
fn unknown_audio_format_lets_ffmpeg_choose() {
    let mut target = TargetProfile {
        allow_copy: false,
        ..Default::default()
    };
    target.audio.format = Some("opus".into());
    let req = request(video("h264", "yuv420p", 1920, 1080), target);
    let pipeline = build(&req, &CodecCapabilities::default());
    let args = pipeline.arguments().join(" ");

    assert!(!args.contains("-c:a"));
    assert!(!args.contains("-b:a"));
    assert!(args.contains("[0:1]aresample=async=1[a]"));
    assert!(args.contains("-c:v libx264"));
    assert_eq!(pipeline.final_state().audio_format, None);
}

#[test]
fn anamorphic_interlaced_dvd_is_squared_and_padded() {
    let mut stream = video("mpeg2video", "yuv420p", 720, 480);
    stream.sample_aspect_ratio = Some("32:27".into());
    stream.display_aspect_ratio = Some("16:9".into());
    stream.interlaced = true;

    let req = request(stream, TargetProfile::default());
    let pipeline = build(&req, &CodecCapabilities::default());
    let args = pipeline.arguments().join(" ");

    assert!(args.contains("-c:v mpeg2video -i /media/show.mkv"));
    assert!(args.contains(
        "[0:0]yadif=1,scale=iw*sar:ih,setsar=1,scale=1920:1080:flags=fast_bilinear:force_original_aspect_ratio=decrease,pad=1920:1080:-1:-1:color=black[v]"
    ));

    let state = pipeline.final_state();
    assert!(state.deinterlaced);
    assert!(!state.is_anamorphic);
    assert_eq!(state.scaled_size, FrameSize::new(1918, 1080));
}

#[test]
fn still_image_loops_with_silent_audio() {
    let stream = VideoStream {
        codec: "png".into(),
        pixel_format: Some("rgb24".into()),
        frame_size: FrameSize::new(1920, 1080),
        still_image: true,
        ..Default::default()
    };
    let mut req = request(stream, TargetProfile::default());
    req.video.path = "/media/slate.png".into();
    req.audio = None;
    req.playout.finish = Some(Duration::from_secs(30));

    let pipeline = build(&req, &CodecCapabilities::default());
    let args = pipeline.arguments().join(" ");

    assert!(args.contains("-loop 1 -i /media/slate.png"));
    assert!(!args.contains("-readrate"));
    assert!(args.contains("-f lavfi -i anullsrc=channel_layout=stereo:sample_rate=48000"));
    assert!(args.contains("[1:0]aresample=async=1[a]"));
    assert!(args.contains("-map 0:0 -map [a]"));
    assert!(args.contains("-c:v libx264 -pix_fmt yuv420p"));
    assert!(args.contains("-t 00:00:30"));
}

#[test]
fn matching_source_is_copied() {
    let req = request(video("h264", "yuv420p", 1920, 1080), TargetProfile::default());
    let pipeline = build(&req, &CodecCapabilities::default());

    assert_eq!(
        pipeline.arguments().join(" "),
        "-nostdin -hide_banner -nostats -loglevel error -fflags +genpts+discardcorrupt+igndts \
         -readrate 1.0 -i /media/show.mkv -map 0:0 -map 0:1 \
         -muxdelay 0 -muxpreload 0 -movflags +faststart -flags cgop -sc_threshold 0 \
         -c:v copy -c:a copy -map_metadata -1 \
         -f mpegts -mpegts_flags +initial_discontinuity pipe:1"
    );
    assert!(!pipeline.uses_hardware());
}

#[test]
fn copy_still_transcodes_mismatched_audio() {
    let mut req = request(video("h264", "yuv420p", 1920, 1080), TargetProfile::default());
    if let Some(audio) = req.audio.as_mut() {
        audio.stream.codec = "ac3".into();
    }
    let pipeline = build(&req, &CodecCapabilities::default());
    let args = pipeline.arguments().join(" ");

    assert!(args.contains("-filter_complex [0:1]aresample=async=1[a] -map 0:0 -map [a]"));
    assert!(args.contains("-c:v copy -c:a aac"));
}

#[test]
fn software_hevc() {
    let target = TargetProfile {
        video_format: VideoFormat::Hevc,
        ..Default::default()
    };
    let req = request(video("h264", "yuv420p", 1920, 1080), target);
    let pipeline = build(&req, &CodecCapabilities::default());

    assert_eq!(
        pipeline.arguments().join(" "),
        "-nostdin -hide_banner -nostats -loglevel error -fflags +genpts+discardcorrupt+igndts \
         -readrate 1.0 -c:v h264 -i /media/show.mkv \
         -filter_complex [0:1]aresample=async=1[a] -map 0:0 -map [a] \
         -muxdelay 0 -muxpreload 0 -movflags +faststart -flags cgop -sc_threshold 0 \
         -video_track_timescale 90000 -b:v 2000k -maxrate:v 2000k -bufsize:v 4000k \
         -c:v libx265 -tag:v hvc1 -x265-params log-level=error \
         -c:a aac -b:a 192k -maxrate:a 192k -bufsize:a 384k -ar 48k \
         -map_metadata -1 -f mpegts -mpegts_flags +initial_discontinuity pipe:1"
    );
    assert_eq!(pipeline.final_state().video_format, VideoFormat::Hevc);
}

#[test]
fn hardware_pins_a_single_thread() {
    let caps = CodecCapabilities {
        decoders: vec![CodecSupport::new(VideoFormat::H264, &[8])],
        encoders: vec![CodecSupport::new(VideoFormat::H264, &[8])],
        rate_control: Vec::new(),
    };
    let target = TargetProfile {
        hardware_acceleration: HardwareAccelerationMode::Nvenc,
        thread_count: Some(4),
        allow_copy: false,
        ..Default::default()
    };
    let req = request(video("h264", "yuv420p", 1920, 1080), target);
    let pipeline = build(&req, &caps);
    let args = pipeline.arguments().join(" ");

    assert!(args.starts_with("-hwaccel cuda -hwaccel_output_format cuda -threads 1 "));
    assert!(!args.contains("-threads 4"));
    assert!(args.contains("-c:v h264_cuvid -i /media/show.mkv"));
    assert!(args.contains("-c:v h264_nvenc"));
}

#[test]
fn software_keeps_requested_threads() {
    let target = TargetProfile {
        thread_count: Some(4),
        allow_copy: false,
        ..Default::default()
    };
    let req = request(video("h264", "yuv420p", 1920, 1080), target);
    let args = build(&req, &CodecCapabilities::default()).arguments();
    assert_eq!(args[..2], ["-threads", "4"]);
}

#[test]
fn missing_hardware_support_falls_back_to_software() {
    let req = request(video("vp9", "yuv420p", 1920, 1080), vaapi_target());
    let caps = CodecCapabilities::default();
    let pipeline = PipelineBuilder::new(&req, &caps, &TranscoderConfig::default())
        .build()
        .unwrap();

    assert!(!pipeline.uses_hardware());
    let args = pipeline.arguments().join(" ");
    assert!(!args.contains("-vaapi_device"));
    assert!(args.contains("-c:v libx264"));
}

#[test]
fn surround_aac_sets_channel_count() {
    let mut target = TargetProfile {
        allow_copy: false,
        ..Default::default()
    };
    target.audio.channels = 6;
    let mut req = request(video("h264", "yuv420p", 1920, 1080), target);
    if let Some(audio) = req.audio.as_mut() {
        audio.stream.codec = "ac3".into();
        audio.stream.channels = 6;
    }
    let args = build(&req, &CodecCapabilities::default()).arguments().join(" ");
    assert!(args.contains("-c:a aac -ac 6"));

    let stereo = request(
        video("h264", "yuv420p", 1920, 1080),
        TargetProfile {
            allow_copy: false,
            ..Default::default()
        },
    );
    let args = build(&stereo, &CodecCapabilities::default()).arguments();
    assert!(!args.iter().any(|a| a == "-ac"));
}

#[test]
fn hls_output_records_playlist_in_state() {
    let mut req = request(
        video("h264", "yuv420p", 1920, 1080),
        TargetProfile {
            allow_copy: false,
            ..Default::default()
        },
    );
    req.playout.output_format = OutputFormatKind::Hls;
    req.playout.hls = Some(HlsSettings {
        playlist_path: "/tmp/hls/1/live.m3u8".into(),
        segment_template: "/tmp/hls/1/live%06d.ts".into(),
    });

    let pipeline = build(&req, &CodecCapabilities::default());
    let state = pipeline.final_state();
    assert_eq!(state.output_format_kind, Some(OutputFormatKind::Hls));
    assert_eq!(state.hls_playlist_path.as_deref(), Some("/tmp/hls/1/live.m3u8"));
    assert_eq!(
        state.hls_segment_template.as_deref(),
        Some("/tmp/hls/1/live%06d.ts")
    );

    let args = pipeline.arguments().join(" ");
    assert!(args.contains("-g 120 -keyint_min 120"));
    assert!(args.contains("-hls_segment_filename /tmp/hls/1/live%06d.ts"));
    assert!(args.ends_with("/tmp/hls/1/live.m3u8"));
}

#[test]
fn hls_without_paths_is_rejected() {
    let mut req = request(video("h264", "yuv420p", 1920, 1080), TargetProfile::default());
    req.playout.output_format = OutputFormatKind::Hls;
    let err = PipelineBuilder::new(&req, &SoftwareOnly, &TranscoderConfig::default())
        .build()
        .unwrap_err();
    assert!(matches!(err, TranscodeError::InvalidTarget(_)));
}

#[test]
fn unsupported_encoder_is_an_error() {
    let target = TargetProfile {
        video_format: VideoFormat::Vp9,
        ..Default::default()
    };
    let req = request(video("h264", "yuv420p", 1920, 1080), target);
    let err = PipelineBuilder::new(&req, &SoftwareOnly, &TranscoderConfig::default())
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        TranscodeError::UnsupportedCombination {
            step: "encoder",
            ..
        }
    ));
}

#[test]
fn zero_resolution_is_rejected() {
    let target = TargetProfile {
        resolution: FrameSize::new(0, 1080),
        ..Default::default()
    };
    let req = request(video("h264", "yuv420p", 1920, 1080), target);
    let err = PipelineBuilder::new(&req, &SoftwareOnly, &TranscoderConfig::default())
        .build()
        .unwrap_err();
    assert!(matches!(err, TranscodeError::InvalidTarget(_)));
}

#[test]
fn vaapi_watermark_composites_on_the_gpu() {
    let mut req = request(video("h264", "yuv420p", 1920, 1080), vaapi_target());
    req.watermark = Some(Watermark {
        path: "/config/logo.png".into(),
        stream: VideoStream {
            codec: "png".into(),
            frame_size: FrameSize::new(200, 100),
            still_image: true,
            ..Default::default()
        },
        location: Default::default(),
        size: Default::default(),
        opacity: 100,
        horizontal_margin_percent: 0.0,
        vertical_margin_percent: 0.0,
        place_within_source_content: false,
        z_index: 0,
        fade_points: Vec::new(),
    });

    let pipeline = build(&req, &vaapi_caps());
    let args = pipeline.arguments().join(" ");
    assert!(args.contains("-i /config/logo.png"));
    assert!(args.contains("[1:0]format=bgra,hwupload[wm]"));
    assert!(args.contains("overlay_vaapi"));
    assert!(args.contains("-map [vwm]"));
}

#[test]
fn text_subtitles_are_burned_in_software() {
    let mut req = request(
        video("h264", "yuv420p", 1920, 1080),
        TargetProfile::default(),
    );
    req.subtitle = Some(Subtitle {
        path: "/media/show.mkv".into(),
        stream: SubtitleStream {
            index: 2,
            codec: "subrip".into(),
            language: None,
        },
        relative_index: 0,
        method: SubtitleMethod::Burn,
    });

    let pipeline = build(&req, &CodecCapabilities::default());
    let args = pipeline.arguments().join(" ");
    assert!(args.contains("-copyts"));
    assert!(args.contains("subtitles=/media/show.mkv:si=0"));
    assert_eq!(pipeline.inputs().len(), 1);
}

#[test]
fn copied_subtitles_are_mapped() {
    let mut req = request(
        video("h264", "yuv420p", 1920, 1080),
        TargetProfile::default(),
    );
    req.subtitle = Some(Subtitle {
        path: "/media/show.mkv".into(),
        stream: SubtitleStream {
            index: 3,
            codec: "hdmv_pgs_subtitle".into(),
            language: None,
        },
        relative_index: 1,
        method: SubtitleMethod::Copy,
    });

    let args = build(&req, &CodecCapabilities::default()).arguments().join(" ");
    assert!(args.contains("-map 0:0 -map 0:1 -map 0:3"));
    assert!(args.contains("-c:s copy"));
}

#[test]
fn concat_and_resize_pipelines() {
    let metadata = ChannelMetadata {
        service_provider: Some("channelcast".into()),
        service_name: Some("Classics".into()),
        audio_language: None,
    };
    let concat = concat_pipeline("http://localhost:8409/ffmpeg/concat/3", &metadata);
    let args = concat.arguments().join(" ");
    assert!(args.contains("-c copy"));
    assert!(args.contains("service_name=\"Classics\""));

    let resize = resize_pipeline("/config/logo.png", "/cache/logo.png", 64);
    assert_eq!(
        resize.arguments().last().map(String::as_str),
        Some("/cache/logo.png")
    );
}

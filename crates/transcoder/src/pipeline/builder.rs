use tracing::{debug, error, info, warn};

use crate::capabilities::{Capability, HardwareCapabilities};
use crate::decision::{decide_audio, decide_video};
use crate::decoder::select_decoder;
use crate::encoder::{
    AudioEncoder, VideoEncoder, hardware_encoder_name, select_audio_encoder, select_video_encoder,
};
use crate::filter::overlay::{graphics_layer, picture_subtitle_layer, watermark_layer};
use crate::filter::{
    AudioFilter, BurnedSubtitles, ChainRequest, ComplexFilter, FilterBackend, StreamRef,
    SubtitleMethod, audio_filters, compose_video_chain, final_relocation,
};
use crate::format::{AudioFormat, VideoFormat};
use crate::input::{InputFile, InputKind, InputOption};
use crate::options::{GlobalOption, HardwareInit, HlsOutput, OutputFormat, OutputOption};
use crate::state::{FrameState, HardwareAccelerationMode, OutputFormatKind};
use crate::step::{PipelineStep, Step};
use crate::{TranscodeError, TranscoderConfig};

use super::{InputSet, Pipeline, PipelineRequest};

const DEFAULT_FRAME_RATE: u32 = 30;

/// Compiles one [`PipelineRequest`] against a set of capability facts.
pub struct PipelineBuilder<'a> {
    request: &'a PipelineRequest,
    capabilities: &'a dyn HardwareCapabilities,
    config: &'a TranscoderConfig,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(
        request: &'a PipelineRequest,
        capabilities: &'a dyn HardwareCapabilities,
        config: &'a TranscoderConfig,
    ) -> Self {
        Self {
            request,
            capabilities,
            config,
        }
    }

    pub fn build(&self) -> Result<Pipeline, TranscodeError> {
        let request = self.request;
        let target = &request.target;
        let playout = &request.playout;
        let source = &request.video.stream;

        let desired = target.desired_state(source, playout)?;
        let format = self.output_format()?;
        let initial = FrameState::from_source(source, playout.realtime, playout.infinite_loop);

        let burn = request
            .subtitle
            .as_ref()
            .filter(|s| s.method == SubtitleMethod::Burn);
        let burn_text = burn.filter(|s| !s.is_picture());
        let burn_picture = burn.filter(|s| s.is_picture());
        let has_overlays =
            burn.is_some() || request.watermark.is_some() || request.graphics.is_some();

        let decision = decide_video(&initial, &desired, target.allow_copy, has_overlays);
        debug!(copy = decision.copy, reasons = ?decision.reasons, "video copy decision");

        let mut inputs = InputSet::default();
        let video = StreamRef::new(
            inputs.add(self.video_input(burn_text.is_some())),
            source.index,
        );
        let audio = self.audio_input(&mut inputs);
        let subtitle = request
            .subtitle
            .as_ref()
            .filter(|s| s.method != SubtitleMethod::Burn)
            .map(|s| {
                let file = InputFile::new(&s.path, InputKind::Subtitle(s.stream.clone()));
                (StreamRef::new(inputs.add(file), s.stream.index), s.method)
            });

        if decision.copy {
            return self.build_copy(inputs, initial, video, audio, subtitle, format);
        }

        let mode = target.hardware_acceleration;
        let video_format = if playout.output_format == OutputFormatKind::Nut {
            VideoFormat::RawVideo
        } else {
            target.video_format
        };
        let (decoder_mode, encoder_mode) = self.reconcile(mode, video_format);

        let decoder = select_decoder(source, decoder_mode, target.deinterlace)?;
        let encoder = select_video_encoder(
            video_format,
            target.pixel_format(),
            encoder_mode,
            target.video_profile.clone(),
            target.video_preset.clone(),
            self.capabilities.rate_control_mode(video_format),
        )?;

        let uses_hardware = decoder.is_hardware() || encoder.is_hardware();
        let backend = FilterBackend::for_pipeline(mode, decoder.is_hardware(), encoder.is_hardware());
        info!(
            %mode,
            ?decoder,
            encoder = encoder.name().as_deref().unwrap_or("implicit"),
            ?backend,
            "compiling transcode pipeline"
        );

        let mut steps = Vec::new();
        if uses_hardware {
            steps.push(Step::Global(GlobalOption::HardwareAcceleration(HardwareInit {
                mode,
                decode: decoder.is_hardware(),
                device: target.device.clone().or_else(|| {
                    (mode == HardwareAccelerationMode::Vaapi).then(|| self.config.vaapi_device.clone())
                }),
                driver: target.vaapi_driver.clone(),
            })));
        }
        steps.extend(self.global_steps(uses_hardware));

        let decoded = decoder.next_state(&initial);
        steps.push(Step::Decoder(decoder));

        let fonts_dir = self
            .config
            .fonts_dir
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());
        let chain = compose_video_chain(
            &ChainRequest {
                backend,
                encoder: &encoder,
                desired: &desired,
                scaling: target.scaling,
                anamorphic_edge_case: source.anamorphic_edge_case,
                tonemap_algorithm: &target.tonemap_algorithm,
                burned_subtitles: burn_text.map(|s| BurnedSubtitles {
                    path: &s.path,
                    stream_index: s.relative_index,
                    fonts_dir: fonts_dir.as_deref(),
                }),
                has_overlays: burn_picture.is_some()
                    || request.watermark.is_some()
                    || request.graphics.is_some(),
            },
            decoded.clone(),
        );

        let mut layers = Vec::new();
        if let Some(sub) = burn_picture {
            let index = inputs.add(InputFile::new(
                &sub.path,
                InputKind::Subtitle(sub.stream.clone()),
            ));
            layers.push(picture_subtitle_layer(
                (index, sub.stream.index),
                chain.overlay_backend,
                source.frame_size,
                chain.state.padded_size,
            ));
        }
        if let Some(wm) = &request.watermark {
            let mut file = InputFile::new(&wm.path, InputKind::Watermark(wm.stream.clone()));
            if wm.stream.codec == "gif" {
                file.add_option(InputOption::DoNotIgnoreLoop);
            } else if !wm.fade_points.is_empty() || !wm.stream.still_image {
                file.add_option(InputOption::InfiniteLoop);
            }
            let index = inputs.add(file);
            layers.push(watermark_layer(
                wm,
                (index, wm.stream.index),
                chain.overlay_backend,
                chain.state.scaled_size,
                chain.state.padded_size,
            ));
        }
        if let Some(gfx) = &request.graphics {
            let mut file = InputFile::new(
                &gfx.path,
                InputKind::GraphicsOverlay {
                    size: gfx.size,
                    frame_rate: gfx.frame_rate,
                },
            );
            file.add_option(InputOption::RawVideoFormat);
            let index = inputs.add(file);
            layers.push(graphics_layer(
                gfx,
                (index, 0),
                chain.overlay_backend,
                chain.state.bit_depth() == 10,
            ));
        }

        let tail: Vec<_> = final_relocation(backend, &encoder, &chain.state)
            .into_iter()
            .collect();
        let audio_encoder = select_audio_encoder(target.audio.format.as_deref());

        let mut complex = ComplexFilter::new(Some(video), audio)
            .with_video_filters(chain.filters)
            .with_overlays(layers)
            .with_tail(tail)
            .with_audio_filters(self.audio_filter_chain(audio_encoder));
        if let Some((stream, _)) = subtitle {
            complex = complex.with_subtitle_stream(stream);
        }
        let filtered = complex.next_state(&decoded);
        steps.push(Step::Filter(complex));

        steps.extend(self.container_steps(&encoder, &format, backend.is_hardware()));
        if let (Some(bitrate), Some(buffer_size)) = (target.video_bitrate, target.video_buffer_size) {
            steps.push(Step::Output(OutputOption::VideoBitrate {
                bitrate,
                buffer_size,
            }));
        }
        if let Some(rate) = target.frame_rate {
            steps.push(Step::Output(OutputOption::FrameRate(rate)));
        }

        let encoder_format = encoder.pixel_format();
        steps.push(Step::VideoEncoder(encoder.clone()));
        if let Some(pf) = encoder_format {
            let matches = filtered.pixel_format.is_some_and(|p| p.same_wire(&pf));
            if !filtered.is_hardware() && !matches {
                steps.push(Step::Output(OutputOption::PixelFormat(pf)));
            }
        }

        steps.extend(self.audio_steps(audio_encoder));
        steps.extend(self.trailing_steps(subtitle.map(|(_, method)| method), format));

        let pipeline = Pipeline::new(steps, inputs.into_files(), initial);
        check_final_state(pipeline.final_state(), &encoder, audio_encoder);
        Ok(pipeline)
    }

    /// The backend each side may use, given what the capability facts allow.
    fn reconcile(
        &self,
        mode: HardwareAccelerationMode,
        video_format: VideoFormat,
    ) -> (HardwareAccelerationMode, HardwareAccelerationMode) {
        if !mode.is_hardware() {
            return (HardwareAccelerationMode::None, HardwareAccelerationMode::None);
        }
        let source = &self.request.video.stream;

        let decoder_mode = match VideoFormat::from_codec_name(&source.codec) {
            Some(format)
                if mode != HardwareAccelerationMode::Amf
                    && self.capabilities.can_decode(format, source.pixel_format())
                        == Capability::Hardware =>
            {
                mode
            }
            _ => HardwareAccelerationMode::None,
        };

        let encodes = self
            .capabilities
            .can_encode(video_format, Some(self.request.target.pixel_format()))
            == Capability::Hardware;
        let encoder_mode = if encodes && hardware_encoder_name(mode, video_format).is_some() {
            mode
        } else {
            HardwareAccelerationMode::None
        };

        if !decoder_mode.is_hardware() && !encoder_mode.is_hardware() {
            warn!(%mode, codec = %source.codec, %video_format, "accelerator cannot handle this item, using software");
        }
        (decoder_mode, encoder_mode)
    }

    fn build_copy(
        &self,
        inputs: InputSet,
        initial: FrameState,
        video: StreamRef,
        audio: Option<StreamRef>,
        subtitle: Option<(StreamRef, SubtitleMethod)>,
        format: OutputFormat,
    ) -> Result<Pipeline, TranscodeError> {
        let target = &self.request.target;
        let copy_audio = self
            .request
            .audio
            .as_ref()
            .is_some_and(|a| decide_audio(&a.stream, &target.audio, target.allow_copy).copy);
        let audio_encoder = if copy_audio {
            Some(AudioEncoder::Copy)
        } else {
            select_audio_encoder(target.audio.format.as_deref())
        };
        info!(copy_audio, "copying video stream");

        let mut steps = self.global_steps(false);

        let mut complex = ComplexFilter::new(Some(video), audio)
            .with_audio_filters(self.audio_filter_chain(audio_encoder));
        if let Some((stream, _)) = subtitle {
            complex = complex.with_subtitle_stream(stream);
        }
        steps.push(Step::Filter(complex));

        steps.extend(self.container_steps(&VideoEncoder::Copy, &format, false));
        steps.push(Step::VideoEncoder(VideoEncoder::Copy));
        steps.extend(self.audio_steps(audio_encoder));
        steps.extend(self.trailing_steps(subtitle.map(|(_, method)| method), format));

        let pipeline = Pipeline::new(steps, inputs.into_files(), initial);
        check_final_state(pipeline.final_state(), &VideoEncoder::Copy, audio_encoder);
        Ok(pipeline)
    }

    fn video_input(&self, copy_timestamps: bool) -> InputFile {
        let playout = &self.request.playout;
        let source = &self.request.video;
        let mut file = InputFile::new(&source.path, InputKind::Video(source.stream.clone()));
        if let Some(start) = playout.start.filter(|s| !s.is_zero()) {
            file.add_option(InputOption::StreamSeek(start));
        }
        if copy_timestamps {
            file.add_option(InputOption::CopyTimestamp);
        }
        if playout.infinite_loop || source.stream.still_image {
            file.add_option(InputOption::InfiniteLoop);
        }
        if playout.realtime {
            file.add_option(InputOption::Readrate {
                initial_burst: playout.readrate_initial_burst,
            });
        }
        file
    }

    fn audio_input(&self, inputs: &mut InputSet) -> Option<StreamRef> {
        let playout = &self.request.playout;
        match &self.request.audio {
            Some(audio) => {
                let mut file = InputFile::new(&audio.path, InputKind::Audio(audio.stream.clone()));
                if let Some(start) = playout.start.filter(|s| !s.is_zero()) {
                    file.add_option(InputOption::StreamSeek(start));
                }
                if playout.infinite_loop {
                    file.add_option(InputOption::InfiniteLoop);
                }
                if playout.realtime {
                    file.add_option(InputOption::Readrate {
                        initial_burst: playout.readrate_initial_burst,
                    });
                }
                Some(StreamRef::new(inputs.add(file), audio.stream.index))
            }
            None => {
                let mut file = InputFile::null_audio(self.request.target.audio.channels);
                file.add_option(InputOption::LavfiFormat);
                Some(StreamRef::new(inputs.add(file), 0))
            }
        }
    }

    fn global_steps(&self, uses_hardware: bool) -> Vec<Step> {
        let target = &self.request.target;
        let mut steps = Vec::new();

        let threads = if uses_hardware {
            if target.thread_count.is_some_and(|n| n != 1) {
                info!(
                    requested = ?target.thread_count,
                    "hardware acceleration in use, limiting ffmpeg to one thread"
                );
            }
            Some(1)
        } else {
            target.thread_count
        };
        if let Some(n) = threads {
            steps.push(Step::Global(GlobalOption::Threads(n)));
        }

        steps.push(Step::Global(GlobalOption::Quiet));
        steps.push(Step::Global(GlobalOption::GenerateTimestamps));
        if self.request.playout.save_report {
            steps.push(Step::Global(GlobalOption::Report(
                self.config.reports_dir.to_string_lossy().into_owned(),
            )));
        }
        steps
    }

    fn container_steps(
        &self,
        encoder: &VideoEncoder,
        format: &OutputFormat,
        hardware_filters: bool,
    ) -> Vec<Step> {
        let keyframes_only = encoder.video_format() == Some(VideoFormat::Mpeg2Video)
            || encoder.mode() == HardwareAccelerationMode::VideoToolbox;
        let mut options = vec![
            OutputOption::NoMuxDelay,
            OutputOption::FastStart {
                fragmented: *format == OutputFormat::Mp4,
            },
            OutputOption::ClosedGop,
            OutputOption::SceneChangeThreshold(if keyframes_only { 1_000_000_000 } else { 0 }),
        ];
        if hardware_filters {
            options.push(OutputOption::NoAutoScale);
        }
        if *encoder != VideoEncoder::Copy {
            options.push(OutputOption::VideoTrackTimescale);
        }
        options.into_iter().map(Step::Output).collect()
    }

    fn audio_filter_chain(&self, encoder: Option<AudioEncoder>) -> Vec<AudioFilter> {
        if encoder == Some(AudioEncoder::Copy) {
            return Vec::new();
        }
        let audio = &self.request.target.audio;
        audio_filters(audio.normalize_loudness, audio.pad_to)
    }

    fn audio_steps(&self, encoder: Option<AudioEncoder>) -> Vec<Step> {
        let audio = &self.request.target.audio;
        let mut steps = Vec::new();
        let Some(encoder) = encoder else {
            return steps;
        };
        steps.push(Step::AudioEncoder(encoder));
        if encoder == AudioEncoder::Copy {
            return steps;
        }

        let source_channels = self
            .request
            .audio
            .as_ref()
            .map(|a| a.stream.channels)
            .unwrap_or(audio.channels);
        let aac_surround = encoder.audio_format() == AudioFormat::Aac && audio.channels > 2;
        if source_channels != audio.channels || aac_surround {
            steps.push(Step::Output(OutputOption::AudioChannels(audio.channels)));
        }
        if let (Some(bitrate), Some(buffer_size)) = (audio.bitrate, audio.buffer_size) {
            steps.push(Step::Output(OutputOption::AudioBitrate {
                bitrate,
                buffer_size,
            }));
        }
        if let Some(rate) = audio.sample_rate {
            steps.push(Step::Output(OutputOption::AudioSampleRate(rate)));
        }
        steps
    }

    fn trailing_steps(&self, subtitle: Option<SubtitleMethod>, format: OutputFormat) -> Vec<Step> {
        let playout = &self.request.playout;
        let mut steps = Vec::new();
        if let Some(finish) = playout.finish {
            let duration = finish.saturating_sub(playout.start.unwrap_or_default());
            if !duration.is_zero() {
                steps.push(Step::Output(OutputOption::Duration(duration)));
            }
        }
        steps.push(Step::Output(OutputOption::Metadata(playout.metadata.clone())));
        if let Some(method) = subtitle {
            steps.push(Step::Output(OutputOption::SubtitleCodec(method)));
        }
        steps.push(Step::Format(format));
        steps
    }

    fn output_format(&self) -> Result<OutputFormat, TranscodeError> {
        let playout = &self.request.playout;
        Ok(match playout.output_format {
            OutputFormatKind::MpegTs => OutputFormat::MpegTs,
            OutputFormatKind::Mp4 => OutputFormat::Mp4,
            OutputFormatKind::Mkv => OutputFormat::Mkv,
            OutputFormatKind::Nut => OutputFormat::Nut,
            OutputFormatKind::Hls => {
                let hls = playout.hls.as_ref().ok_or_else(|| {
                    TranscodeError::InvalidTarget(
                        "hls output needs a playlist path and segment template".into(),
                    )
                })?;
                let frame_rate = self
                    .request
                    .target
                    .frame_rate
                    .or_else(|| self.request.video.stream.frame_rate.map(|r| r.round() as u32))
                    .filter(|r| *r > 0)
                    .unwrap_or(DEFAULT_FRAME_RATE);
                OutputFormat::Hls(HlsOutput {
                    playlist_path: hls.playlist_path.clone(),
                    segment_template: hls.segment_template.clone(),
                    segment_secs: self.config.hls_segment_secs,
                    frame_rate,
                })
            }
        })
    }
}

/// The folded state must agree with what the encoders consume.
fn check_final_state(state: &FrameState, encoder: &VideoEncoder, audio: Option<AudioEncoder>) {
    let mut mismatches = Vec::new();
    if let Some(format) = encoder.video_format() {
        if state.video_format != format {
            mismatches.push(format!("video format {} != {format}", state.video_format));
        }
    }
    if let Some(pf) = encoder.pixel_format() {
        if !state.pixel_format.is_some_and(|p| p.same_wire(&pf)) {
            mismatches.push(format!("pixel format {:?} != {pf}", state.pixel_format));
        }
    }
    if let Some(audio) = audio {
        if state.audio_format != Some(audio.audio_format()) {
            mismatches.push(format!(
                "audio format {:?} != {}",
                state.audio_format,
                audio.audio_format()
            ));
        }
    }
    if !mismatches.is_empty() {
        error!(?mismatches, "folded pipeline state disagrees with the encoders");
        debug_assert!(false, "folded pipeline state disagrees with the encoders: {mismatches:?}");
    }
}

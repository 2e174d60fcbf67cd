//! Assembles the `-filter_complex` graph and its stream mappings.

use crate::state::FrameState;
use crate::step::PipelineStep;

use super::audio::AudioFilter;
use super::overlay::OverlayLayer;
use super::video::VideoFilter;

/// An input stream addressed as `input:stream`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRef {
    pub input: usize,
    pub stream: u32,
}

impl StreamRef {
    pub fn new(input: usize, stream: u32) -> Self {
        Self { input, stream }
    }

    fn label(&self) -> String {
        format!("[{}:{}]", self.input, self.stream)
    }

    fn specifier(&self) -> String {
        format!("{}:{}", self.input, self.stream)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ComplexFilter {
    video: Option<StreamRef>,
    video_filters: Vec<VideoFilter>,
    overlays: Vec<OverlayLayer>,
    /// Runs after the last overlay, or at the end of the main chain without overlays.
    tail: Vec<VideoFilter>,
    audio: Option<StreamRef>,
    audio_filters: Vec<AudioFilter>,
    subtitle: Option<StreamRef>,
}

impl ComplexFilter {
    pub fn new(video: Option<StreamRef>, audio: Option<StreamRef>) -> Self {
        Self {
            video,
            audio,
            ..Default::default()
        }
    }

    pub fn with_video_filters(mut self, filters: Vec<VideoFilter>) -> Self {
        self.video_filters = filters;
        self
    }

    /// Layers are composited in ascending z-index; ties keep insertion order.
    pub fn with_overlays(mut self, mut overlays: Vec<OverlayLayer>) -> Self {
        overlays.sort_by_key(|layer| layer.z_index);
        self.overlays = overlays;
        self
    }

    pub fn with_tail(mut self, tail: Vec<VideoFilter>) -> Self {
        self.tail = tail;
        self
    }

    pub fn with_audio_filters(mut self, filters: Vec<AudioFilter>) -> Self {
        self.audio_filters = filters;
        self
    }

    pub fn with_subtitle_stream(mut self, subtitle: StreamRef) -> Self {
        self.subtitle = Some(subtitle);
        self
    }

    pub fn video_filters(&self) -> &[VideoFilter] {
        &self.video_filters
    }

    pub fn overlays(&self) -> &[OverlayLayer] {
        &self.overlays
    }

    pub fn has_video_filters(&self) -> bool {
        !(self.video_filters.is_empty() && self.overlays.is_empty() && self.tail.is_empty())
    }

    /// The filter graph text and the labels to map, video first.
    pub fn graph(&self) -> (String, Option<String>, Option<String>) {
        let mut chains = Vec::new();

        let audio_label = self.audio.map(|audio| {
            if self.audio_filters.is_empty() {
                audio.specifier()
            } else {
                let body: Vec<String> = self.audio_filters.iter().map(AudioFilter::filter).collect();
                chains.push(format!("{}{}[a]", audio.label(), body.join(",")));
                "[a]".to_string()
            }
        });

        let video_label = self.video.map(|video| {
            if !self.has_video_filters() {
                return video.specifier();
            }

            let render = |filters: &[VideoFilter]| -> Vec<String> {
                filters
                    .iter()
                    .map(VideoFilter::filter)
                    .filter(|f| !f.is_empty())
                    .collect()
            };
            let mut main = render(&self.video_filters);
            if self.overlays.is_empty() {
                main.extend(render(&self.tail));
            }

            let mut current = if main.is_empty() {
                video.label()
            } else {
                chains.push(format!("{}{}[v]", video.label(), main.join(",")));
                "[v]".to_string()
            };

            let last = self.overlays.len().saturating_sub(1);
            for (i, layer) in self.overlays.iter().enumerate() {
                let side = StreamRef::new(layer.input.0, layer.input.1);
                let side_label = if layer.prepare.is_empty() {
                    side.label()
                } else {
                    chains.push(format!(
                        "{}{}[{}]",
                        side.label(),
                        layer.prepare.join(","),
                        layer.label
                    ));
                    format!("[{}]", layer.label)
                };

                let mut composite = vec![layer.overlay.filter()];
                if i == last {
                    composite.extend(render(&self.tail));
                }
                let output = format!("[{}]", layer.output_label());
                chains.push(format!("{current}{side_label}{}{output}", composite.join(",")));
                current = output;
            }
            current
        });

        (chains.join(";"), video_label, audio_label)
    }
}

impl PipelineStep for ComplexFilter {
    fn filter_options(&self) -> Vec<String> {
        let (graph, video, audio) = self.graph();
        let mut args = Vec::new();
        if !graph.is_empty() {
            args.push("-filter_complex".into());
            args.push(graph);
        }
        for label in [video, audio].into_iter().flatten() {
            args.push("-map".into());
            args.push(label);
        }
        if let Some(subtitle) = self.subtitle {
            args.push("-map".into());
            args.push(subtitle.specifier());
        }
        args
    }

    /// Folds the main chain, then the tail. Overlays leave the main frame state alone.
    fn next_state(&self, current: &FrameState) -> FrameState {
        self.video_filters
            .iter()
            .chain(&self.tail)
            .fold(current.clone(), |state, filter| filter.next_state(&state))
    }
}

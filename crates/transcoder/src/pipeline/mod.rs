//! A compiled pipeline and the argument assembly that turns it into an ffmpeg
//! command line.

mod builder;
mod special;

pub use builder::PipelineBuilder;
pub use special::{concat_pipeline, resize_pipeline};

use serde::{Deserialize, Serialize};

use crate::filter::{GraphicsOverlay, Subtitle, Watermark};
use crate::input::{AudioStream, InputFile, VideoStream};
use crate::profile::{PlayoutSettings, TargetProfile};
use crate::state::FrameState;
use crate::step::{EnvironmentVariable, PipelineStep, Step};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSource {
    pub path: String,
    pub stream: VideoStream,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSource {
    pub path: String,
    pub stream: AudioStream,
}

/// Everything needed to compile one playout item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub video: VideoSource,
    #[serde(default)]
    pub audio: Option<AudioSource>,
    #[serde(default)]
    pub watermark: Option<Watermark>,
    #[serde(default)]
    pub subtitle: Option<Subtitle>,
    #[serde(default)]
    pub graphics: Option<GraphicsOverlay>,
    #[serde(default)]
    pub target: TargetProfile,
    #[serde(default)]
    pub playout: PlayoutSettings,
}

/// Ordered steps plus the distinct inputs they read.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<Step>,
    inputs: Vec<InputFile>,
    final_state: FrameState,
}

impl Pipeline {
    pub(crate) fn new(steps: Vec<Step>, inputs: Vec<InputFile>, initial: FrameState) -> Self {
        let final_state = steps
            .iter()
            .fold(initial, |state, step| step.next_state(&state));
        Self {
            steps,
            inputs,
            final_state,
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn inputs(&self) -> &[InputFile] {
        &self.inputs
    }

    /// The state after folding every step over the source state.
    pub fn final_state(&self) -> &FrameState {
        &self.final_state
    }

    pub fn environment(&self) -> Vec<EnvironmentVariable> {
        self.steps
            .iter()
            .flat_map(|s| s.environment_variables())
            .collect()
    }

    /// Global options, then each input with its options, then the filter
    /// graph, then output options and the output format.
    pub fn arguments(&self) -> Vec<String> {
        let mut args: Vec<String> = self.steps.iter().flat_map(|s| s.global_options()).collect();

        for input in &self.inputs {
            args.extend(input.option_arguments());
            for step in &self.steps {
                args.extend(step.input_options(input));
            }
            args.push("-i".into());
            args.push(input.path.clone());
        }

        args.extend(self.steps.iter().flat_map(|s| s.filter_options()));
        args.extend(self.steps.iter().flat_map(|s| s.output_options()));
        args
    }

    /// Whether any step runs on an accelerator.
    pub fn uses_hardware(&self) -> bool {
        self.steps.iter().any(|s| match s {
            Step::Decoder(d) => d.is_hardware(),
            Step::VideoEncoder(e) => e.is_hardware(),
            _ => false,
        })
    }
}

/// Distinct inputs in first-use order.
#[derive(Debug, Default)]
pub(crate) struct InputSet {
    files: Vec<InputFile>,
}

impl InputSet {
    /// Register an input and return its ffmpeg index. A path already
    /// registered keeps its first index and options.
    pub fn add(&mut self, file: InputFile) -> usize {
        if let Some(i) = self.files.iter().position(|f| f.path == file.path) {
            return i;
        }
        self.files.push(file);
        self.files.len() - 1
    }

    pub fn into_files(self) -> Vec<InputFile> {
        self.files
    }
}

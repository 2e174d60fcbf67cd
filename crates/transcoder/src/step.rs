use serde::Serialize;

use crate::decoder::Decoder;
use crate::encoder::{AudioEncoder, VideoEncoder};
use crate::filter::ComplexFilter;
use crate::input::InputFile;
use crate::options::{GlobalOption, OutputFormat, OutputOption};
use crate::state::FrameState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentVariable {
    pub key: String,
    pub value: String,
}

impl EnvironmentVariable {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The contract every pipeline participant satisfies.
///
/// Implementations must be pure: the same step always contributes the same
/// arguments and the same state transition.
pub trait PipelineStep {
    fn environment_variables(&self) -> Vec<EnvironmentVariable> {
        Vec::new()
    }

    fn global_options(&self) -> Vec<String> {
        Vec::new()
    }

    fn input_options(&self, _input: &InputFile) -> Vec<String> {
        Vec::new()
    }

    fn filter_options(&self) -> Vec<String> {
        Vec::new()
    }

    fn output_options(&self) -> Vec<String> {
        Vec::new()
    }

    fn next_state(&self, current: &FrameState) -> FrameState {
        current.clone()
    }
}

/// Closed set of participants in a compiled pipeline.
#[derive(Debug, Clone)]
pub enum Step {
    Global(GlobalOption),
    Decoder(Decoder),
    Filter(ComplexFilter),
    Output(OutputOption),
    VideoEncoder(VideoEncoder),
    AudioEncoder(AudioEncoder),
    Format(OutputFormat),
}

impl Step {
    fn inner(&self) -> &dyn PipelineStep {
        match self {
            Self::Global(s) => s,
            Self::Decoder(s) => s,
            Self::Filter(s) => s,
            Self::Output(s) => s,
            Self::VideoEncoder(s) => s,
            Self::AudioEncoder(s) => s,
            Self::Format(s) => s,
        }
    }
}

impl PipelineStep for Step {
    fn environment_variables(&self) -> Vec<EnvironmentVariable> {
        self.inner().environment_variables()
    }

    fn global_options(&self) -> Vec<String> {
        self.inner().global_options()
    }

    fn input_options(&self, input: &InputFile) -> Vec<String> {
        self.inner().input_options(input)
    }

    fn filter_options(&self) -> Vec<String> {
        self.inner().filter_options()
    }

    fn output_options(&self) -> Vec<String> {
        self.inner().output_options()
    }

    fn next_state(&self, current: &FrameState) -> FrameState {
        self.inner().next_state(current)
    }
}

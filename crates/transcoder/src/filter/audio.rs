use std::time::Duration;

use crate::profile::LoudnessNormalization;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioFilter {
    Resample,
    LoudNorm,
    DynAudNorm,
    /// Pad with silence up to a total duration.
    Pad(Duration),
}

impl AudioFilter {
    pub fn filter(&self) -> String {
        match self {
            Self::Resample => "aresample=async=1".into(),
            Self::LoudNorm => "loudnorm=I=-16:TP=-1.5:LRA=11".into(),
            Self::DynAudNorm => "dynaudnorm=f=500:g=31".into(),
            Self::Pad(d) => format!("apad=whole_dur={}ms", d.as_millis()),
        }
    }
}

/// The audio chain for a transcoded stream.
pub fn audio_filters(normalize: LoudnessNormalization, pad_to: Option<Duration>) -> Vec<AudioFilter> {
    let mut filters = vec![AudioFilter::Resample];
    match normalize {
        LoudnessNormalization::Off => {}
        LoudnessNormalization::LoudNorm => filters.push(AudioFilter::LoudNorm),
        LoudnessNormalization::DynAudNorm => filters.push(AudioFilter::DynAudNorm),
    }
    if let Some(d) = pad_to {
        filters.push(AudioFilter::Pad(d));
    }
    filters
}

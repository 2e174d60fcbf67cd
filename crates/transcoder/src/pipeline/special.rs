//! Pipelines that bypass the general compiler.

use tracing::debug;

use crate::format::FrameSize;
use crate::input::{InputFile, InputKind, InputOption, VideoStream};
use crate::options::{GlobalOption, OutputFormat, OutputOption};
use crate::profile::ChannelMetadata;
use crate::state::FrameState;
use crate::step::Step;

use super::Pipeline;

/// Stream an endless concat playlist, copying every stream.
pub fn concat_pipeline(playlist_url: &str, metadata: &ChannelMetadata) -> Pipeline {
    let mut input = InputFile::new(playlist_url, InputKind::Concat);
    input.add_option(InputOption::ConcatFormat);
    input.add_option(InputOption::Readrate { initial_burst: 0 });
    input.add_option(InputOption::InfiniteLoop);

    let steps = vec![
        Step::Global(GlobalOption::Quiet),
        Step::Global(GlobalOption::GenerateTimestamps),
        Step::Output(OutputOption::NoMuxDelay),
        Step::Output(OutputOption::FastStart { fragmented: false }),
        Step::Output(OutputOption::ClosedGop),
        Step::Output(OutputOption::SceneChangeThreshold(0)),
        Step::Output(OutputOption::CopyAll),
        Step::Output(OutputOption::Metadata(metadata.clone())),
        Step::Format(OutputFormat::MpegTs),
    ];
    debug!(playlist = playlist_url, "compiled concat pipeline");
    Pipeline::new(steps, vec![input], FrameState::from_source(&VideoStream::default(), true, true))
}

/// Downscale an image to `height`, keeping its aspect ratio.
pub fn resize_pipeline(input_path: &str, output_path: &str, height: u32) -> Pipeline {
    let stream = VideoStream {
        frame_size: FrameSize::new(0, height),
        still_image: true,
        ..Default::default()
    };
    let input = InputFile::new(input_path, InputKind::Video(stream.clone()));
    let steps = vec![
        Step::Global(GlobalOption::Quiet),
        Step::Output(OutputOption::SimpleVideoFilter(format!(
            "scale=-1:{height}:force_original_aspect_ratio=decrease"
        ))),
        Step::Format(OutputFormat::File(output_path.to_string())),
    ];
    Pipeline::new(steps, vec![input], FrameState::from_source(&stream, false, false))
}

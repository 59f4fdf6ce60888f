//! Per-stream scale and pixel-format conversion.
//!
//! Every active stream owns a [`FilterPipeline`]: an FFmpeg filter graph
//! of `buffer → scale → format → buffersink` that rescales decoded frames
//! to the requested output dimensions and converts them to RGB24. The
//! graph is built once at activation time and reused for every frame.

use ffmpeg_next::{decoder, filter, frame, Rational};
use ffmpeg_sys_next::AVPixelFormat;

use crate::error::DecodeError;
use crate::options::VideoStreamOptions;

pub(crate) struct FilterPipeline {
    graph: filter::Graph,
}

impl FilterPipeline {
    /// Build the conversion graph for a freshly-opened video decoder.
    ///
    /// The buffer source advertises the codec's dimensions, pixel format,
    /// the stream time base, and the sample aspect ratio. The chain scales
    /// to `options.width`/`options.height` when both are set (the codec's
    /// native size otherwise) and pins the sink to RGB24.
    pub(crate) fn new(
        video: &decoder::Video,
        time_base: Rational,
        options: &VideoStreamOptions,
    ) -> Result<Self, DecodeError> {
        let mut graph = filter::Graph::new();

        let aspect = video.aspect_ratio();
        let aspect_den = if aspect.denominator() > 0 {
            aspect.denominator()
        } else {
            1
        };
        let source_args = format!(
            "video_size={}x{}:pix_fmt={}:time_base={}/{}:pixel_aspect={}/{}",
            video.width(),
            video.height(),
            AVPixelFormat::from(video.format()) as i32,
            time_base.numerator(),
            time_base.denominator(),
            aspect.numerator(),
            aspect_den,
        );

        graph
            .add(
                &filter::find("buffer").ok_or_else(|| {
                    DecodeError::Io("FFmpeg 'buffer' filter not found".to_string())
                })?,
                "in",
                &source_args,
            )
            .map_err(|error| {
                DecodeError::Io(format!(
                    "Failed to create buffer source ({source_args}): {error}"
                ))
            })?;

        graph
            .add(
                &filter::find("buffersink").ok_or_else(|| {
                    DecodeError::Io("FFmpeg 'buffersink' filter not found".to_string())
                })?,
                "out",
                "",
            )
            .map_err(|error| {
                DecodeError::Io(format!("Failed to create buffer sink: {error}"))
            })?;

        let (width, height) = match (options.width, options.height) {
            (Some(width), Some(height)) => (i64::from(width), i64::from(height)),
            _ => (i64::from(video.width()), i64::from(video.height())),
        };
        let chain = format!("scale={width}:{height},format=pix_fmts=rgb24");

        graph
            .output("in", 0)
            .map_err(|error| DecodeError::Io(format!("Filter graph output error: {error}")))?
            .input("out", 0)
            .map_err(|error| DecodeError::Io(format!("Filter graph input error: {error}")))?
            .parse(&chain)
            .map_err(|error| {
                DecodeError::Io(format!("Failed to parse filter chain '{chain}': {error}"))
            })?;

        graph
            .validate()
            .map_err(|error| DecodeError::Io(format!("Failed to configure filter graph: {error}")))?;

        log::debug!("Built filter pipeline: {source_args} -> {chain}");

        Ok(Self { graph })
    }

    /// Feed a decoded frame into the graph's source.
    pub(crate) fn push(&mut self, frame: &frame::Video) -> Result<(), DecodeError> {
        self.graph
            .get("in")
            .ok_or_else(|| DecodeError::Internal("Filter 'in' not found".to_string()))?
            .source()
            .add(frame)
            .map_err(|error| {
                DecodeError::Io(format!("Failed to add frame to buffer source: {error}"))
            })
    }

    /// Pull the next converted frame from the graph's sink.
    pub(crate) fn pull(&mut self, filtered: &mut frame::Video) -> Result<(), DecodeError> {
        self.graph
            .get("out")
            .ok_or_else(|| DecodeError::Internal("Filter 'out' not found".to_string()))?
            .sink()
            .frame(filtered)
            .map_err(|error| {
                DecodeError::Io(format!("Failed to pull frame from buffer sink: {error}"))
            })
    }
}

//! Active stream state and stream activation.
//!
//! Activating a stream opens a decoder for it: best-stream selection,
//! codec context setup from the container's parameters, the thread-count
//! hint, the filter pipeline, and registration with the facade. The
//! per-stream cursor book-keeping the seek planner relies on also lives
//! here.

use std::os::raw::c_int;

use ffmpeg_next::codec::Context as CodecContext;
use ffmpeg_next::media::Type;
use ffmpeg_next::{decoder, Rational};
use ffmpeg_sys_next as ffi;

use crate::decoder::VideoDecoder;
use crate::error::DecodeError;
use crate::ffmpeg::error_string;
use crate::filter::FilterPipeline;
use crate::options::VideoStreamOptions;

/// Decode state for one active stream, owned by the facade for the
/// decoder's lifetime.
pub(crate) struct StreamState {
    pub(crate) stream_index: i32,
    pub(crate) time_base: Rational,
    // Declared before the codec context so the graph is torn down first.
    pub(crate) filter: FilterPipeline,
    pub(crate) decoder: decoder::Video,
    /// PTS of the most recently returned frame, in time-base units.
    pub(crate) current_pts: i64,
    /// Duration of the most recently returned frame.
    pub(crate) current_duration: i64,
    /// Lower bound for the next-frame predicate; set by the seek planner.
    pub(crate) discard_frames_before_pts: Option<i64>,
    pub(crate) options: VideoStreamOptions,
}

impl StreamState {
    /// Seconds → time-base ticks. Multiplies by the denominator only,
    /// mirroring the cursor convention used throughout (exact for the
    /// common `1/N` time bases).
    pub(crate) fn seconds_to_pts(&self, seconds: f64) -> i64 {
        (seconds * f64::from(self.time_base.denominator())) as i64
    }

    /// Time-base ticks → seconds. Inverse of
    /// [`seconds_to_pts`](Self::seconds_to_pts), same convention.
    pub(crate) fn pts_to_seconds(&self, pts: i64) -> f64 {
        pts as f64 / f64::from(self.time_base.denominator())
    }
}

/// Open a decoder for a video stream and register it as active.
pub(crate) fn add_video_stream_impl(
    decoder: &mut VideoDecoder<'_>,
    options: VideoStreamOptions,
) -> Result<(), DecodeError> {
    let preferred = options.stream_index.unwrap_or(-1);
    if preferred >= 0 && decoder.streams.contains_key(&preferred) {
        return Err(DecodeError::InvalidArgument(format!(
            "Stream with index {preferred} is already active."
        )));
    }

    // SAFETY: read-only query over the opened format context.
    let stream_number = unsafe {
        ffi::av_find_best_stream(
            decoder.input.as_mut_ptr(),
            ffi::AVMediaType::AVMEDIA_TYPE_VIDEO,
            preferred,
            -1,
            std::ptr::null_mut(),
            0,
        )
    };
    if stream_number < 0 {
        return Err(DecodeError::InvalidArgument(format!(
            "No valid video stream found for preferred index {preferred}: {}",
            error_string(stream_number)
        )));
    }
    if decoder.streams.contains_key(&stream_number) {
        return Err(DecodeError::InvalidArgument(format!(
            "Stream with index {stream_number} is already active."
        )));
    }

    let stream = decoder
        .input
        .stream(stream_number as usize)
        .ok_or_else(|| {
            DecodeError::Internal(format!("Best stream {stream_number} vanished from container"))
        })?;
    if stream.parameters().medium() != Type::Video {
        return Err(DecodeError::InvalidArgument(format!(
            "Stream with index {stream_number} is not a video stream."
        )));
    }
    let time_base = stream.time_base();

    let mut codec_context = CodecContext::from_parameters(stream.parameters())
        .map_err(|error| DecodeError::Io(format!("Failed to read codec parameters: {error}")))?;

    // SAFETY: thread_count has no safe setter; 0 keeps the library default.
    unsafe {
        (*codec_context.as_mut_ptr()).thread_count =
            options.thread_count.unwrap_or(0) as c_int;
    }

    let mut video = codec_context
        .decoder()
        .video()
        .map_err(|error| DecodeError::InvalidArgument(format!("Failed to open codec: {error}")))?;

    // The demuxer's time base, not the codec's default, is what frame PTS
    // values are expressed in.
    // SAFETY: plain field write on the opened context.
    unsafe {
        (*video.as_mut_ptr()).time_base = time_base.into();
    }

    update_metadata_from_codec(decoder, stream_number, &video);

    let filter = FilterPipeline::new(&video, time_base, &options)?;

    log::debug!(
        "Activated video stream {stream_number}: {}x{}, codec={}, threads={:?}",
        video.width(),
        video.height(),
        video.id().name(),
        options.thread_count,
    );

    decoder.streams.insert(
        stream_number,
        StreamState {
            stream_index: stream_number,
            time_base,
            filter,
            decoder: video,
            current_pts: 0,
            current_duration: 0,
            discard_frames_before_pts: None,
            options,
        },
    );

    Ok(())
}

/// Once the codec is opened its context carries more accurate values than
/// the container header; fold them back into the stream metadata.
fn update_metadata_from_codec(
    decoder: &mut VideoDecoder<'_>,
    stream_index: i32,
    video: &decoder::Video,
) {
    if let Some(entry) = decoder
        .container_metadata
        .streams
        .get_mut(stream_index as usize)
    {
        entry.width = Some(i64::from(video.width()));
        entry.height = Some(i64::from(video.height()));
        entry.codec_name = Some(video.id().name().to_string());
    }
}

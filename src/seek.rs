//! Seek planning.
//!
//! Given the current cursor position and a desired timestamp, decides
//! whether the demuxer actually has to seek or whether forward-decoding
//! from the current position reaches the target. Forward decode is safe
//! exactly when both positions sit under the same keyframe: frames between
//! them depend only on that keyframe, so no data before the cursor is
//! needed.
//!
//! Keyframe bracketing uses the scanned index when it exists (a binary
//! search over the sorted keyframe PTS list) and falls back to FFmpeg's
//! own stream index otherwise, which may be truncated for some files.

use std::os::raw::c_int;

use ffmpeg_next::format::stream::Stream;
use ffmpeg_sys_next as ffi;

use crate::decoder::VideoDecoder;
use crate::error::DecodeError;
use crate::ffmpeg::error_string;
use crate::scan::FrameInfo;

/// Index of the greatest keyframe with `pts <= target`, if any.
pub(crate) fn key_frame_index_for_pts(key_frames: &[FrameInfo], pts: i64) -> Option<usize> {
    let upper_bound = key_frames.partition_point(|frame| frame.pts <= pts);
    upper_bound.checked_sub(1)
}

/// Same lookup against FFmpeg's per-stream index.
fn key_frame_index_from_library(stream: &Stream<'_>, pts: i64) -> Option<usize> {
    // SAFETY: read-only search over the stream's index entries.
    let index = unsafe {
        ffi::av_index_search_timestamp(
            stream.as_ptr().cast_mut(),
            pts,
            ffi::AVSEEK_FLAG_BACKWARD as c_int,
        )
    };
    usize::try_from(index).ok()
}

/// Whether forward-decoding from `current_pts` reaches `target_pts`
/// without a demuxer seek.
///
/// Backward targets always require a seek; so does re-requesting the
/// current position, because no frame cache exists to replay it from.
pub(crate) fn can_avoid_seek<L>(
    key_frames: &[FrameInfo],
    library_lookup: L,
    current_pts: i64,
    target_pts: i64,
) -> bool
where
    L: Fn(i64) -> Option<usize>,
{
    if target_pts < current_pts {
        return false;
    }
    if target_pts == current_pts {
        return false;
    }
    let bracket = |pts| {
        if key_frames.is_empty() {
            library_lookup(pts)
        } else {
            key_frame_index_for_pts(key_frames, pts)
        }
    };
    match (bracket(current_pts), bracket(target_pts)) {
        (Some(current_key), Some(target_key)) => current_key == target_key,
        _ => false,
    }
}

/// Plan and, when necessary, perform the seek for a pending desired PTS.
///
/// Stores the per-stream discard bound for the next-frame predicate,
/// decides per active stream whether a seek can be avoided, and otherwise
/// seeks the container on the first active stream and flushes every active
/// codec.
pub(crate) fn maybe_seek_to_before_desired_pts(
    decoder: &mut VideoDecoder<'_>,
    desired_seconds: f64,
) -> Result<(), DecodeError> {
    if decoder.streams.is_empty() {
        return Ok(());
    }
    for state in decoder.streams.values_mut() {
        state.discard_frames_before_pts = Some(state.seconds_to_pts(desired_seconds));
    }

    decoder.stats.num_seeks_attempted += 1;

    let mut must_seek = false;
    for (&stream_index, state) in &decoder.streams {
        let target_pts = state.seconds_to_pts(desired_seconds);
        let key_frames = decoder
            .frame_index
            .get(&stream_index)
            .map(|index| index.key_frames.as_slice())
            .unwrap_or(&[]);
        let input = &decoder.input;
        let library_lookup = |pts| {
            input
                .stream(stream_index as usize)
                .and_then(|stream| key_frame_index_from_library(&stream, pts))
        };
        if !can_avoid_seek(key_frames, library_lookup, state.current_pts, target_pts) {
            log::debug!(
                "Seek needed for stream {stream_index}: current_pts={}, target_pts={target_pts}",
                state.current_pts,
            );
            must_seek = true;
            break;
        }
    }
    if !must_seek {
        decoder.stats.num_seeks_skipped += 1;
        return Ok(());
    }

    // Iteration is ascending by stream index, so "first active stream" is
    // reproducible between runs.
    let (first_stream_index, desired_pts) = {
        let state = decoder
            .streams
            .values()
            .next()
            .expect("at least one active stream");
        (state.stream_index, state.seconds_to_pts(desired_seconds))
    };

    // min_ts == max_ts == desired: the demuxer lands on the highest
    // keyframe at or before the target.
    // SAFETY: seek over the opened format context.
    let status = unsafe {
        ffi::avformat_seek_file(
            decoder.input.as_mut_ptr(),
            first_stream_index,
            i64::MIN,
            desired_pts,
            desired_pts,
            0,
        )
    };
    if status < 0 {
        return Err(DecodeError::Io(format!(
            "Could not seek file to pts={desired_pts}: {}",
            error_string(status)
        )));
    }

    decoder.stats.num_flushes += 1;
    for state in decoder.streams.values_mut() {
        state.decoder.flush();
    }
    Ok(())
}

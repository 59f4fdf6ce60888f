//! Full-file index scan.
//!
//! A single linear pass over every packet in the container that records,
//! per stream, the sorted list of all frame PTS values and the sorted list
//! of keyframe PTS values, along with exact frame counts and min/max PTS
//! bounds. The index is what makes frame-ordinal addressing and the seek
//! planner's keyframe bracketing cheap afterwards. The container is
//! rewound to the start once the sweep completes.

use ffmpeg_next::codec::packet::flags::Flags;
use ffmpeg_next::{Error as FfmpegError, Packet};
use ffmpeg_sys_next as ffi;

use crate::decoder::VideoDecoder;
use crate::error::DecodeError;
use crate::ffmpeg::error_string;

/// One entry in the scanned frame index, in stream time-base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct FrameInfo {
    pub(crate) pts: i64,
}

/// The scanned index for one stream. Keyframe PTS values are a subset of
/// the full frame list; both are sorted ascending after the sweep.
#[derive(Debug, Clone, Default)]
pub(crate) struct FrameIndex {
    pub(crate) all_frames: Vec<FrameInfo>,
    pub(crate) key_frames: Vec<FrameInfo>,
}

/// Sweep the whole container, updating scan-derived metadata and building
/// the per-stream frame index.
///
/// Runs once right after construction. Calling it again first clears any
/// previous scan state, so a repeat scan reproduces identical results.
pub(crate) fn scan_file_and_update_metadata_and_index(
    decoder: &mut VideoDecoder<'_>,
) -> Result<(), DecodeError> {
    for entry in &mut decoder.container_metadata.streams {
        entry.clear_scan_results();
    }
    decoder.frame_index.clear();

    let mut packet = Packet::empty();
    loop {
        match packet.read(&mut decoder.input) {
            Ok(()) => {}
            Err(FfmpegError::Eof) => break,
            Err(error) => {
                return Err(DecodeError::Io(format!(
                    "Failed to read packet during scan: {error}"
                )))
            }
        }
        if packet.flags().contains(Flags::DISCARD) {
            continue;
        }
        // Packets without a timestamp cannot be indexed.
        let Some(pts) = packet.pts() else { continue };

        let stream_index = packet.stream() as i32;
        let Some(entry) = decoder
            .container_metadata
            .streams
            .get_mut(stream_index as usize)
        else {
            continue;
        };

        entry.min_pts_from_scan =
            Some(entry.min_pts_from_scan.map_or(pts, |old| old.min(pts)));
        let end = pts + packet.duration();
        entry.max_pts_from_scan =
            Some(entry.max_pts_from_scan.map_or(end, |old| old.max(end)));
        entry.num_frames_from_scan = Some(entry.num_frames_from_scan.unwrap_or(0) + 1);

        let index = decoder.frame_index.entry(stream_index).or_default();
        index.all_frames.push(FrameInfo { pts });
        if packet.is_key() {
            index.key_frames.push(FrameInfo { pts });
        }
    }

    // Convert the PTS bounds to seconds with each stream's time base.
    let input = &decoder.input;
    for (position, entry) in decoder.container_metadata.streams.iter_mut().enumerate() {
        let Some(stream) = input.stream(position) else {
            continue;
        };
        let time_base = stream.time_base();
        if time_base.denominator() <= 0 {
            continue;
        }
        let to_seconds = f64::from(time_base.numerator()) / f64::from(time_base.denominator());
        entry.min_pts_seconds_from_scan =
            entry.min_pts_from_scan.map(|pts| pts as f64 * to_seconds);
        entry.max_pts_seconds_from_scan =
            entry.max_pts_from_scan.map(|pts| pts as f64 * to_seconds);
    }

    // SAFETY: rewinds the opened context back to the start of the file.
    let status = unsafe {
        ffi::avformat_seek_file(decoder.input.as_mut_ptr(), 0, i64::MIN, 0, 0, 0)
    };
    if status < 0 {
        return Err(DecodeError::Io(format!(
            "Could not seek file to pts=0: {}",
            error_string(status)
        )));
    }

    for index in decoder.frame_index.values_mut() {
        // Stable sorts keep the ordering reproducible across repeat scans.
        index.all_frames.sort_by_key(|frame| frame.pts);
        index.key_frames.sort_by_key(|frame| frame.pts);
    }

    log::debug!(
        "Index scan complete: {:?}",
        decoder
            .frame_index
            .iter()
            .map(|(stream, index)| (*stream, index.all_frames.len(), index.key_frames.len()))
            .collect::<Vec<_>>(),
    );

    Ok(())
}

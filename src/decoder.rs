//! Core [`VideoDecoder`] implementation.
//!
//! `VideoDecoder` is the crate's entry point. Construction opens the
//! container, populates header metadata, and runs the full-file index
//! scan; [`add_video_stream`](VideoDecoder::add_video_stream) then opens a
//! decoder for a stream, after which frames can be retrieved sequentially
//! or by timestamp or ordinal. The decoder is a single-threaded,
//! non-reentrant object: every operation takes `&mut self`.

use std::collections::BTreeMap;
use std::fmt::{self, Debug, Display, Formatter};
use std::marker::PhantomData;
use std::path::Path;

use ffmpeg_next::format::context::Input;

use crate::byte_source::{BufferIo, ByteSource, DEFAULT_SCRATCH_CAPACITY};
use crate::container;
use crate::decode;
use crate::error::DecodeError;
use crate::json;
use crate::metadata::{ContainerMetadata, MediaType};
use crate::options::VideoStreamOptions;
use crate::scan::{self, FrameIndex};
use crate::stream::{self, StreamState};
use crate::tensor::{ImageBatch, ImageTensor};

/// Counters describing the work one retrieval operation performed.
///
/// Reset at the start of every decoded-output call, so after
/// [`next_frame`](VideoDecoder::next_frame) and friends the counters
/// describe exactly that call. Exposed for performance testing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Frames successfully received from any codec.
    pub num_frames_received_by_decoder: i64,
    /// Packets pulled from the demuxer, including the EOF read.
    pub num_packets_read: i64,
    /// Packets forwarded to an active stream's codec.
    pub num_packets_sent_to_decoder: i64,
    /// Seek passes considered (whether or not a seek happened).
    pub num_seeks_attempted: i64,
    /// Seek passes resolved by forward decoding instead of seeking.
    pub num_seeks_skipped: i64,
    /// Codec flushes following an actual demuxer seek.
    pub num_flushes: i64,
}

impl Display for DecodeStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DecodeStats{{frames_received={}, packets_read={}, packets_sent={}, \
             seeks_attempted={}, seeks_skipped={}, flushes={}}}",
            self.num_frames_received_by_decoder,
            self.num_packets_read,
            self.num_packets_sent_to_decoder,
            self.num_seeks_attempted,
            self.num_seeks_skipped,
            self.num_flushes,
        )
    }
}

/// A decoded frame and where it came from.
#[derive(Debug, Clone)]
#[must_use]
pub struct DecodedOutput {
    /// Container index of the stream the frame belongs to.
    pub stream_index: i32,
    /// Media type of that stream. Always [`MediaType::Video`] today.
    pub stream_type: MediaType,
    /// Presentation timestamp in the stream's time-base units.
    pub pts: i64,
    /// Presentation timestamp in seconds.
    pub pts_seconds: f64,
    /// The decoded 8-bit RGB image.
    pub image: ImageTensor,
}

/// A video decoder over a container-format input.
///
/// The lifetime parameter ties the decoder to a caller-owned byte buffer
/// when one was used; decoders over files are `VideoDecoder<'static>`.
///
/// # Example
///
/// ```no_run
/// use frameseek::{VideoDecoder, VideoStreamOptions};
///
/// let mut decoder = VideoDecoder::from_file("input.mp4")?;
/// decoder.add_video_stream(VideoStreamOptions::new())?;
///
/// // First frame displayed at or after 5.0 seconds.
/// decoder.seek_to_pts(5.0);
/// let output = decoder.next_frame()?;
/// assert!(output.pts_seconds >= 5.0);
/// # Ok::<(), frameseek::DecodeError>(())
/// ```
pub struct VideoDecoder<'a> {
    // Field order is drop order: stream states (filter graphs, then codec
    // contexts) before the format context, which must close before the
    // AVIO context backing it.
    pub(crate) streams: BTreeMap<i32, StreamState>,
    pub(crate) frame_index: BTreeMap<i32, FrameIndex>,
    pub(crate) container_metadata: ContainerMetadata,
    pub(crate) desired_pts_seconds: Option<f64>,
    pub(crate) stats: DecodeStats,
    pub(crate) input: Input,
    // Held only so the AVIO context outlives the format context.
    #[allow(dead_code)]
    pub(crate) io: Option<BufferIo>,
    _bytes: PhantomData<&'a [u8]>,
}

impl Debug for VideoDecoder<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoDecoder")
            .field("metadata", &self.container_metadata)
            .field("active_streams", &self.streams.keys().collect::<Vec<_>>())
            .field("pending_seek_seconds", &self.desired_pts_seconds)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl VideoDecoder<'static> {
    /// Open a video file, probe its metadata, and index every frame.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidInput`] if the container cannot be opened;
    /// [`DecodeError::Io`] if the index scan fails.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DecodeError> {
        Self::from_source(ByteSource::File(path.as_ref().to_path_buf()))
    }
}

impl<'a> VideoDecoder<'a> {
    /// Open a container held in a caller-owned byte buffer.
    ///
    /// The buffer is not copied; it must stay valid for the decoder's
    /// lifetime, which the borrow checker enforces.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidInput`] if the bytes are not a decodable
    /// container.
    pub fn from_buffer(bytes: &'a [u8]) -> Result<Self, DecodeError> {
        Self::from_buffer_with_scratch_capacity(bytes, DEFAULT_SCRATCH_CAPACITY)
    }

    /// Like [`from_buffer`](Self::from_buffer) with an explicit size for
    /// the scratch buffer FFmpeg reads through.
    pub fn from_buffer_with_scratch_capacity(
        bytes: &'a [u8],
        scratch_capacity: usize,
    ) -> Result<Self, DecodeError> {
        let (input, io) = container::open_buffer(bytes, scratch_capacity)?;
        Self::finish_construction(input, Some(io))
    }

    /// Open whichever input a [`ByteSource`] describes.
    pub fn from_source(source: ByteSource<'a>) -> Result<Self, DecodeError> {
        match source {
            ByteSource::File(path) => {
                let input = container::open_file(&path)?;
                Self::finish_construction(input, None)
            }
            ByteSource::Buffer(bytes) => Self::from_buffer(bytes),
        }
    }

    fn finish_construction(input: Input, io: Option<BufferIo>) -> Result<Self, DecodeError> {
        let container_metadata = container::read_header_metadata(&input);
        let mut decoder = VideoDecoder {
            streams: BTreeMap::new(),
            frame_index: BTreeMap::new(),
            container_metadata,
            desired_pts_seconds: None,
            stats: DecodeStats::default(),
            input,
            io,
            _bytes: PhantomData,
        };
        scan::scan_file_and_update_metadata_and_index(&mut decoder)?;
        Ok(decoder)
    }

    /// Open a decoder for a video stream and register it as active.
    ///
    /// `options.stream_index` selects the container stream; unset (or
    /// `-1`) picks the library's best video stream.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidArgument`] if the stream is already active,
    /// is not a video stream, or no video stream exists.
    pub fn add_video_stream(&mut self, options: VideoStreamOptions) -> Result<(), DecodeError> {
        stream::add_video_stream_impl(self, options)
    }

    /// Place the cursor at `seconds`. No demuxer work happens until the
    /// next frame retrieval, which returns the first frame at or after
    /// this position.
    pub fn seek_to_pts(&mut self, seconds: f64) {
        self.desired_pts_seconds = Some(seconds);
    }

    /// Decode the frame at the cursor and advance past it.
    ///
    /// # Errors
    ///
    /// [`DecodeError::EndOfStream`] when the stream is exhausted;
    /// [`DecodeError::Internal`] if the converted image is not rank 3.
    pub fn next_frame(&mut self) -> Result<DecodedOutput, DecodeError> {
        let output = decode::decoded_output_with_predicate(self, |state, frame| {
            frame.pts().unwrap_or(0)
                >= state.discard_frames_before_pts.unwrap_or(i64::MIN)
        })?;
        if output.image.rank() != 3 {
            return Err(DecodeError::Internal(format!(
                "Image rank is unexpected. Expected 3, got: {}",
                output.image.rank()
            )));
        }
        Ok(output)
    }

    /// Decode the frame that is displayed at `seconds`.
    ///
    /// A frame with PTS `p` and duration `d` is displayed over the range
    /// `[p, p + d)`; the unique frame whose range contains `seconds` is
    /// returned. If that is the frame most recently returned, the cursor
    /// is rewound to its start and it is decoded again (there is no frame
    /// cache).
    pub fn frame_at_pts(&mut self, seconds: f64) -> Result<DecodedOutput, DecodeError> {
        let mut target_seconds = seconds;
        for state in self.streams.values() {
            let frame_start = state.pts_to_seconds(state.current_pts);
            let frame_end = state.pts_to_seconds(state.current_pts + state.current_duration);
            if target_seconds >= frame_start && target_seconds < frame_end {
                target_seconds = frame_start;
                break;
            }
        }
        self.seek_to_pts(target_seconds);
        decode::decoded_output_with_predicate(self, move |state, frame| {
            let pts = frame.pts().unwrap_or(0);
            let frame_start = state.pts_to_seconds(pts);
            let frame_end = state.pts_to_seconds(pts + decode::frame_duration(frame));
            target_seconds >= frame_start && target_seconds < frame_end
        })
    }

    /// Decode the frame at ordinal `frame_index` of `stream_index`, in
    /// presentation order as recorded by the index scan.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidArgument`] if either index is out of range or
    /// the stream was never added.
    pub fn frame_at_index(
        &mut self,
        stream_index: i32,
        frame_index: i64,
    ) -> Result<DecodedOutput, DecodeError> {
        let pts = self.pts_for_frame_index(stream_index, frame_index)?;
        let seconds = self.streams[&stream_index].pts_to_seconds(pts);
        self.seek_to_pts(seconds);
        self.next_frame()
    }

    /// Decode several frame ordinals of one stream into a batched tensor.
    ///
    /// Slot `k` of the result holds the frame at `frame_indices[k]`;
    /// requests are decoded in the order given, with no deduplication.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidArgument`] as for
    /// [`frame_at_index`](Self::frame_at_index).
    pub fn frames_at_indices(
        &mut self,
        stream_index: i32,
        frame_indices: &[i64],
    ) -> Result<ImageBatch, DecodeError> {
        self.validate_stream_index(stream_index)?;
        let (height, width, shape) = {
            let state = self.streams.get(&stream_index).ok_or_else(|| {
                DecodeError::InvalidArgument(format!(
                    "Stream {stream_index} is not added to the decoder"
                ))
            })?;
            let entry = &self.container_metadata.streams[stream_index as usize];
            let height = match state.options.height {
                Some(height) => height as usize,
                None => entry.height.and_then(|h| usize::try_from(h).ok()).ok_or_else(
                    || DecodeError::Internal("Stream height is unknown".to_string()),
                )?,
            };
            let width = match state.options.width {
                Some(width) => width as usize,
                None => entry.width.and_then(|w| usize::try_from(w).ok()).ok_or_else(
                    || DecodeError::Internal("Stream width is unknown".to_string()),
                )?,
            };
            (height, width, state.options.shape)
        };

        let mut batch = ImageBatch::zeroed(frame_indices.len(), height, width, shape);
        for (slot, &frame_index) in frame_indices.iter().enumerate() {
            let output = self.frame_at_index(stream_index, frame_index)?;
            batch.write_slot(slot, &output.image)?;
        }
        Ok(batch)
    }

    /// The container metadata, as populated by the header probe, the index
    /// scan, and any stream activations. Repeated calls observe the same
    /// values unless a stream is activated in between.
    pub fn container_metadata(&self) -> &ContainerMetadata {
        &self.container_metadata
    }

    /// Stats for the most recent retrieval operation.
    pub fn decode_stats(&self) -> DecodeStats {
        self.stats
    }

    /// Zero all decode stats.
    pub fn reset_decode_stats(&mut self) {
        self.stats = DecodeStats::default();
    }

    /// Indices of the streams currently activated for decoding, ascending.
    pub fn active_stream_indices(&self) -> Vec<i32> {
        self.streams.keys().copied().collect()
    }

    /// PTS values of every scanned frame of a stream, ascending.
    ///
    /// `None` if the stream index is unknown or the scan saw no packets
    /// for it.
    pub fn frame_pts(&self, stream_index: i32) -> Option<Vec<i64>> {
        self.frame_index
            .get(&stream_index)
            .map(|index| index.all_frames.iter().map(|frame| frame.pts).collect())
    }

    /// PTS values of the scanned keyframes of a stream, ascending. A
    /// subset of [`frame_pts`](Self::frame_pts).
    pub fn key_frame_pts(&self, stream_index: i32) -> Option<Vec<i64>> {
        self.frame_index
            .get(&stream_index)
            .map(|index| index.key_frames.iter().map(|frame| frame.pts).collect())
    }

    /// JSON projection of the best video stream's metadata.
    pub fn json_metadata(&self) -> String {
        json::json_metadata(&self.container_metadata)
    }

    /// JSON projection of the container-level metadata.
    pub fn container_json_metadata(&self) -> String {
        json::container_json_metadata(&self.container_metadata)
    }

    /// JSON projection of one stream's metadata.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidArgument`] if `stream_index` is out of range.
    pub fn stream_json_metadata(&self, stream_index: i32) -> Result<String, DecodeError> {
        json::stream_json_metadata(&self.container_metadata, stream_index)
    }

    fn validate_stream_index(&self, stream_index: i32) -> Result<(), DecodeError> {
        if stream_index < 0 || stream_index as usize >= self.container_metadata.streams.len() {
            return Err(DecodeError::InvalidArgument(format!(
                "Invalid stream index={stream_index}; container has {} streams",
                self.container_metadata.streams.len()
            )));
        }
        Ok(())
    }

    fn pts_for_frame_index(
        &self,
        stream_index: i32,
        frame_index: i64,
    ) -> Result<i64, DecodeError> {
        self.validate_stream_index(stream_index)?;
        if !self.streams.contains_key(&stream_index) {
            return Err(DecodeError::InvalidArgument(format!(
                "Stream {stream_index} is not added to the decoder"
            )));
        }
        let all_frames = self
            .frame_index
            .get(&stream_index)
            .map(|index| index.all_frames.as_slice())
            .unwrap_or(&[]);
        let position = usize::try_from(frame_index)
            .ok()
            .filter(|&position| position < all_frames.len())
            .ok_or_else(|| {
                DecodeError::InvalidArgument(format!(
                    "Invalid frame index={frame_index} for stream={stream_index}; \
                     stream has {} frames",
                    all_frames.len()
                ))
            })?;
        Ok(all_frames[position].pts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_stats_display_names_every_counter() {
        let stats = DecodeStats {
            num_frames_received_by_decoder: 16,
            num_packets_read: 21,
            num_packets_sent_to_decoder: 20,
            num_seeks_attempted: 1,
            num_seeks_skipped: 1,
            num_flushes: 0,
        };
        let rendered = stats.to_string();
        assert!(rendered.contains("frames_received=16"));
        assert!(rendered.contains("packets_read=21"));
        assert!(rendered.contains("seeks_skipped=1"));
        assert!(rendered.contains("flushes=0"));
    }

    #[test]
    fn decode_stats_default_is_zeroed() {
        assert_eq!(
            DecodeStats::default(),
            DecodeStats {
                num_frames_received_by_decoder: 0,
                num_packets_read: 0,
                num_packets_sent_to_decoder: 0,
                num_seeks_attempted: 0,
                num_seeks_skipped: 0,
                num_flushes: 0,
            }
        );
    }
}

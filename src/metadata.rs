//! Container and stream metadata.
//!
//! Metadata comes from two places and the types keep them apart:
//! header-derived fields are filled from a cheap read of the container
//! header when the decoder is created, while the `*_from_scan` fields are
//! only populated by the full-file index scan. Callers can therefore tell
//! whether a value cost a header read or a complete pass over the file.

use ffmpeg_next::media::Type;

/// The media type of a container stream slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// A video stream.
    Video,
    /// An audio stream.
    Audio,
    /// Anything else: subtitles, data, attachments.
    Other,
}

impl From<Type> for MediaType {
    fn from(kind: Type) -> Self {
        match kind {
            Type::Video => MediaType::Video,
            Type::Audio => MediaType::Audio,
            _ => MediaType::Other,
        }
    }
}

/// Metadata for a single container stream slot.
///
/// One instance exists per stream in the container, in container order;
/// `stream_index` always matches the position in
/// [`ContainerMetadata::streams`].
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use]
pub struct StreamMetadata {
    /// The container's index for this stream.
    pub stream_index: i32,
    /// Media type reported by the container header.
    pub media_type: Option<MediaType>,
    /// Codec name, e.g. `"h264"`. Updated from the opened codec context
    /// when the stream is activated.
    pub codec_name: Option<String>,
    /// Bit rate in bits per second, when the header reports one.
    pub bit_rate: Option<i64>,
    /// Frame count from the container header, when positive.
    pub num_frames: Option<i64>,
    /// Stream duration in seconds, when the header reports one.
    pub duration_seconds: Option<f64>,
    /// Average frames per second, when positive.
    pub average_fps: Option<f64>,
    /// Frame width in pixels; set when the stream is activated.
    pub width: Option<i64>,
    /// Frame height in pixels; set when the stream is activated.
    pub height: Option<i64>,

    /// Exact frame count observed by the index scan.
    pub num_frames_from_scan: Option<i64>,
    /// Smallest packet PTS observed by the scan, in time-base units.
    pub min_pts_from_scan: Option<i64>,
    /// Largest packet PTS + duration observed by the scan, in time-base
    /// units.
    pub max_pts_from_scan: Option<i64>,
    /// [`min_pts_from_scan`](Self::min_pts_from_scan) converted to seconds.
    pub min_pts_seconds_from_scan: Option<f64>,
    /// [`max_pts_from_scan`](Self::max_pts_from_scan) converted to seconds.
    pub max_pts_seconds_from_scan: Option<f64>,
}

impl StreamMetadata {
    /// Drop all scan-derived fields, leaving header-derived values intact.
    pub(crate) fn clear_scan_results(&mut self) {
        self.num_frames_from_scan = None;
        self.min_pts_from_scan = None;
        self.max_pts_from_scan = None;
        self.min_pts_seconds_from_scan = None;
        self.max_pts_seconds_from_scan = None;
    }
}

/// Metadata for the whole container.
///
/// Returned by
/// [`VideoDecoder::container_metadata`](crate::VideoDecoder::container_metadata).
/// Plain data; cloning it never touches the underlying file.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use]
pub struct ContainerMetadata {
    /// Per-stream metadata, in container stream order.
    pub streams: Vec<StreamMetadata>,
    /// Number of video streams in the container.
    pub num_video_streams: i32,
    /// Number of audio streams in the container.
    pub num_audio_streams: i32,
    /// Container-level duration in seconds, usually the maximum over all
    /// stream durations.
    pub duration_seconds: Option<f64>,
    /// Container-level total bit rate in bits per second.
    pub bit_rate: Option<i64>,
    /// Index of the default video stream, per the library's heuristics.
    pub best_video_stream_index: Option<i32>,
    /// Index of the default audio stream, per the library's heuristics.
    pub best_audio_stream_index: Option<i32>,
}

impl ContainerMetadata {
    /// Metadata for the library-selected best video stream, if any.
    pub fn best_video_stream(&self) -> Option<&StreamMetadata> {
        self.best_video_stream_index
            .and_then(|index| self.streams.get(index as usize))
    }
}

//! # frameseek
//!
//! Random-access and sequential RGB frame retrieval from video containers,
//! powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! A [`VideoDecoder`] opens a container (a file path or a caller-owned
//! byte buffer), scans it once to build an exact frame index, and then
//! serves decoded frames addressed by presentation timestamp in seconds
//! or by frame ordinal. Successive requests reuse the demuxer position
//! whenever forward decoding reaches the target without a seek, so
//! near-sequential access patterns stay cheap.
//!
//! ## Quick start
//!
//! ```no_run
//! use frameseek::{VideoDecoder, VideoStreamOptions};
//!
//! let mut decoder = VideoDecoder::from_file("input.mp4")?;
//! decoder.add_video_stream(VideoStreamOptions::new())?;
//!
//! // Sequential access.
//! let first = decoder.next_frame()?;
//! println!("first frame at {:.3}s", first.pts_seconds);
//!
//! // Random access by timestamp or ordinal.
//! let at_two_seconds = decoder.frame_at_pts(2.0)?;
//! let video = decoder.container_metadata().best_video_stream_index.unwrap();
//! let tenth = decoder.frame_at_index(video, 10)?;
//! # let _ = (at_two_seconds, tenth);
//! # Ok::<(), frameseek::DecodeError>(())
//! ```
//!
//! ## Decoding from memory
//!
//! ```no_run
//! use frameseek::{FrameShape, VideoDecoder, VideoStreamOptions};
//!
//! let bytes = std::fs::read("input.mp4")?;
//! let mut decoder = VideoDecoder::from_buffer(&bytes)?;
//! decoder.add_video_stream(
//!     VideoStreamOptions::new()
//!         .with_dimensions(320, 240)
//!         .with_shape(FrameShape::Chw),
//! )?;
//! let batch = decoder.frames_at_indices(0, &[0, 5, 10])?;
//! assert_eq!(batch.shape(), &[3, 3, 240, 320]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Features
//!
//! - **Frame index from a full-file scan** — exact frame counts and
//!   PTS bounds per stream, O(log n) ordinal→PTS and PTS→keyframe lookups
//! - **Seek avoidance** — forward decoding is preferred over demuxer
//!   seeks whenever the cursor and target share a keyframe
//! - **Scale and colour conversion** — frames come out as 8-bit RGB at
//!   the requested resolution, in interleaved (HWC) or planar (CHW) layout
//! - **Batched retrieval** — many ordinals decoded into one rank-4 tensor
//! - **Decode statistics** — packet/frame/seek counters per operation
//! - **Metadata** — header-derived and scan-derived values, as structs or
//!   stable JSON projections
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on the system; see the
//! `ffmpeg-next` documentation for platform specifics.

pub mod byte_source;
mod container;
mod convert;
mod decode;
pub mod decoder;
pub mod error;
mod ffmpeg;
mod filter;
mod json;
pub mod metadata;
pub mod options;
mod scan;
mod seek;
mod stream;
pub mod tensor;

pub use byte_source::{ByteSource, DEFAULT_SCRATCH_CAPACITY};
pub use decoder::{DecodeStats, DecodedOutput, VideoDecoder};
pub use error::DecodeError;
pub use ffmpeg::{set_ffmpeg_log_level, FfmpegLogLevel};
pub use metadata::{ContainerMetadata, MediaType, StreamMetadata};
pub use options::{FrameShape, VideoStreamOptions};
pub use tensor::{ImageBatch, ImageTensor};

//! Error types for the `frameseek` crate.
//!
//! This module defines [`DecodeError`], the unified error type returned by
//! all fallible operations in the crate. Each variant corresponds to one
//! failure class, so callers can match on the kind without parsing messages.

use thiserror::Error;

/// The unified error type for all `frameseek` operations.
///
/// Every public method that can fail returns `Result<T, DecodeError>`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// The container could not be opened or its bytes are not decodable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A caller-supplied argument is out of range or otherwise malformed:
    /// unknown option keys, bad option values, non-video stream selection,
    /// out-of-range frame indices, inactive or re-added streams.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A library-level packet read, seek, send, flush, or filter-graph
    /// operation failed.
    #[error("FFmpeg I/O error: {0}")]
    Io(String),

    /// The decoder was drained and has no more frames to deliver.
    #[error("End of stream reached")]
    EndOfStream,

    /// An internal invariant was violated, e.g. an unexpected pixel format
    /// came out of the conversion graph.
    #[error("Internal error: {0}")]
    Internal(String),

    /// The operation is recognised but not implemented, e.g. decoding an
    /// audio frame.
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl From<ffmpeg_next::Error> for DecodeError {
    fn from(error: ffmpeg_next::Error) -> Self {
        match error {
            ffmpeg_next::Error::Eof => DecodeError::EndOfStream,
            other => DecodeError::Io(other.to_string()),
        }
    }
}

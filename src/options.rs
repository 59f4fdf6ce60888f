//! Stream activation options.
//!
//! [`VideoStreamOptions`] configures a stream when it is added to the
//! decoder: output dimensions, the codec thread-count hint, the tensor
//! layout, and the preferred container stream. Options can be built with
//! the `with_*` methods or parsed from the compact `key=value,…` string
//! form used by host bindings.

use std::str::FromStr;

use crate::error::DecodeError;

/// Memory layout of a decoded image tensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FrameShape {
    /// Height × width × channel (interleaved rows). The default.
    #[default]
    Hwc,
    /// Channel × height × width (planar).
    Chw,
}

impl FrameShape {
    /// Shape of a single frame with the given dimensions, in this layout.
    pub(crate) fn frame_dims(self, height: usize, width: usize) -> [usize; 3] {
        match self {
            FrameShape::Hwc => [height, width, 3],
            FrameShape::Chw => [3, height, width],
        }
    }
}

impl FromStr for FrameShape {
    type Err = DecodeError;

    /// Both the plain and batched spellings are accepted; the batch axis
    /// is implied for single-frame outputs.
    fn from_str(value: &str) -> Result<Self, DecodeError> {
        match value {
            "HWC" | "NHWC" => Ok(FrameShape::Hwc),
            "CHW" | "NCHW" => Ok(FrameShape::Chw),
            other => Err(DecodeError::InvalidArgument(format!(
                "Invalid shape={other}. shape must be either HWC or CHW."
            ))),
        }
    }
}

/// Configuration recognised when a video stream is activated.
///
/// # Example
///
/// ```
/// use frameseek::{FrameShape, VideoStreamOptions};
///
/// let options = VideoStreamOptions::new()
///     .with_dimensions(320, 240)
///     .with_shape(FrameShape::Chw)
///     .with_thread_count(4);
/// assert_eq!(options.width, Some(320));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct VideoStreamOptions {
    /// Target output width. When either dimension is unset, both default
    /// to the codec's native dimensions.
    pub width: Option<u32>,
    /// Target output height.
    pub height: Option<u32>,
    /// Thread-count hint passed to the codec. `0` lets the library pick;
    /// unset keeps the codec's default behaviour.
    pub thread_count: Option<usize>,
    /// Layout of the output image tensor.
    pub shape: FrameShape,
    /// Preferred container stream index. Unset (or `-1`) selects the
    /// library's best video stream.
    pub stream_index: Option<i32>,
}

impl VideoStreamOptions {
    /// Create options with all defaults: native dimensions, codec-default
    /// threading, HWC layout, best video stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both output dimensions. Frames are rescaled to exactly this
    /// size.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Set the codec thread-count hint. `0` means "library default".
    pub fn with_thread_count(mut self, threads: usize) -> Self {
        self.thread_count = Some(threads);
        self
    }

    /// Set the output tensor layout.
    pub fn with_shape(mut self, shape: FrameShape) -> Self {
        self.shape = shape;
        self
    }

    /// Prefer a specific container stream index. `-1` selects the
    /// library's best video stream.
    pub fn with_stream_index(mut self, stream_index: i32) -> Self {
        self.stream_index = Some(stream_index);
        self
    }

    /// Parse the compact string form: comma-separated `key=value` pairs.
    ///
    /// Recognised keys are `ffmpeg_thread_count` (a non-negative integer),
    /// `shape` (`HWC` or `CHW`), `width` and `height`. An empty string
    /// yields the defaults.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidArgument`] on malformed pairs, unknown keys,
    /// or invalid values.
    ///
    /// # Example
    ///
    /// ```
    /// use frameseek::VideoStreamOptions;
    ///
    /// let options = VideoStreamOptions::parse("width=640,height=480,shape=CHW").unwrap();
    /// assert_eq!(options.height, Some(480));
    /// assert!(VideoStreamOptions::parse("zoom=2").is_err());
    /// ```
    pub fn parse(options_string: &str) -> Result<Self, DecodeError> {
        let mut options = Self::default();
        if options_string.is_empty() {
            return Ok(options);
        }

        for token in options_string.split(',') {
            let (key, value) = token.split_once('=').ok_or_else(|| {
                DecodeError::InvalidArgument(format!(
                    "Invalid option: {token}. Options must be in the form 'option=value'."
                ))
            })?;
            match key {
                "ffmpeg_thread_count" => {
                    let count: i64 = value.parse().map_err(|_| {
                        DecodeError::InvalidArgument(format!(
                            "Invalid ffmpeg_thread_count={value}. ffmpeg_thread_count must be an integer."
                        ))
                    })?;
                    if count < 0 {
                        return Err(DecodeError::InvalidArgument(format!(
                            "Invalid ffmpeg_thread_count={value}. ffmpeg_thread_count must be >= 0."
                        )));
                    }
                    options.thread_count = Some(count as usize);
                }
                "shape" => {
                    options.shape = value.parse()?;
                }
                "width" => {
                    options.width = Some(parse_dimension("width", value)?);
                }
                "height" => {
                    options.height = Some(parse_dimension("height", value)?);
                }
                other => {
                    return Err(DecodeError::InvalidArgument(format!(
                        "Invalid option: {other}. Valid options are: \
                         ffmpeg_thread_count=<int>,shape=<string>,width=<int>,height=<int>"
                    )));
                }
            }
        }
        Ok(options)
    }
}

impl FromStr for VideoStreamOptions {
    type Err = DecodeError;

    fn from_str(value: &str) -> Result<Self, DecodeError> {
        Self::parse(value)
    }
}

fn parse_dimension(key: &str, value: &str) -> Result<u32, DecodeError> {
    value.parse().map_err(|_| {
        DecodeError::InvalidArgument(format!(
            "Invalid {key}={value}. {key} must be a positive integer."
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_default() {
        let options = VideoStreamOptions::parse("").unwrap();
        assert_eq!(options, VideoStreamOptions::default());
        assert_eq!(options.shape, FrameShape::Hwc);
    }

    #[test]
    fn parses_all_keys() {
        let options =
            VideoStreamOptions::parse("ffmpeg_thread_count=8,shape=NCHW,width=320,height=240")
                .unwrap();
        assert_eq!(options.thread_count, Some(8));
        assert_eq!(options.shape, FrameShape::Chw);
        assert_eq!(options.width, Some(320));
        assert_eq!(options.height, Some(240));
    }

    #[test]
    fn both_shape_spellings_are_accepted() {
        for value in ["HWC", "NHWC"] {
            assert_eq!(value.parse::<FrameShape>().unwrap(), FrameShape::Hwc);
        }
        for value in ["CHW", "NCHW"] {
            assert_eq!(value.parse::<FrameShape>().unwrap(), FrameShape::Chw);
        }
    }

    #[test]
    fn negative_thread_count_is_rejected() {
        let error = VideoStreamOptions::parse("ffmpeg_thread_count=-1").unwrap_err();
        assert!(matches!(error, DecodeError::InvalidArgument(_)));
        assert!(error.to_string().contains("ffmpeg_thread_count"));
    }

    #[test]
    fn unknown_shape_is_rejected() {
        let error = VideoStreamOptions::parse("shape=BGR").unwrap_err();
        assert!(matches!(error, DecodeError::InvalidArgument(_)));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let error = VideoStreamOptions::parse("zoom=2").unwrap_err();
        assert!(matches!(error, DecodeError::InvalidArgument(_)));
        assert!(error.to_string().contains("zoom"));
    }

    #[test]
    fn bare_token_is_rejected() {
        let error = VideoStreamOptions::parse("shape").unwrap_err();
        assert!(error.to_string().contains("option=value"));
    }

    #[test]
    fn frame_dims_follow_layout() {
        assert_eq!(FrameShape::Hwc.frame_dims(24, 32), [24, 32, 3]);
        assert_eq!(FrameShape::Chw.frame_dims(24, 32), [3, 24, 32]);
    }
}

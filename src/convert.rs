//! Frame materialisation.
//!
//! Takes the frame the pump accepted, pushes it through the stream's
//! filter pipeline, and materialises the RGB24 output as a tightly-packed
//! [`ImageTensor`] in the layout the stream was activated with.

use ffmpeg_next::format::Pixel;
use ffmpeg_next::frame;

use crate::decoder::{DecodedOutput, VideoDecoder};
use crate::error::DecodeError;
use crate::metadata::MediaType;
use crate::stream::StreamState;
use crate::tensor::{pack_rgb_rows, ImageTensor};

/// Convert an accepted frame into the caller-facing [`DecodedOutput`].
pub(crate) fn decoded_output(
    decoder: &mut VideoDecoder<'_>,
    stream_index: i32,
    frame: &frame::Video,
) -> Result<DecodedOutput, DecodeError> {
    let stream_type = decoder
        .container_metadata
        .streams
        .get(stream_index as usize)
        .and_then(|entry| entry.media_type)
        .unwrap_or(MediaType::Other);
    if stream_type != MediaType::Video {
        return Err(DecodeError::Unsupported(
            "Audio frame decoding is not implemented".to_string(),
        ));
    }

    let state = decoder
        .streams
        .get_mut(&stream_index)
        .ok_or_else(|| {
            DecodeError::Internal(format!("Stream {stream_index} accepted a frame but is not active"))
        })?;

    let pts = frame.pts().unwrap_or(0);
    let pts_seconds = state.pts_to_seconds(pts);
    let image = convert_frame_with_filter(state, frame)?;

    Ok(DecodedOutput {
        stream_index,
        stream_type,
        pts,
        pts_seconds,
        image,
    })
}

/// Run one frame through the stream's scale/format graph and pack the
/// result.
fn convert_frame_with_filter(
    state: &mut StreamState,
    frame: &frame::Video,
) -> Result<ImageTensor, DecodeError> {
    state.filter.push(frame)?;

    let mut filtered = frame::Video::empty();
    state.filter.pull(&mut filtered)?;

    if filtered.format() != Pixel::RGB24 {
        return Err(DecodeError::Internal(format!(
            "Unexpected pixel format after filter graph: {:?}",
            filtered.format()
        )));
    }

    let height = filtered.height() as usize;
    let width = filtered.width() as usize;
    let packed = pack_rgb_rows(filtered.data(0), filtered.stride(0), height, width);
    ImageTensor::from_packed_rgb(height, width, state.options.shape, packed)
}

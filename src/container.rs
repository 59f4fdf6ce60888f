//! Container opening and header-derived metadata.
//!
//! Opens an FFmpeg input context from a [`ByteSource`](crate::ByteSource)
//! variant and populates the header half of [`ContainerMetadata`]: codec
//! names, bit rates, header frame counts, durations, frame rates, stream
//! counts, and the library's best-stream choices. Scan-derived fields are
//! left empty for the index scanner.

use std::path::Path;
use std::ptr;

use ffmpeg_next::format::context::Input;
use ffmpeg_next::media::Type;
use ffmpeg_sys_next as ffi;

use crate::byte_source::BufferIo;
use crate::error::DecodeError;
use crate::ffmpeg::error_string;
use crate::metadata::{ContainerMetadata, MediaType, StreamMetadata};

/// Open a container from a file path.
///
/// The returned context has already been probed with `find_stream_info`.
pub(crate) fn open_file(path: &Path) -> Result<Input, DecodeError> {
    crate::ffmpeg::init_ffmpeg();
    ffmpeg_next::format::input(&path).map_err(|error| {
        DecodeError::InvalidInput(format!(
            "Could not open input file {}: {error}",
            path.display()
        ))
    })
}

/// Open a container from a caller-owned byte buffer.
///
/// The returned [`BufferIo`] must outlive the [`Input`]; the decoder keeps
/// both and drops the format context first.
pub(crate) fn open_buffer(
    bytes: &[u8],
    scratch_capacity: usize,
) -> Result<(Input, BufferIo), DecodeError> {
    crate::ffmpeg::init_ffmpeg();
    let io = BufferIo::new(bytes, scratch_capacity)?;

    // SAFETY: the context is constructed and handed to avformat_open_input,
    // which owns (and on failure frees) it. After probing succeeds the
    // pointer is wrapped in an Input, whose Drop closes it. FFmpeg never
    // frees a caller-supplied pb, so BufferIo keeps sole ownership of the
    // AVIO context.
    unsafe {
        let mut context = ffi::avformat_alloc_context();
        if context.is_null() {
            return Err(DecodeError::Io(
                "Unable to allocate format context".to_string(),
            ));
        }
        (*context).pb = io.as_mut_ptr();

        let status =
            ffi::avformat_open_input(&mut context, ptr::null(), ptr::null(), ptr::null_mut());
        if status != 0 {
            return Err(DecodeError::InvalidInput(format!(
                "Failed to open input buffer: {}",
                error_string(status)
            )));
        }

        let status = ffi::avformat_find_stream_info(context, ptr::null_mut());
        if status < 0 {
            ffi::avformat_close_input(&mut context);
            return Err(DecodeError::InvalidInput(format!(
                "Failed to find stream info: {}",
                error_string(status)
            )));
        }

        Ok((Input::wrap(context), io))
    }
}

/// Populate container- and stream-level metadata from the probed header.
pub(crate) fn read_header_metadata(input: &Input) -> ContainerMetadata {
    let mut metadata = ContainerMetadata::default();

    for (index, stream) in input.streams().enumerate() {
        let parameters = stream.parameters();
        let medium = parameters.medium();

        let mut entry = StreamMetadata {
            stream_index: index as i32,
            media_type: Some(MediaType::from(medium)),
            codec_name: Some(parameters.id().name().to_string()),
            ..StreamMetadata::default()
        };

        // SAFETY: AVCodecParameters::bit_rate has no safe accessor.
        entry.bit_rate = Some(unsafe { (*parameters.as_ptr()).bit_rate });

        let header_frames = stream.frames();
        if header_frames > 0 {
            entry.num_frames = Some(header_frames);
        }

        let time_base = stream.time_base();
        if stream.duration() > 0 && time_base.denominator() > 0 {
            entry.duration_seconds = Some(
                stream.duration() as f64 * f64::from(time_base.numerator())
                    / f64::from(time_base.denominator()),
            );
        }

        let frame_rate = stream.rate();
        if frame_rate.denominator() > 0 {
            let fps =
                f64::from(frame_rate.numerator()) / f64::from(frame_rate.denominator());
            if fps > 0.0 {
                entry.average_fps = Some(fps);
            }
        }

        match medium {
            Type::Video => metadata.num_video_streams += 1,
            Type::Audio => metadata.num_audio_streams += 1,
            _ => {}
        }
        metadata.streams.push(entry);
    }

    if input.duration() > 0 {
        metadata.duration_seconds =
            Some(input.duration() as f64 / f64::from(ffi::AV_TIME_BASE));
    }
    if input.bit_rate() > 0 {
        metadata.bit_rate = Some(input.bit_rate());
    }

    metadata.best_video_stream_index = input
        .streams()
        .best(Type::Video)
        .map(|stream| stream.index() as i32);
    metadata.best_audio_stream_index = input
        .streams()
        .best(Type::Audio)
        .map(|stream| stream.index() as i32);

    log::debug!(
        "Opened container: {} stream(s), {} video, {} audio, duration={:?}s",
        metadata.streams.len(),
        metadata.num_video_streams,
        metadata.num_audio_streams,
        metadata.duration_seconds,
    );

    metadata
}

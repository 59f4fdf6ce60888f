//! The decode pump.
//!
//! Drives the send-packet / receive-frame loop shared by every frame
//! retrieval operation. Decoders are polled non-blocking in ascending
//! stream order; a caller-supplied predicate decides which received frame
//! is the one the operation wants. At end of file every active codec is
//! drained with an EOF send, after which polling continues until the
//! codecs run dry.

use ffmpeg_next::error::EAGAIN;
use ffmpeg_next::{frame, Error as FfmpegError, Packet};

use crate::convert;
use crate::decoder::{DecodeStats, DecodedOutput, VideoDecoder};
use crate::error::DecodeError;
use crate::seek;
use crate::stream::StreamState;

/// Duration of a decoded frame in its stream's time base.
pub(crate) fn frame_duration(frame: &frame::Video) -> i64 {
    // SAFETY: plain field read; set by the decoder from the packet.
    unsafe { (*frame.as_ptr()).duration }
}

/// Pump the demuxer and decoders until `accept` takes a frame, then hand
/// it to the converter.
///
/// Stats are reset on entry, so after any retrieval operation they
/// describe exactly that operation. A pending seek target is honoured
/// before the first packet is pulled.
pub(crate) fn decoded_output_with_predicate<F>(
    decoder: &mut VideoDecoder<'_>,
    mut accept: F,
) -> Result<DecodedOutput, DecodeError>
where
    F: FnMut(&StreamState, &frame::Video) -> bool,
{
    if decoder.streams.is_empty() {
        return Err(DecodeError::InvalidArgument(
            "No active streams configured".to_string(),
        ));
    }
    decoder.stats = DecodeStats::default();

    if let Some(desired_seconds) = decoder.desired_pts_seconds.take() {
        seek::maybe_seek_to_before_desired_pts(decoder, desired_seconds)?;
    }

    let mut frame = frame::Video::empty();
    let mut reached_eof = false;

    let winning_stream = loop {
        // Poll every active decoder; the first that has a frame wins.
        let mut received = None;
        for (&stream_index, state) in decoder.streams.iter_mut() {
            match state.decoder.receive_frame(&mut frame) {
                Ok(()) => {
                    received = Some(stream_index);
                    break;
                }
                Err(FfmpegError::Other { errno }) if errno == EAGAIN => continue,
                // Eof maps to EndOfStream; everything else is an I/O error.
                Err(error) => return Err(error.into()),
            }
        }

        if let Some(stream_index) = received {
            decoder.stats.num_frames_received_by_decoder += 1;
            if accept(&decoder.streams[&stream_index], &frame) {
                break stream_index;
            }
            // Rejected: the codec may still hold queued frames, so poll
            // again before pulling another packet.
            continue;
        }

        if reached_eof {
            // No more packets to send; keep pulling from the codecs'
            // internal buffers until they report EOF themselves.
            continue;
        }

        let mut packet = Packet::empty();
        let read_result = packet.read(&mut decoder.input);
        decoder.stats.num_packets_read += 1;
        match read_result {
            Ok(()) => {}
            Err(FfmpegError::Eof) => {
                for state in decoder.streams.values_mut() {
                    state.decoder.send_eof().map_err(|error| {
                        DecodeError::Io(format!("Could not flush decoder: {error}"))
                    })?;
                }
                reached_eof = true;
                continue;
            }
            Err(error) => {
                return Err(DecodeError::Io(format!(
                    "Could not read frame from input: {error}"
                )))
            }
        }

        let packet_stream = packet.stream() as i32;
        if let Some(state) = decoder.streams.get_mut(&packet_stream) {
            state.decoder.send_packet(&packet).map_err(|error| {
                DecodeError::Io(format!("Could not push packet to decoder: {error}"))
            })?;
            decoder.stats.num_packets_sent_to_decoder += 1;
        }
        // Packets for inactive streams are dropped on the floor.
    };

    let pts = frame.pts().unwrap_or(0);
    let duration = frame_duration(&frame);
    {
        let state = decoder
            .streams
            .get_mut(&winning_stream)
            .expect("winning stream is active");
        state.current_pts = pts;
        state.current_duration = duration;
    }

    log::trace!(
        "Accepted frame: stream={winning_stream}, pts={pts}, duration={duration}, {}",
        decoder.stats,
    );

    convert::decoded_output(decoder, winning_stream, &frame)
}

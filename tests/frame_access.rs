//! Frame retrieval integration tests.
//!
//! All tests are skipped when the fixture is absent. The fixture is a
//! synthetic 3-second clip: 30 frames at 10 fps, 320x240, keyframes at
//! frame indices 0, 10 and 20 (see `tests/metadata.rs` for the ffmpeg
//! invocation that generates it). Frame `i` is displayed over
//! `[i/10, (i+1)/10)` seconds.

use std::path::Path;

use frameseek::{
    DecodeError, FrameShape, VideoDecoder, VideoStreamOptions,
};

const FIXTURE: &str = "tests/fixtures/sample_30f_10fps.mp4";

fn open_with_stream() -> Option<(VideoDecoder<'static>, i32)> {
    if !Path::new(FIXTURE).exists() {
        return None;
    }
    let mut decoder = VideoDecoder::from_file(FIXTURE).expect("failed to open fixture");
    decoder
        .add_video_stream(VideoStreamOptions::new())
        .expect("failed to add video stream");
    let video_index = decoder
        .container_metadata()
        .best_video_stream_index
        .expect("fixture has a video stream");
    Some((decoder, video_index))
}

/// Ordinal of a decoded frame, recovered through the scanned index.
fn ordinal_of(decoder: &VideoDecoder<'_>, stream: i32, pts: i64) -> usize {
    decoder
        .frame_pts(stream)
        .expect("scanned stream")
        .iter()
        .position(|&candidate| candidate == pts)
        .expect("returned pts is in the scanned index")
}

#[test]
fn seek_then_next_lands_on_the_displayed_frame() {
    let Some((mut decoder, video)) = open_with_stream() else { return };

    decoder.seek_to_pts(1.55);
    let output = decoder.next_frame().expect("frame at 1.55s");
    assert_eq!(ordinal_of(&decoder, video, output.pts), 15);
    assert!((output.pts_seconds - 1.5).abs() < 1e-6);

    let stats = decoder.decode_stats();
    assert_eq!(stats.num_seeks_attempted, 1);
    assert_eq!(stats.num_flushes, 1);
    assert_eq!(stats.num_seeks_skipped, 0);
}

#[test]
fn forward_seek_within_one_keyframe_is_skipped() {
    let Some((mut decoder, video)) = open_with_stream() else { return };

    decoder.seek_to_pts(1.55);
    decoder.next_frame().expect("frame at 1.55s");

    // 1.65s is still under the keyframe at index 10; the planner decodes
    // forward instead of seeking.
    decoder.seek_to_pts(1.65);
    let output = decoder.next_frame().expect("frame at 1.65s");
    assert_eq!(ordinal_of(&decoder, video, output.pts), 16);

    let stats = decoder.decode_stats();
    assert_eq!(stats.num_seeks_attempted, 1);
    assert_eq!(stats.num_seeks_skipped, 1);
    assert_eq!(stats.num_flushes, 0);
}

#[test]
fn plain_next_frames_are_sequential_and_monotonic() {
    let Some((mut decoder, _video)) = open_with_stream() else { return };

    let mut last_pts = i64::MIN;
    for _ in 0..5 {
        let output = decoder.next_frame().expect("sequential frame");
        assert!(output.pts >= last_pts);
        last_pts = output.pts;
    }
}

#[test]
fn index_access_seeks_only_across_keyframes() {
    let Some((mut decoder, video)) = open_with_stream() else { return };

    // Index 7 is forward of the initial cursor and under keyframe 0.
    let output = decoder.frame_at_index(video, 7).expect("frame 7");
    assert_eq!(ordinal_of(&decoder, video, output.pts), 7);
    let stats = decoder.decode_stats();
    assert_eq!(stats.num_seeks_attempted, 1);
    assert_eq!(stats.num_seeks_skipped, 1);
    assert_eq!(stats.num_flushes, 0);

    // Index 12 sits under the keyframe at index 10: a real seek.
    let output = decoder.frame_at_index(video, 12).expect("frame 12");
    assert_eq!(ordinal_of(&decoder, video, output.pts), 12);
    let stats = decoder.decode_stats();
    assert_eq!(stats.num_seeks_attempted, 1);
    assert_eq!(stats.num_seeks_skipped, 0);
    assert_eq!(stats.num_flushes, 1);
}

#[test]
fn index_and_pts_round_trip() {
    let Some((mut decoder, video)) = open_with_stream() else { return };
    let all_pts = decoder.frame_pts(video).expect("scanned stream");

    for index in [0usize, 7, 15, 29] {
        let output = decoder
            .frame_at_index(video, index as i64)
            .expect("indexed frame");
        assert_eq!(output.pts, all_pts[index]);
    }
}

#[test]
fn frame_at_pts_selects_the_covering_frame() {
    let Some((mut decoder, video)) = open_with_stream() else { return };

    let output = decoder.frame_at_pts(1.55).expect("frame covering 1.55s");
    assert_eq!(ordinal_of(&decoder, video, output.pts), 15);

    // The same timestamp again: the frame is not cached, so the decoder
    // rewinds to the frame start and reproduces it.
    let again = decoder.frame_at_pts(1.55).expect("same frame again");
    assert_eq!(again.pts, output.pts);
    assert_eq!(again.image.data(), output.image.data());

    // An exact frame boundary belongs to the frame that starts there.
    let boundary = decoder.frame_at_pts(2.0).expect("frame at 2.0s");
    assert_eq!(ordinal_of(&decoder, video, boundary.pts), 20);
}

#[test]
fn requested_dimensions_and_layout_shape_the_output() {
    if !Path::new(FIXTURE).exists() {
        return;
    }

    let mut decoder = VideoDecoder::from_file(FIXTURE).unwrap();
    decoder
        .add_video_stream(
            VideoStreamOptions::parse("shape=NHWC,width=32,height=24").unwrap(),
        )
        .unwrap();
    let video = decoder
        .container_metadata()
        .best_video_stream_index
        .unwrap();
    let output = decoder.frame_at_index(video, 0).unwrap();
    assert_eq!(output.image.shape(), &[24, 32, 3]);
    let rgb_image = output.image.to_rgb_image().expect("valid image");
    assert_eq!((rgb_image.width(), rgb_image.height()), (32, 24));

    let mut decoder = VideoDecoder::from_file(FIXTURE).unwrap();
    decoder
        .add_video_stream(
            VideoStreamOptions::parse("shape=NCHW,width=32,height=24").unwrap(),
        )
        .unwrap();
    let output = decoder.frame_at_index(video, 0).unwrap();
    assert_eq!(output.image.shape(), &[3, 24, 32]);
    assert_eq!(output.image.layout(), FrameShape::Chw);
}

#[test]
fn batched_retrieval_equals_sequential_retrieval() {
    let Some((mut decoder, video)) = open_with_stream() else { return };

    // Out of order and with a repeat: slots follow the request order.
    let requested = [0i64, 15, 7, 15];
    let batch = decoder
        .frames_at_indices(video, &requested)
        .expect("batched frames");
    assert_eq!(batch.len(), requested.len());

    for (slot, &index) in requested.iter().enumerate() {
        let single = decoder.frame_at_index(video, index).expect("single frame");
        let batched = batch.frame(slot).expect("batch slot");
        assert_eq!(batched.data(), single.image.data(), "slot {slot}");
    }
}

#[test]
fn seeking_past_the_end_drains_to_end_of_stream() {
    let Some((mut decoder, _video)) = open_with_stream() else { return };

    decoder.seek_to_pts(10.0);
    let error = decoder.next_frame().unwrap_err();
    assert!(
        matches!(error, DecodeError::EndOfStream),
        "expected EndOfStream, got {error:?}",
    );
}

#[test]
fn retrieval_without_an_active_stream_is_rejected() {
    if !Path::new(FIXTURE).exists() {
        return;
    }
    let mut decoder = VideoDecoder::from_file(FIXTURE).unwrap();
    let error = decoder.next_frame().unwrap_err();
    assert!(matches!(error, DecodeError::InvalidArgument(_)));
}

#[test]
fn out_of_range_indices_are_rejected() {
    let Some((mut decoder, video)) = open_with_stream() else { return };

    assert!(matches!(
        decoder.frame_at_index(video, 30),
        Err(DecodeError::InvalidArgument(_))
    ));
    assert!(matches!(
        decoder.frame_at_index(video, -1),
        Err(DecodeError::InvalidArgument(_))
    ));
    assert!(matches!(
        decoder.frame_at_index(99, 0),
        Err(DecodeError::InvalidArgument(_))
    ));
    assert!(matches!(
        decoder.frames_at_indices(video, &[0, 99]),
        Err(DecodeError::InvalidArgument(_))
    ));
}

#[test]
fn re_adding_an_active_stream_is_rejected() {
    let Some((mut decoder, video)) = open_with_stream() else { return };

    let error = decoder
        .add_video_stream(VideoStreamOptions::new())
        .unwrap_err();
    assert!(matches!(error, DecodeError::InvalidArgument(_)));

    let error = decoder
        .add_video_stream(VideoStreamOptions::new().with_stream_index(video))
        .unwrap_err();
    assert!(matches!(error, DecodeError::InvalidArgument(_)));
}

#[test]
fn decoding_from_a_buffer_matches_decoding_from_the_file() {
    if !Path::new(FIXTURE).exists() {
        return;
    }
    let mut from_file = VideoDecoder::from_file(FIXTURE).unwrap();
    from_file
        .add_video_stream(VideoStreamOptions::new())
        .unwrap();
    let video = from_file
        .container_metadata()
        .best_video_stream_index
        .unwrap();

    let bytes = std::fs::read(FIXTURE).unwrap();
    let mut from_buffer = VideoDecoder::from_buffer(&bytes).unwrap();
    from_buffer
        .add_video_stream(VideoStreamOptions::new())
        .unwrap();

    let file_frame = from_file.frame_at_index(video, 15).unwrap();
    let buffer_frame = from_buffer.frame_at_index(video, 15).unwrap();
    assert_eq!(file_frame.pts, buffer_frame.pts);
    assert_eq!(file_frame.image.data(), buffer_frame.image.data());
}

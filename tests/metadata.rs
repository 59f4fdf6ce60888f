//! Metadata and construction integration tests.
//!
//! Fixture-based tests are skipped when the fixture is absent. The
//! reference fixture is a synthetic 3-second clip: 30 frames at 10 fps
//! with keyframes at indices 0, 10 and 20, generated with
//!
//! ```text
//! ffmpeg -f lavfi -i testsrc=duration=3:size=320x240:rate=10 \
//!   -g 10 -keyint_min 10 -sc_threshold 0 -c:v libx264 \
//!   -video_track_timescale 10 tests/fixtures/sample_30f_10fps.mp4
//! ```
//!
//! The track timescale matches the frame rate, so frame `i` has PTS `i`
//! in a `1/10` time base and is displayed over `[i/10, (i+1)/10)` seconds.

use std::path::Path;

use frameseek::{DecodeError, VideoDecoder, VideoStreamOptions};

const FIXTURE: &str = "tests/fixtures/sample_30f_10fps.mp4";

fn open_fixture() -> Option<VideoDecoder<'static>> {
    if !Path::new(FIXTURE).exists() {
        return None;
    }
    Some(VideoDecoder::from_file(FIXTURE).expect("failed to open fixture"))
}

#[test]
fn open_nonexistent_file() {
    let error = VideoDecoder::from_file("this_file_does_not_exist.mp4").unwrap_err();
    assert!(
        matches!(error, DecodeError::InvalidInput(_)),
        "expected InvalidInput, got {error:?}",
    );
}

#[test]
fn open_garbage_file() {
    let temporary_directory = tempfile::tempdir().expect("failed to create temp dir");
    let path = temporary_directory.path().join("garbage.mp4");
    std::fs::write(&path, b"this is not a media file").expect("failed to write file");

    let result = VideoDecoder::from_file(&path);
    assert!(result.is_err(), "expected error for garbage file");
}

#[test]
fn open_garbage_buffer() {
    let bytes = vec![0u8; 4096];
    let error = VideoDecoder::from_buffer(&bytes).unwrap_err();
    assert!(matches!(error, DecodeError::InvalidInput(_)));
}

#[test]
fn scan_results_match_the_fixture() {
    let Some(decoder) = open_fixture() else { return };
    let metadata = decoder.container_metadata();
    let video_index = metadata.best_video_stream_index.expect("video stream");
    let stream = &metadata.streams[video_index as usize];

    assert_eq!(stream.num_frames_from_scan, Some(30));
    assert_eq!(stream.min_pts_seconds_from_scan, Some(0.0));
    let max_pts_seconds = stream.max_pts_seconds_from_scan.expect("scan ran");
    assert!((max_pts_seconds - 3.0).abs() < 1e-9, "got {max_pts_seconds}");
    assert_eq!(decoder.frame_pts(video_index).map(|pts| pts.len()), Some(30));
    assert_eq!(
        decoder.key_frame_pts(video_index).map(|pts| pts.len()),
        Some(3)
    );
}

#[test]
fn scanned_indexes_are_sorted_and_nested() {
    let Some(decoder) = open_fixture() else { return };
    let video_index = decoder
        .container_metadata()
        .best_video_stream_index
        .expect("video stream");

    let all_frames = decoder.frame_pts(video_index).expect("scanned stream");
    let key_frames = decoder.key_frame_pts(video_index).expect("scanned stream");

    assert!(all_frames.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(key_frames.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(key_frames.iter().all(|pts| all_frames.contains(pts)));
}

#[test]
fn buffer_and_file_inputs_agree() {
    if !Path::new(FIXTURE).exists() {
        return;
    }
    let from_file = VideoDecoder::from_file(FIXTURE).expect("open from file");
    let bytes = std::fs::read(FIXTURE).expect("read fixture");
    let from_buffer = VideoDecoder::from_buffer(&bytes).expect("open from buffer");

    assert_eq!(
        from_file.container_metadata(),
        from_buffer.container_metadata()
    );
}

#[test]
fn repeated_metadata_reads_are_identical() {
    let Some(decoder) = open_fixture() else { return };
    let first = decoder.container_metadata().clone();
    let second = decoder.container_metadata().clone();
    assert_eq!(first, second);
}

#[test]
fn activation_fills_dimensions() {
    let Some(mut decoder) = open_fixture() else { return };
    decoder
        .add_video_stream(VideoStreamOptions::new())
        .expect("activate best video stream");

    let metadata = decoder.container_metadata();
    let video_index = metadata.best_video_stream_index.unwrap();
    let stream = &metadata.streams[video_index as usize];
    assert_eq!(stream.width, Some(320));
    assert_eq!(stream.height, Some(240));
    assert!(stream.codec_name.is_some());
}

#[test]
fn json_metadata_prefers_scan_counts() {
    let Some(decoder) = open_fixture() else { return };
    let parsed: serde_json::Value =
        serde_json::from_str(&decoder.json_metadata()).expect("valid JSON");
    assert_eq!(parsed["numFrames"], serde_json::Value::from(30));
    assert!(parsed["codec"].is_string());
    assert!(parsed["averageFps"].is_number());
}

#[test]
fn container_json_metadata_counts_streams() {
    let Some(decoder) = open_fixture() else { return };
    let parsed: serde_json::Value =
        serde_json::from_str(&decoder.container_json_metadata()).expect("valid JSON");
    assert_eq!(
        parsed["numStreams"],
        serde_json::Value::from(decoder.container_metadata().streams.len() as i64)
    );
}

#[test]
fn stream_json_metadata_validates_the_index() {
    let Some(decoder) = open_fixture() else { return };
    let streams = decoder.container_metadata().streams.len() as i32;
    assert!(decoder.stream_json_metadata(0).is_ok());
    assert!(matches!(
        decoder.stream_json_metadata(streams),
        Err(DecodeError::InvalidArgument(_))
    ));
    assert!(matches!(
        decoder.stream_json_metadata(-1),
        Err(DecodeError::InvalidArgument(_))
    ));
}

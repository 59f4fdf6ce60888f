//! JSON projections of the metadata.
//!
//! Host bindings consume metadata as JSON strings rather than structs.
//! The projections are stable: keys are emitted in sorted order, absent
//! values are omitted entirely, `codec` is a quoted string and every other
//! field is an unquoted numeric.

use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::metadata::{ContainerMetadata, StreamMetadata};

fn render(map: Map<String, Value>) -> String {
    serde_json::to_string_pretty(&Value::Object(map)).unwrap_or_else(|_| "{}".to_string())
}

fn insert_f64(map: &mut Map<String, Value>, key: &str, value: Option<f64>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.into());
    }
}

fn insert_i64(map: &mut Map<String, Value>, key: &str, value: Option<i64>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.into());
    }
}

/// The "best video stream" projection: the view most callers want, with
/// scan-derived values preferred where they exist.
pub(crate) fn json_metadata(metadata: &ContainerMetadata) -> String {
    let mut map = Map::new();
    let best = metadata.best_video_stream();

    // Stream duration when known, container duration otherwise; always
    // present, defaulting to zero.
    let duration_seconds = best
        .and_then(|stream| stream.duration_seconds)
        .or(metadata.duration_seconds)
        .unwrap_or(0.0);
    map.insert("durationSeconds".to_string(), duration_seconds.into());

    insert_i64(&mut map, "bitRate", metadata.bit_rate);

    if let Some(stream) = best {
        insert_i64(
            &mut map,
            "numFrames",
            stream.num_frames_from_scan.or(stream.num_frames),
        );
        insert_f64(
            &mut map,
            "minPtsSecondsFromScan",
            stream.min_pts_seconds_from_scan,
        );
        insert_f64(
            &mut map,
            "maxPtsSecondsFromScan",
            stream.max_pts_seconds_from_scan,
        );
        if let Some(codec) = &stream.codec_name {
            map.insert("codec".to_string(), codec.clone().into());
        }
        insert_i64(&mut map, "width", stream.width);
        insert_i64(&mut map, "height", stream.height);
        insert_f64(&mut map, "averageFps", stream.average_fps);
        // The video stream's own bit rate is the better value; overwrite
        // the container-level one.
        insert_i64(&mut map, "bitRate", stream.bit_rate);
    }

    insert_i64(
        &mut map,
        "bestVideoStreamIndex",
        metadata.best_video_stream_index.map(i64::from),
    );
    insert_i64(
        &mut map,
        "bestAudioStreamIndex",
        metadata.best_audio_stream_index.map(i64::from),
    );

    render(map)
}

/// Container-level projection.
pub(crate) fn container_json_metadata(metadata: &ContainerMetadata) -> String {
    let mut map = Map::new();
    insert_f64(&mut map, "durationSeconds", metadata.duration_seconds);
    insert_i64(&mut map, "bitRate", metadata.bit_rate);
    insert_i64(
        &mut map,
        "bestVideoStreamIndex",
        metadata.best_video_stream_index.map(i64::from),
    );
    insert_i64(
        &mut map,
        "bestAudioStreamIndex",
        metadata.best_audio_stream_index.map(i64::from),
    );
    map.insert(
        "numStreams".to_string(),
        (metadata.streams.len() as i64).into(),
    );
    render(map)
}

/// Single-stream projection.
pub(crate) fn stream_json_metadata(
    metadata: &ContainerMetadata,
    stream_index: i32,
) -> Result<String, DecodeError> {
    let stream: &StreamMetadata = usize::try_from(stream_index)
        .ok()
        .and_then(|index| metadata.streams.get(index))
        .ok_or_else(|| {
            DecodeError::InvalidArgument(format!(
                "Invalid stream index={stream_index}; container has {} streams",
                metadata.streams.len()
            ))
        })?;

    let mut map = Map::new();
    insert_f64(&mut map, "durationSeconds", stream.duration_seconds);
    insert_i64(&mut map, "bitRate", stream.bit_rate);
    insert_i64(&mut map, "numFramesFromScan", stream.num_frames_from_scan);
    insert_i64(&mut map, "numFrames", stream.num_frames);
    insert_f64(
        &mut map,
        "minPtsSecondsFromScan",
        stream.min_pts_seconds_from_scan,
    );
    insert_f64(
        &mut map,
        "maxPtsSecondsFromScan",
        stream.max_pts_seconds_from_scan,
    );
    if let Some(codec) = &stream.codec_name {
        map.insert("codec".to_string(), codec.clone().into());
    }
    insert_i64(&mut map, "width", stream.width);
    insert_i64(&mut map, "height", stream.height);
    insert_f64(&mut map, "averageFps", stream.average_fps);
    Ok(render(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MediaType;

    fn sample_metadata() -> ContainerMetadata {
        ContainerMetadata {
            streams: vec![
                StreamMetadata {
                    stream_index: 0,
                    media_type: Some(MediaType::Video),
                    codec_name: Some("h264".to_string()),
                    bit_rate: Some(400_000),
                    num_frames: Some(29),
                    duration_seconds: Some(3.0),
                    average_fps: Some(10.0),
                    width: Some(640),
                    height: Some(480),
                    num_frames_from_scan: Some(30),
                    min_pts_from_scan: Some(0),
                    max_pts_from_scan: Some(38_400),
                    min_pts_seconds_from_scan: Some(0.0),
                    max_pts_seconds_from_scan: Some(3.0),
                },
                StreamMetadata {
                    stream_index: 1,
                    media_type: Some(MediaType::Audio),
                    codec_name: Some("aac".to_string()),
                    bit_rate: Some(128_000),
                    ..StreamMetadata::default()
                },
            ],
            num_video_streams: 1,
            num_audio_streams: 1,
            duration_seconds: Some(3.1),
            bit_rate: Some(500_000),
            best_video_stream_index: Some(0),
            best_audio_stream_index: Some(1),
        }
    }

    fn parse(json: &str) -> serde_json::Map<String, Value> {
        match serde_json::from_str(json).expect("valid JSON") {
            Value::Object(map) => map,
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn best_video_projection_prefers_scan_values() {
        let parsed = parse(&json_metadata(&sample_metadata()));
        // Scan count wins over the header count.
        assert_eq!(parsed["numFrames"], Value::from(30));
        // Stream bit rate overrides the container's.
        assert_eq!(parsed["bitRate"], Value::from(400_000));
        assert_eq!(parsed["durationSeconds"], Value::from(3.0));
        assert_eq!(parsed["codec"], Value::from("h264"));
        assert_eq!(parsed["bestVideoStreamIndex"], Value::from(0));
        assert_eq!(parsed["bestAudioStreamIndex"], Value::from(1));
    }

    #[test]
    fn best_video_projection_falls_back_without_scan_or_stream() {
        let mut metadata = sample_metadata();
        metadata.streams[0].num_frames_from_scan = None;
        metadata.streams[0].duration_seconds = None;
        let parsed = parse(&json_metadata(&metadata));
        assert_eq!(parsed["numFrames"], Value::from(29));
        assert_eq!(parsed["durationSeconds"], Value::from(3.1));

        // No best video stream at all: container values and a zero
        // duration default.
        metadata.best_video_stream_index = None;
        let parsed = parse(&json_metadata(&metadata));
        assert_eq!(parsed["durationSeconds"], Value::from(0.0));
        assert!(!parsed.contains_key("codec"));
        assert_eq!(parsed["bitRate"], Value::from(500_000));
    }

    #[test]
    fn container_projection_counts_streams() {
        let parsed = parse(&container_json_metadata(&sample_metadata()));
        assert_eq!(parsed["numStreams"], Value::from(2));
        assert_eq!(parsed["durationSeconds"], Value::from(3.1));
        assert_eq!(parsed["bitRate"], Value::from(500_000));
    }

    #[test]
    fn stream_projection_omits_absent_values() {
        let json = stream_json_metadata(&sample_metadata(), 1).unwrap();
        let parsed = parse(&json);
        assert_eq!(parsed["codec"], Value::from("aac"));
        assert!(!parsed.contains_key("width"));
        assert!(!parsed.contains_key("numFramesFromScan"));
        assert!(!parsed.contains_key("durationSeconds"));
    }

    #[test]
    fn stream_projection_rejects_bad_indices() {
        let metadata = sample_metadata();
        assert!(matches!(
            stream_json_metadata(&metadata, 2),
            Err(DecodeError::InvalidArgument(_))
        ));
        assert!(matches!(
            stream_json_metadata(&metadata, -1),
            Err(DecodeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn keys_are_sorted() {
        let json = json_metadata(&sample_metadata());
        let keys: Vec<&str> = json
            .lines()
            .filter_map(|line| line.trim().strip_prefix('"'))
            .filter_map(|line| line.split('"').next())
            .collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
    }
}

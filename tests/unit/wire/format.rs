use super::*;

fn sample() -> RegionEventLog {
    let r = RegionId::new(FrameIndex(0), 0);
    let s = RegionId::new(FrameIndex(0), 1);
    let mut log = RegionEventLog::new();
    log.put_event(
        FrameIndex(0),
        RegionEvent::Create {
            id: s,
            geometry: Geometry::new(1, 1, 20, 20),
        },
    );
    log.put_event(
        FrameIndex(0),
        RegionEvent::Create {
            id: r,
            geometry: Geometry::new(10, 10, 50, 50),
        },
    );
    log.put_event(
        FrameIndex(50),
        RegionEvent::Move {
            target: r,
            geometry: Geometry::new(20, 20, 50, 50),
        },
    );
    log.put_event(
        FrameIndex(60),
        RegionEvent::Resize {
            target: r,
            geometry: Geometry::new(20, 20, 70, 70),
        },
    );
    log.put_event(FrameIndex(80), RegionEvent::Tombstone { target: r });
    log
}

#[test]
fn encodes_the_documented_record_shapes() {
    let json = serde_json::to_value(encode(&sample())).unwrap();
    assert_eq!(
        json["0"][0],
        serde_json::json!({"x": 10, "y": 10, "width": 50, "height": 50, "rectangleId": "0_0"})
    );
    assert_eq!(
        json["50"][0],
        serde_json::json!({"rectangleMoved": "0_0", "x": 20, "y": 20, "width": 50, "height": 50})
    );
    assert_eq!(json["60"][0]["rectangleResized"], "0_0");
    assert_eq!(
        json["80"][0],
        serde_json::json!({"isRemovalMarker": true, "removesRect": "0_0"})
    );
}

#[test]
fn json_text_round_trips_losslessly() {
    let log = sample();
    let text = encode_json(&log).unwrap();
    let back = decode_json(&text).unwrap();
    assert_eq!(back, log);
    assert_eq!(encode_json(&back).unwrap(), text);
}

#[test]
fn missing_create_id_is_derived_from_position() {
    let text = r#"{"7": [
        {"x": 0, "y": 0, "width": 30, "height": 30},
        {"x": 5, "y": 5, "width": 30, "height": 30}
    ]}"#;
    let log = decode_json(text).unwrap();
    assert_eq!(
        log.region_ids(),
        vec![RegionId::new(FrameIndex(7), 0), RegionId::new(FrameIndex(7), 1)]
    );
}

#[test]
fn record_variants_are_told_apart_by_fields() {
    let text = r#"{"3": [
        {"rectangleResized": "1_0", "x": 0, "y": 0, "width": 30, "height": 30},
        {"removesRect": "1_0", "isRemovalMarker": true},
        {"rectangleMoved": "1_0", "x": 4, "y": 4, "width": 30, "height": 30}
    ]}"#;
    let log = decode_json(text).unwrap();
    let kinds = log
        .bucket(FrameIndex(3))
        .iter()
        .map(RegionEvent::kind)
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![
            crate::region::event::EventKind::Resize,
            crate::region::event::EventKind::Tombstone,
            crate::region::event::EventKind::Move,
        ]
    );
}

#[test]
fn rejects_malformed_input() {
    assert!(decode_json("[1, 2]").is_err());
    assert!(decode_json(r#"{"x": []}"#).is_err());
    let bad_id = r#"{"1": [{"rectangleMoved": "nope", "x": 0, "y": 0, "width": 1, "height": 1}]}"#;
    assert!(decode_json(bad_id).is_err());
    assert!(decode_json(r#"{"1": [{"isRemovalMarker": false, "removesRect": "1_0"}]}"#).is_err());
    // A create must live on its own origin frame.
    let foreign = r#"{"2": [{"x": 0, "y": 0, "width": 30, "height": 30, "rectangleId": "1_0"}]}"#;
    let err = decode_json(foreign).unwrap_err();
    assert!(matches!(err, MasklineError::Serde(_)));
}

#[test]
fn empty_frames_are_dropped() {
    let log = decode_json(r#"{"4": []}"#).unwrap();
    assert!(log.is_empty());
    assert_eq!(encode_json(&RegionEventLog::new()).unwrap(), "{}");
}

#[test]
fn removal_on_the_origin_frame_drops_the_region() {
    let text = r#"{
        "5": [
            {"x": 0, "y": 0, "width": 50, "height": 50, "rectangleId": "5_0"},
            {"isRemovalMarker": true, "removesRect": "5_0"}
        ],
        "9": [{"rectangleMoved": "5_0", "x": 8, "y": 8, "width": 50, "height": 50}]
    }"#;
    let log = decode_json(text).unwrap();
    let r = RegionId::new(FrameIndex(5), 0);
    assert!(!log.contains_region(r));
    assert!(log.is_empty());
    let at5 = crate::projection::projector::project(
        &log,
        FrameIndex(5),
        crate::projection::projector::ProjectionMode::Complete,
    );
    assert!(at5.is_empty());
}

#[test]
fn region_created_twice_is_rejected() {
    let text = r#"{"5": [
        {"x": 0, "y": 0, "width": 50, "height": 50, "rectangleId": "5_1"},
        {"x": 100, "y": 100, "width": 60, "height": 60}
    ]}"#;
    let err = decode_json(text).unwrap_err();
    assert!(matches!(err, MasklineError::Serde(_)));
    assert!(err.to_string().contains("5_1"));
}

use super::*;
use crate::region::event::{RegionEvent, RegionId};

fn log() -> RegionEventLog {
    let r = RegionId::new(FrameIndex(2), 0);
    let mut log = RegionEventLog::new();
    log.put_event(
        FrameIndex(2),
        RegionEvent::Create {
            id: r,
            geometry: Geometry::new(90, 0, 20, 20),
        },
    );
    log.put_event(
        FrameIndex(4),
        RegionEvent::Move {
            target: r,
            geometry: Geometry::new(200, 0, 20, 20),
        },
    );
    log.put_event(
        FrameIndex(6),
        RegionEvent::Move {
            target: r,
            geometry: Geometry::new(10, 10, 20, 20),
        },
    );
    log.put_event(FrameIndex(8), RegionEvent::Tombstone { target: r });
    log
}

fn range(first: u64, last: u64) -> FrameRange {
    FrameRange::inclusive(FrameIndex(first), FrameIndex(last)).unwrap()
}

#[test]
fn plan_tracks_active_geometry_per_frame() {
    let plan = RegionPlan::build(&log(), range(0, 9), None);
    assert!(plan.regions_at(FrameIndex(1)).is_empty());
    assert_eq!(plan.regions_at(FrameIndex(3)), &[Geometry::new(90, 0, 20, 20)]);
    assert_eq!(plan.regions_at(FrameIndex(5)), &[Geometry::new(200, 0, 20, 20)]);
    assert_eq!(plan.regions_at(FrameIndex(7)), &[Geometry::new(10, 10, 20, 20)]);
    assert!(plan.regions_at(FrameIndex(8)).is_empty());
    assert_eq!(plan.frame_count(), 6);
}

#[test]
fn plan_starting_mid_log_replays_earlier_events() {
    let plan = RegionPlan::build(&log(), range(5, 6), None);
    assert_eq!(plan.regions_at(FrameIndex(5)), &[Geometry::new(200, 0, 20, 20)]);
    assert_eq!(plan.region_count(), 2);
}

#[test]
fn clipping_trims_and_drops_offscreen_regions() {
    let size = FrameSize {
        width: 100,
        height: 100,
    };
    let plan = RegionPlan::build(&log(), range(2, 7), Some(size));
    assert_eq!(plan.regions_at(FrameIndex(2)), &[Geometry::new(90, 0, 10, 20)]);
    assert!(plan.regions_at(FrameIndex(4)).is_empty());
    assert_eq!(plan.regions_at(FrameIndex(6)), &[Geometry::new(10, 10, 20, 20)]);
}

#[test]
fn preview_starts_at_first_keyframe_and_clamps() {
    let l = log();
    assert_eq!(preview_range(&l, 1000, 200).unwrap(), Some(range(2, 202)));
    assert_eq!(preview_range(&l, 50, 200).unwrap(), Some(range(2, 49)));
    assert_eq!(preview_range(&RegionEventLog::new(), 50, 200).unwrap(), None);
    assert_eq!(preview_range(&l, 2, 200).unwrap(), None);
}

#[test]
fn plan_serializes_with_frame_keys() {
    let plan = RegionPlan::build(&log(), range(2, 2), None);
    let json = serde_json::to_value(&plan).unwrap();
    assert_eq!(json["frames"]["2"][0]["x"], 90);
    let back: RegionPlan = serde_json::from_value(json).unwrap();
    assert_eq!(back, plan);
}

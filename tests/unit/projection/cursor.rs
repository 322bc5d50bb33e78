use super::*;
use crate::projection::projector::project;
use crate::region::event::{RegionEvent, RegionId};
use crate::region::geometry::Geometry;

fn log_with_moves(frames: &[u64]) -> (RegionEventLog, RegionId) {
    let r = RegionId::new(FrameIndex(0), 0);
    let mut log = RegionEventLog::new();
    log.put_event(
        FrameIndex(0),
        RegionEvent::Create {
            id: r,
            geometry: Geometry::new(0, 0, 40, 40),
        },
    );
    for &f in frames {
        log.put_event(
            FrameIndex(f),
            RegionEvent::Move {
                target: r,
                geometry: Geometry::new(f as i32, 0, 40, 40),
            },
        );
    }
    (log, r)
}

#[test]
fn forward_navigation_replays_each_bucket_once() {
    let (log, _) = log_with_moves(&[3, 6, 9, 12]);
    let mut cursor = ProjectionCursor::new(2);
    for f in 0..=20 {
        let got = cursor.seek(&log, FrameIndex(f), ProjectionMode::Active);
        assert_eq!(got, project(&log, FrameIndex(f), ProjectionMode::Active));
    }
    assert_eq!(cursor.replayed_buckets(), 5);
    assert_eq!(cursor.checkpoint_count(), 2);
}

#[test]
fn backward_seek_resumes_from_checkpoint() {
    let (log, r) = log_with_moves(&[3, 6, 9, 12]);
    let mut cursor = ProjectionCursor::new(2);
    cursor.seek(&log, FrameIndex(20), ProjectionMode::Active);
    let before = cursor.replayed_buckets();

    // Checkpoints sit at frames 3 and 9; rewinding to 10 replays nothing new past 9.
    let p = cursor.seek(&log, FrameIndex(10), ProjectionMode::Active);
    assert_eq!(p.get(r).unwrap().geometry.x, 9);
    assert_eq!(cursor.replayed_buckets(), before);

    let p = cursor.seek(&log, FrameIndex(1), ProjectionMode::Active);
    assert_eq!(p.get(r).unwrap().geometry.x, 0);
}

#[test]
fn log_mutation_invalidates_memoized_state() {
    let (mut log, r) = log_with_moves(&[5]);
    let mut cursor = ProjectionCursor::new(1);
    assert!(cursor.seek(&log, FrameIndex(10), ProjectionMode::Active).contains(r));

    log.put_event(FrameIndex(7), RegionEvent::Tombstone { target: r });
    assert!(!cursor.seek(&log, FrameIndex(10), ProjectionMode::Active).contains(r));
    let ghost = cursor.seek(&log, FrameIndex(7), ProjectionMode::Complete);
    assert!(ghost.get(r).unwrap().is_deleted);
}

#[test]
fn mode_switch_on_same_frame_needs_no_replay() {
    let (mut log, r) = log_with_moves(&[]);
    log.put_event(FrameIndex(4), RegionEvent::Tombstone { target: r });
    let mut cursor = ProjectionCursor::default();
    assert!(cursor.seek(&log, FrameIndex(4), ProjectionMode::Active).is_empty());
    let replayed = cursor.replayed_buckets();
    assert_eq!(cursor.seek(&log, FrameIndex(4), ProjectionMode::Complete).len(), 1);
    assert_eq!(cursor.replayed_buckets(), replayed);
}

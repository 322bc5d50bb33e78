use super::*;
use crate::region::geometry::Geometry;

fn id(origin: u64, seq: u32) -> RegionId {
    RegionId::new(FrameIndex(origin), seq)
}

fn create(origin: u64, seq: u32) -> RegionEvent {
    RegionEvent::Create {
        id: id(origin, seq),
        geometry: Geometry::new(0, 0, 20, 20),
    }
}

fn mv(target: RegionId, x: i32) -> RegionEvent {
    RegionEvent::Move {
        target,
        geometry: Geometry::new(x, 0, 20, 20),
    }
}

#[test]
fn put_replaces_same_target_and_kind() {
    let mut log = RegionEventLog::new();
    let r = id(0, 0);
    log.put_event(FrameIndex(0), create(0, 0));
    assert!(log.put_event(FrameIndex(5), mv(r, 1)).is_none());
    let replaced = log.put_event(FrameIndex(5), mv(r, 2));
    assert_eq!(replaced, Some(mv(r, 1)));
    assert_eq!(log.bucket(FrameIndex(5)), &[mv(r, 2)]);
}

#[test]
fn put_keeps_distinct_kinds_side_by_side() {
    let mut log = RegionEventLog::new();
    let r = id(0, 0);
    log.put_event(FrameIndex(3), mv(r, 1));
    log.put_event(FrameIndex(3), RegionEvent::Tombstone { target: r });
    assert_eq!(log.bucket(FrameIndex(3)).len(), 2);
}

#[test]
fn remove_prunes_empty_buckets() {
    let mut log = RegionEventLog::new();
    let r = id(0, 0);
    log.put_event(FrameIndex(0), create(0, 0));
    log.put_event(FrameIndex(9), mv(r, 4));
    let removed = log.remove_events(FrameIndex(9), |e| e.kind() == EventKind::Move);
    assert_eq!(removed.len(), 1);
    assert!(log.bucket(FrameIndex(9)).is_empty());
    assert_eq!(
        log.frames_with_events().collect::<Vec<_>>(),
        vec![FrameIndex(0)]
    );
}

#[test]
fn remove_without_match_is_a_noop() {
    let mut log = RegionEventLog::new();
    log.put_event(FrameIndex(0), create(0, 0));
    let rev = log.revision();
    assert!(log.remove_events(FrameIndex(0), |_| false).is_empty());
    assert!(log.remove_events(FrameIndex(77), |_| true).is_empty());
    assert_eq!(log.revision(), rev);
}

#[test]
fn reverse_index_tracks_referencing_frames() {
    let mut log = RegionEventLog::new();
    let r = id(2, 0);
    log.put_event(FrameIndex(2), create(2, 0));
    log.put_event(FrameIndex(4), mv(r, 1));
    log.put_event(FrameIndex(4), RegionEvent::Tombstone { target: r });
    log.put_event(FrameIndex(8), mv(r, 2));
    assert_eq!(
        log.frames_referencing(r).collect::<Vec<_>>(),
        vec![FrameIndex(2), FrameIndex(4), FrameIndex(8)]
    );

    // Frame 4 still references r through the tombstone.
    log.remove_events(FrameIndex(4), |e| e.kind() == EventKind::Move);
    assert!(log.frames_referencing(r).any(|f| f == FrameIndex(4)));

    log.remove_events(FrameIndex(4), |e| e.target() == r);
    assert_eq!(
        log.frames_referencing(r).collect::<Vec<_>>(),
        vec![FrameIndex(2), FrameIndex(8)]
    );
}

#[test]
fn buckets_between_is_half_open_on_the_left() {
    let mut log = RegionEventLog::new();
    for f in [0u64, 3, 5, 9] {
        log.put_event(FrameIndex(f), create(f, 0));
    }
    let frames = |after, through| {
        log.buckets_between(after, FrameIndex(through))
            .map(|(f, _)| f.0)
            .collect::<Vec<_>>()
    };
    assert_eq!(frames(None, 5), vec![0, 3, 5]);
    assert_eq!(frames(Some(FrameIndex(3)), 9), vec![5, 9]);
    assert_eq!(frames(Some(FrameIndex(9)), 2), Vec::<u64>::new());
    assert_eq!(frames(Some(FrameIndex(5)), 5), Vec::<u64>::new());
}

#[test]
fn region_ids_and_counts() {
    let mut log = RegionEventLog::new();
    log.put_event(FrameIndex(4), create(4, 1));
    log.put_event(FrameIndex(4), create(4, 0));
    log.put_event(FrameIndex(6), mv(id(4, 0), 3));
    assert_eq!(log.region_ids(), vec![id(4, 0), id(4, 1)]);
    assert_eq!(log.event_count(), 3);
    assert_eq!(log.frame_count(), 2);
    assert!(log.contains_region(id(4, 1)));
    assert!(!log.contains_region(id(6, 0)));
}

#[test]
fn equality_ignores_bucket_order_and_revision() {
    let mut a = RegionEventLog::new();
    let mut b = RegionEventLog::new();
    a.put_event(FrameIndex(1), create(1, 0));
    a.put_event(FrameIndex(1), create(1, 1));
    b.put_event(FrameIndex(1), create(1, 1));
    b.put_event(FrameIndex(1), create(1, 0));
    b.put_event(FrameIndex(1), create(1, 0));
    assert_eq!(a, b);
    assert_ne!(a.revision(), b.revision());
}

#[test]
fn clear_drops_everything() {
    let mut log = RegionEventLog::new();
    log.put_event(FrameIndex(1), create(1, 0));
    log.clear();
    assert!(log.is_empty());
    assert_eq!(log.frames_referencing(id(1, 0)).count(), 0);
}

#[test]
fn purge_region_clears_every_frame() {
    let mut log = RegionEventLog::new();
    let r = id(0, 0);
    log.put_event(FrameIndex(0), create(0, 0));
    log.put_event(FrameIndex(0), create(0, 1));
    log.put_event(FrameIndex(4), mv(r, 3));
    log.put_event(FrameIndex(8), RegionEvent::Tombstone { target: r });
    assert_eq!(log.purge_region(r), 3);
    assert_eq!(log.frames_referencing(r).count(), 0);
    assert_eq!(log.frames_with_events().collect::<Vec<_>>(), vec![FrameIndex(0)]);
    assert_eq!(log.region_ids(), vec![id(0, 1)]);
}

#[test]
fn origin_tombstones_purge_only_their_region() {
    let mut log = RegionEventLog::new();
    let r = id(2, 0);
    let s = id(2, 1);
    log.put_event(FrameIndex(2), create(2, 0));
    log.put_event(FrameIndex(2), create(2, 1));
    log.put_event(FrameIndex(2), RegionEvent::Tombstone { target: r });
    log.put_event(FrameIndex(6), mv(r, 1));
    log.put_event(FrameIndex(7), RegionEvent::Tombstone { target: s });

    assert_eq!(log.purge_origin_tombstones(), vec![r]);
    assert!(!log.contains_region(r));
    assert!(log.contains_region(s));
    assert_eq!(log.event_count(), 2);
}

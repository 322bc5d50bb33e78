use super::*;

#[test]
fn frame_range_contains_boundaries() {
    let r = FrameRange::new(FrameIndex(2), FrameIndex(5)).unwrap();
    assert!(!r.contains(FrameIndex(1)));
    assert!(r.contains(FrameIndex(2)));
    assert!(r.contains(FrameIndex(4)));
    assert!(!r.contains(FrameIndex(5)));
}

#[test]
fn frame_range_rejects_inverted_bounds() {
    assert!(FrameRange::new(FrameIndex(5), FrameIndex(2)).is_err());
    assert!(FrameRange::inclusive(FrameIndex(5), FrameIndex(2)).is_err());
}

#[test]
fn inclusive_range_covers_last_frame() {
    let r = FrameRange::inclusive(FrameIndex(3), FrameIndex(3)).unwrap();
    assert_eq!(r.len_frames(), 1);
    assert!(r.contains(FrameIndex(3)));
    assert_eq!(r.frames().collect::<Vec<_>>(), vec![FrameIndex(3)]);
}

#[test]
fn clamp_handles_empty_and_out_of_range() {
    let r = FrameRange::new(FrameIndex(2), FrameIndex(5)).unwrap();
    assert_eq!(r.clamp(FrameIndex(0)), FrameIndex(2));
    assert_eq!(r.clamp(FrameIndex(9)), FrameIndex(4));
    let empty = FrameRange::new(FrameIndex(7), FrameIndex(7)).unwrap();
    assert_eq!(empty.clamp(FrameIndex(100)), FrameIndex(7));
}

#[test]
fn frame_index_neighbours() {
    assert_eq!(FrameIndex(0).prev(), None);
    assert_eq!(FrameIndex(4).prev(), Some(FrameIndex(3)));
    assert_eq!(FrameIndex(u64::MAX).next(), FrameIndex(u64::MAX));
}

#[test]
fn fps_validation_and_conversion() {
    assert!(Fps::new(30, 0).is_err());
    assert!(Fps::new(0, 1).is_err());
    let fps = Fps::new(30, 1).unwrap();
    assert_eq!(fps.as_f64(), 30.0);
    assert_eq!(fps.frames_to_secs(90), 3.0);
}

#[test]
fn frame_size_bounds_are_anchored_at_origin() {
    let s = FrameSize {
        width: 640,
        height: 360,
    };
    assert_eq!(s.bounds(), kurbo::Rect::new(0.0, 0.0, 640.0, 360.0));
}

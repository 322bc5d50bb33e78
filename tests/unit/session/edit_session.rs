use super::*;
use crate::edit::tracking::TrackPoint;
use crate::foundation::core::Fps;
use crate::jobs::state::{JobId, JobKind};
use crate::persist::store::MemoryLogStore;

fn cfg() -> EngineConfig {
    EngineConfig::default()
}

fn sid() -> SessionId {
    SessionId::new("street").unwrap()
}

fn video(frames: u64) -> VideoInfo {
    VideoInfo {
        frame_count: frames,
        fps: Fps::new(25, 1).unwrap(),
        size: FrameSize {
            width: 200,
            height: 100,
        },
    }
}

fn created(outcome: EditOutcome) -> RegionId {
    match outcome {
        EditOutcome::Created(id) => id,
        other => panic!("expected Created, got {other:?}"),
    }
}

fn completed(kind: JobKind, output: JobOutput) -> JobSnapshot {
    let mut snap = JobSnapshot::queued(JobId(1), kind);
    snap.advance(JobPhase::Completed, 100, "done").unwrap();
    snap.output = Some(output);
    snap
}

#[test]
fn edits_show_up_in_projection_and_keyframes() {
    let mut s = EditSession::new(sid(), &cfg());
    let id = created(s.create(FrameIndex(5), Geometry::new(10, 10, 40, 40)));
    s.move_region(FrameIndex(9), id, Geometry::new(30, 10, 40, 40)).unwrap();

    assert!(s.project(FrameIndex(4), ProjectionMode::Active).is_empty());
    let at7 = s.project(FrameIndex(7), ProjectionMode::Active);
    assert_eq!(at7.get(id).unwrap().geometry.x, 10);
    let at9 = s.project(FrameIndex(9), ProjectionMode::Active);
    assert_eq!(at9.get(id).unwrap().geometry.x, 30);

    assert_eq!(s.keyframes(), vec![FrameIndex(5), FrameIndex(9)]);
    assert_eq!(s.next_change(FrameIndex(5)), Some(FrameIndex(9)));
    assert_eq!(s.next_change(FrameIndex(9)), Some(FrameIndex(5)));
    assert_eq!(s.previous_change(FrameIndex(6)), Some(FrameIndex(5)));
    assert_eq!(s.change_summary(FrameIndex(9)).moves, 1);
}

#[test]
fn job_requests_need_video_info() {
    let mut s = EditSession::new(sid(), &cfg());
    created(s.create(FrameIndex(2), Geometry::new(0, 0, 20, 20)));
    assert!(matches!(
        s.export_request(None, PathBuf::from("out.mp4")),
        Err(MasklineError::Validation(_))
    ));

    let info = s
        .apply_extraction(&completed(
            JobKind::Extraction,
            JobOutput::Extraction {
                frame_count: 300,
                fps: Fps::new(25, 1).unwrap(),
                size: video(300).size,
                cached: false,
            },
        ))
        .unwrap();
    assert_eq!(info.frame_count, 300);

    let Ok(JobRequest::Export(p)) = s.export_request(None, PathBuf::from("out.mp4")) else {
        panic!("expected export request");
    };
    assert_eq!(p.range.len_frames(), 300);
    assert_eq!(p.plan.frame_count(), 298);
    assert!(p.plan.regions_at(FrameIndex(1)).is_empty());
}

#[test]
fn export_plan_is_clipped_to_video() {
    let mut s = EditSession::new(sid(), &cfg());
    s.set_video(video(10));
    created(s.create(FrameIndex(0), Geometry::new(180, 90, 40, 40)));
    let Ok(JobRequest::Export(p)) = s.export_request(None, PathBuf::from("out.mp4")) else {
        panic!("expected export request");
    };
    let clipped = p.plan.regions_at(FrameIndex(3));
    assert_eq!(clipped, &[Geometry::new(180, 90, 20, 10)]);
}

#[test]
fn preview_starts_at_first_keyframe() {
    let mut s = EditSession::new(sid(), &cfg());
    s.set_video(video(1000));
    assert!(s.preview_request(PathBuf::from("p.mp4")).unwrap().is_none());

    created(s.create(FrameIndex(50), Geometry::new(0, 0, 20, 20)));
    let Some(JobRequest::Preview(p)) = s.preview_request(PathBuf::from("p.mp4")).unwrap() else {
        panic!("expected preview request");
    };
    assert_eq!(p.range.start, FrameIndex(50));
    assert_eq!(p.range.end, FrameIndex(251));
}

#[test]
fn tracking_round_trip_through_session() {
    let mut s = EditSession::new(sid(), &cfg());
    let id = created(s.create(FrameIndex(0), Geometry::new(0, 0, 30, 30)));

    let JobRequest::Tracking(p) = s.tracking_request(id, FrameIndex(4)).unwrap() else {
        panic!("expected tracking request");
    };
    assert_eq!(p.geometry, Geometry::new(0, 0, 30, 30));
    assert!(s.tracking_request(id, FrameIndex(0)).is_ok());

    let points = vec![
        TrackPoint {
            frame: FrameIndex(5),
            geometry: Geometry::new(2, 0, 30, 30),
        },
        TrackPoint {
            frame: FrameIndex(6),
            geometry: Geometry::new(20, 0, 30, 30),
        },
    ];
    let summary = s
        .apply_tracking(&completed(
            JobKind::Tracking,
            JobOutput::Tracking {
                region: id,
                start_frame: FrameIndex(4),
                points,
            },
        ))
        .unwrap();
    assert_eq!(summary.written, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(
        s.project(FrameIndex(6), ProjectionMode::Active).get(id).unwrap().geometry.x,
        20
    );
}

#[test]
fn unfinished_jobs_are_not_applied() {
    let mut s = EditSession::new(sid(), &cfg());
    let snap = JobSnapshot::queued(JobId(3), JobKind::Tracking);
    assert!(matches!(s.apply_tracking(&snap), Err(MasklineError::Validation(_))));
    assert!(matches!(s.apply_extraction(&snap), Err(MasklineError::Validation(_))));
}

#[test]
fn tracking_request_for_removed_region_fails() {
    let mut s = EditSession::new(sid(), &cfg());
    let id = created(s.create(FrameIndex(0), Geometry::new(0, 0, 30, 30)));
    s.remove(FrameIndex(3), id).unwrap();
    assert!(matches!(
        s.tracking_request(id, FrameIndex(5)),
        Err(MasklineError::NotFound(_))
    ));
}

#[test]
fn open_loads_and_save_persists() {
    let store: Arc<MemoryLogStore> = Arc::new(MemoryLogStore::new());
    let mut config = cfg();
    config.autosave.enabled = false;

    let mut first = EditSession::open(sid(), store.clone(), &config).unwrap();
    assert!(first.log().is_empty());
    let id = created(first.create(FrameIndex(1), Geometry::new(0, 0, 30, 30)));
    first.save().unwrap();
    drop(first);

    let mut second = EditSession::open(sid(), store, &config).unwrap();
    assert!(second.autosave_stats().is_none());
    assert!(second.log().contains_region(id));
    let next = created(second.create(FrameIndex(1), Geometry::new(50, 0, 30, 30)));
    assert_eq!(next, RegionId::new(FrameIndex(1), 1));
}

#[test]
fn autosave_attached_when_enabled() {
    let store: Arc<MemoryLogStore> = Arc::new(MemoryLogStore::new());
    let mut s = EditSession::open(sid(), store.clone(), &cfg()).unwrap();
    created(s.create(FrameIndex(0), Geometry::new(0, 0, 30, 30)));
    s.save().unwrap();
    let stats = s.autosave_stats().unwrap();
    assert!(stats.saves_completed >= 1);
    assert_eq!(store.len(), 1);
}

use super::*;
use crate::foundation::core::FrameIndex;
use crate::region::event::{RegionEvent, RegionId};
use crate::region::geometry::Geometry;

fn scratch(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("store_unit").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn one_region() -> RegionEventLog {
    let mut log = RegionEventLog::new();
    log.put_event(
        FrameIndex(3),
        RegionEvent::Create {
            id: RegionId::new(FrameIndex(3), 0),
            geometry: Geometry::new(1, 2, 30, 40),
        },
    );
    log
}

#[test]
fn session_ids_are_validated() {
    assert!(SessionId::new("clip01").is_ok());
    assert!(SessionId::new("").is_err());
    assert!(SessionId::new("  ").is_err());
    assert!(SessionId::new("../etc").is_err());
    assert!(SessionId::new("a/b").is_err());
    assert!(SessionId::new("a\\b").is_err());
    assert_eq!(SessionId::from_video_name("clips/beach.final.mp4").unwrap().as_str(), "beach");
    assert!(serde_json::from_str::<SessionId>("\"x/y\"").is_err());
}

#[test]
fn fs_store_round_trips_and_replaces() {
    let store = FsLogStore::new(scratch("round_trip"));
    let session = SessionId::new("clip").unwrap();
    assert!(store.load_log(&session).unwrap().is_none());
    assert!(open_log(&store, &session).unwrap().is_empty());

    save_log(&store, &session, &one_region()).unwrap();
    assert!(store.path_for(&session).ends_with("regions_clip.json"));
    assert_eq!(open_log(&store, &session).unwrap(), one_region());

    save_log(&store, &session, &RegionEventLog::new()).unwrap();
    assert!(open_log(&store, &session).unwrap().is_empty());
    let leftovers = std::fs::read_dir(store.root())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn fs_store_reports_unwritable_root_as_transient() {
    let dir = scratch("blocked");
    std::fs::create_dir_all(dir.parent().unwrap()).unwrap();
    std::fs::write(&dir, b"not a directory").unwrap();
    let store = FsLogStore::new(&dir);
    let err = store
        .persist_log(&SessionId::new("clip").unwrap(), "{}")
        .unwrap_err();
    assert!(matches!(err, MasklineError::TransientIo(_)));
    std::fs::remove_file(&dir).unwrap();
}

#[test]
fn memory_store_keeps_sessions_apart() {
    let store = MemoryLogStore::new();
    let a = SessionId::new("a").unwrap();
    let b = SessionId::new("b").unwrap();
    save_log(&store, &a, &one_region()).unwrap();
    assert_eq!(store.len(), 1);
    assert!(store.load_log(&b).unwrap().is_none());
    assert_eq!(open_log(&store, &a).unwrap(), one_region());
}

#[test]
fn fs_store_follows_storage_opts() {
    let opts = StorageOpts {
        root: scratch("from_opts"),
    };
    let store = FsLogStore::from_opts(&opts);
    assert_eq!(store.root(), opts.root.as_path());

    let session = SessionId::new("clip").unwrap();
    save_log(&store, &session, &one_region()).unwrap();
    assert!(opts.root.join("regions_clip.json").exists());
    assert_eq!(open_log(&store, &session).unwrap(), one_region());
}

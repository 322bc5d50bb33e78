use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::foundation::config::StorageOpts;
use crate::foundation::error::{MasklineError, MasklineResult};
use crate::region::log::RegionEventLog;
use crate::wire::format::{decode_json, encode_json};

/// Identifier of one editing session (one video).
///
/// Non-empty, at most 128 characters, and free of path separators and `..` so it can be
/// used as a file name component.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Validate and wrap a session id.
    pub fn new(id: impl Into<String>) -> MasklineResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(MasklineError::validation("session id must be non-empty"));
        }
        if id.len() > 128 {
            return Err(MasklineError::validation("session id must be at most 128 bytes"));
        }
        if id.contains(['/', '\\', '\0']) || id.contains("..") {
            return Err(MasklineError::validation(format!(
                "session id '{id}' must not contain path separators or '..'"
            )));
        }
        Ok(Self(id))
    }

    /// Session id for a video file: its name up to the first `.`.
    pub fn from_video_name(name: &str) -> MasklineResult<Self> {
        let file = Path::new(name)
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(name);
        Self::new(file.split('.').next().unwrap_or(file))
    }

    /// Borrow the id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for SessionId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

/// Save/load contract for serialized region logs.
pub trait LogStore: Send + Sync {
    /// Store `serialized` as the log of `session`, replacing any previous one.
    fn persist_log(&self, session: &SessionId, serialized: &str) -> MasklineResult<()>;

    /// Fetch the stored log of `session`, or `None` when nothing was saved yet.
    fn load_log(&self, session: &SessionId) -> MasklineResult<Option<String>>;
}

/// Serialize `log` and hand it to `store`.
pub fn save_log(
    store: &dyn LogStore,
    session: &SessionId,
    log: &RegionEventLog,
) -> MasklineResult<()> {
    let text = encode_json(log)?;
    store.persist_log(session, &text)
}

/// Load and decode the log of `session`; a session without saved state yields an empty log.
pub fn open_log(store: &dyn LogStore, session: &SessionId) -> MasklineResult<RegionEventLog> {
    match store.load_log(session)? {
        Some(text) => decode_json(&text),
        None => Ok(RegionEventLog::new()),
    }
}

/// Stores each session as `<root>/regions_<session>.json`.
#[derive(Clone, Debug)]
pub struct FsLogStore {
    root: PathBuf,
}

impl FsLogStore {
    /// Store rooted at `root`; the directory is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at the configured storage directory.
    pub fn from_opts(opts: &StorageOpts) -> Self {
        Self::new(opts.root.clone())
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the log of `session`.
    pub fn path_for(&self, session: &SessionId) -> PathBuf {
        self.root.join(format!("regions_{session}.json"))
    }
}

impl LogStore for FsLogStore {
    fn persist_log(&self, session: &SessionId, serialized: &str) -> MasklineResult<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            MasklineError::transient_io(format!(
                "failed to create log directory '{}': {e}",
                self.root.display()
            ))
        })?;

        let path = self.path_for(session);
        let tmp = self.root.join(format!(".regions_{session}.json.tmp"));
        std::fs::write(&tmp, serialized).map_err(|e| {
            MasklineError::transient_io(format!("failed to write '{}': {e}", tmp.display()))
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            MasklineError::transient_io(format!(
                "failed to move '{}' into place: {e}",
                path.display()
            ))
        })?;
        tracing::debug!(
            session = %session,
            bytes = serialized.len(),
            path = %path.display(),
            "log persisted"
        );
        Ok(())
    }

    fn load_log(&self, session: &SessionId) -> MasklineResult<Option<String>> {
        let path = self.path_for(session);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MasklineError::transient_io(format!(
                "failed to read '{}': {e}",
                path.display()
            ))),
        }
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    logs: Mutex<HashMap<SessionId, String>>,
}

impl MemoryLogStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with a stored log.
    pub fn len(&self) -> usize {
        self.logs.lock().map(|m| m.len()).unwrap_or(0)
    }

    /// Return `true` when nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogStore for MemoryLogStore {
    fn persist_log(&self, session: &SessionId, serialized: &str) -> MasklineResult<()> {
        let mut logs = self
            .logs
            .lock()
            .map_err(|_| MasklineError::transient_io("memory log store lock poisoned"))?;
        logs.insert(session.clone(), serialized.to_string());
        Ok(())
    }

    fn load_log(&self, session: &SessionId) -> MasklineResult<Option<String>> {
        let logs = self
            .logs
            .lock()
            .map_err(|_| MasklineError::transient_io("memory log store lock poisoned"))?;
        Ok(logs.get(session).cloned())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/persist/store.rs"]
mod tests;

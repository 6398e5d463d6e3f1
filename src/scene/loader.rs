//! Background scene loading
//!
//! Parsing happens on a short-lived worker thread; the frame loop polls the
//! result once per frame and keeps rendering the quad and mask meanwhile.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};

use thiserror::Error;

use super::descriptor::SceneDescriptor;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to read scene {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scene {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("scene loader thread exited without a result")]
    Disconnected,
}

/// Read and parse a scene descriptor
pub fn load_scene(path: &Path) -> Result<SceneDescriptor, SceneError> {
    let json = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    SceneDescriptor::from_json(&json).map_err(|source| SceneError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Scene parse running on a worker thread
pub struct SceneLoader {
    path: PathBuf,
    receiver: Receiver<Result<SceneDescriptor, SceneError>>,
}

impl SceneLoader {
    pub fn spawn(path: PathBuf) -> Self {
        let (sender, receiver) = mpsc::channel();
        let worker_path = path.clone();
        std::thread::spawn(move || {
            let _ = sender.send(load_scene(&worker_path));
        });
        tracing::info!("Loading scene from {:?}", path);
        Self { path, receiver }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Non-blocking check for the result
    pub fn poll(&self) -> Option<Result<SceneDescriptor, SceneError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(SceneError::Disconnected)),
        }
    }
}

/// Where the background scene is in its lifecycle
#[derive(Default)]
pub enum SceneSlot {
    /// No scene configured
    #[default]
    Empty,
    Loading(SceneLoader),
    Ready(Box<SceneDescriptor>),
    Failed,
}

impl SceneSlot {
    pub fn load(path: PathBuf) -> Self {
        SceneSlot::Loading(SceneLoader::spawn(path))
    }

    /// Advance a pending load. Returns true when the slot changed.
    pub fn poll(&mut self) -> bool {
        let SceneSlot::Loading(loader) = self else {
            return false;
        };
        let Some(result) = loader.poll() else {
            return false;
        };

        *self = match result {
            Ok(scene) => {
                tracing::info!(
                    "Scene loaded: {} island nodes, {} audio reactive",
                    scene.island.len(),
                    scene.audio_reactive_count()
                );
                SceneSlot::Ready(Box::new(scene))
            }
            Err(e) => {
                tracing::error!("Scene load failed: {}", e);
                SceneSlot::Failed
            }
        };
        true
    }

    pub fn scene(&self) -> Option<&SceneDescriptor> {
        match self {
            SceneSlot::Ready(scene) => Some(&**scene),
            _ => None,
        }
    }

    pub fn scene_mut(&mut self) -> Option<&mut SceneDescriptor> {
        match self {
            SceneSlot::Ready(scene) => Some(&mut **scene),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, SceneSlot::Ready(_))
    }

    pub fn status(&self) -> &'static str {
        match self {
            SceneSlot::Empty => "no scene",
            SceneSlot::Loading(_) => "loading",
            SceneSlot::Ready(_) => "ready",
            SceneSlot::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn wait_for(slot: &mut SceneSlot) {
        let start = Instant::now();
        while !slot.poll() {
            assert!(start.elapsed() < Duration::from_secs(5), "scene load timed out");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_scene(Path::new("/nonexistent/scene.json"));
        assert!(matches!(result, Err(SceneError::Io { .. })));
    }

    #[test]
    fn test_load_invalid_json() {
        let path = temp_file("invalid-scene.json", "{ not json");
        let result = load_scene(&path);
        assert!(matches!(result, Err(SceneError::Parse { .. })));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_background_load_becomes_ready() {
        let path = temp_file("scene.json", r#"{ "island": [ { "name": "a", "audio_trigger": 1.0 } ] }"#);
        let mut slot = SceneSlot::load(path.clone());
        assert!(!slot.is_loaded());

        wait_for(&mut slot);
        assert!(slot.is_loaded());
        assert_eq!(slot.scene().map(|s| s.island.len()), Some(1));
        assert_eq!(slot.status(), "ready");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_background_failure_is_reported() {
        let mut slot = SceneSlot::load(PathBuf::from("/nonexistent/scene.json"));
        wait_for(&mut slot);
        assert!(matches!(slot, SceneSlot::Failed));
        assert!(slot.scene().is_none());
    }

    #[test]
    fn test_empty_slot_never_changes() {
        let mut slot = SceneSlot::default();
        assert!(!slot.poll());
        assert_eq!(slot.status(), "no scene");
    }
}

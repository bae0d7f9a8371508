//! Filesystem store implementation.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use zkserve_core::{ArtifactKind, ModelId, RequestArtifactKind, RequestId, StorageError};

/// Filesystem-backed artifact store rooted at a base directory.
///
/// Cheap to clone; holds only the root path. Concurrency control lives with
/// the callers (the orchestrator serializes writers per model; the ledger
/// holds its own lock over `users.json`).
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Filename of the per-model credit ledger document.
    pub const LEDGER_FILE: &'static str = "users.json";

    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StorageError::io(&root, e))?;
        Ok(Self { root })
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a model's namespace.
    pub fn model_dir(&self, model: &ModelId) -> PathBuf {
        self.root.join(model.as_str())
    }

    /// Path of a per-model artifact.
    pub fn artifact_path(&self, model: &ModelId, kind: ArtifactKind) -> PathBuf {
        self.model_dir(model).join(kind.file_name())
    }

    /// Path of a per-request artifact.
    pub fn request_path(
        &self,
        model: &ModelId,
        request: &RequestId,
        kind: RequestArtifactKind,
    ) -> PathBuf {
        self.model_dir(model)
            .join(kind.dir_name())
            .join(kind.file_name(request))
    }

    /// Path of a model's credit ledger document.
    pub fn ledger_path(&self, model: &ModelId) -> PathBuf {
        self.model_dir(model).join(Self::LEDGER_FILE)
    }

    /// Create the model's directory namespace: the model directory itself
    /// plus the `input/`, `witness/`, and `proof/` subdirectories.
    ///
    /// Idempotent — succeeds without touching anything that already exists.
    pub fn ensure_layout(&self, model: &ModelId) -> Result<(), StorageError> {
        let dir = self.model_dir(model);
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        for kind in RequestArtifactKind::all() {
            let sub = dir.join(kind.dir_name());
            fs::create_dir_all(&sub).map_err(|e| StorageError::io(&sub, e))?;
        }
        Ok(())
    }

    /// Whether a model namespace exists.
    pub fn model_exists(&self, model: &ModelId) -> bool {
        self.model_dir(model).is_dir()
    }

    /// List every model namespace present under the root.
    pub fn list_models(&self) -> Result<Vec<ModelId>, StorageError> {
        let mut out = Vec::new();
        let entries = fs::read_dir(&self.root).map_err(|e| StorageError::io(&self.root, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.root, e))?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    // Directories with unsafe names were not created by this
                    // store; skip them rather than fail the listing.
                    if let Ok(id) = ModelId::new(name) {
                        out.push(id);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Store a per-model artifact. Last-writer-wins.
    pub fn put(
        &self,
        model: &ModelId,
        kind: ArtifactKind,
        bytes: &[u8],
    ) -> Result<(), StorageError> {
        let path = self.artifact_path(model, kind);
        write_atomic(&path, bytes)?;
        tracing::debug!(model = %model, artifact = %kind, len = bytes.len(), "stored artifact");
        Ok(())
    }

    /// Fetch a per-model artifact.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] if the artifact has not been produced yet.
    pub fn get(&self, model: &ModelId, kind: ArtifactKind) -> Result<Vec<u8>, StorageError> {
        read(&self.artifact_path(model, kind))
    }

    /// Whether a per-model artifact exists.
    pub fn exists(&self, model: &ModelId, kind: ArtifactKind) -> bool {
        self.artifact_path(model, kind).is_file()
    }

    /// Store a per-request artifact.
    pub fn put_request(
        &self,
        model: &ModelId,
        request: &RequestId,
        kind: RequestArtifactKind,
        bytes: &[u8],
    ) -> Result<(), StorageError> {
        let path = self.request_path(model, request, kind);
        write_atomic(&path, bytes)?;
        tracing::debug!(
            model = %model,
            request = %request,
            kind = kind.dir_name(),
            len = bytes.len(),
            "stored request artifact"
        );
        Ok(())
    }

    /// Fetch a per-request artifact.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] if the artifact has not been produced yet.
    pub fn get_request(
        &self,
        model: &ModelId,
        request: &RequestId,
        kind: RequestArtifactKind,
    ) -> Result<Vec<u8>, StorageError> {
        read(&self.request_path(model, request, kind))
    }

    /// Whether a per-request artifact exists.
    pub fn request_exists(
        &self,
        model: &ModelId,
        request: &RequestId,
        kind: RequestArtifactKind,
    ) -> bool {
        self.request_path(model, request, kind).is_file()
    }

    /// Read a model's credit ledger document.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] if no ledger document has been written yet.
    pub fn read_ledger(&self, model: &ModelId) -> Result<Vec<u8>, StorageError> {
        read(&self.ledger_path(model))
    }

    /// Durably replace a model's credit ledger document.
    ///
    /// The ledger crate calls this under its per-model lock; the store only
    /// guarantees the replacement itself is atomic.
    pub fn write_ledger(&self, model: &ModelId, bytes: &[u8]) -> Result<(), StorageError> {
        write_atomic(&self.ledger_path(model), bytes)
    }
}

/// Read a file, mapping a missing file to [`StorageError::NotFound`].
fn read(path: &Path) -> Result<Vec<u8>, StorageError> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

/// Write via a sibling temp file and rename, so readers never observe a
/// partially written artifact.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let parent = path
        .parent()
        .ok_or_else(|| StorageError::NotFound {
            path: path.to_path_buf(),
        })?;
    fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;

    // Appended suffix, not a replaced extension: `network.onnx` and
    // `network.compiled` must not share a temp name.
    let mut tmp_name = path
        .file_name()
        .ok_or_else(|| StorageError::NotFound {
            path: path.to_path_buf(),
        })?
        .to_os_string();
    tmp_name.push(".tmp");
    let tmp = parent.join(tmp_name);
    {
        let mut file = fs::File::create(&tmp).map_err(|e| StorageError::io(&tmp, e))?;
        file.write_all(bytes).map_err(|e| StorageError::io(&tmp, e))?;
        file.sync_all().map_err(|e| StorageError::io(&tmp, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, ArtifactStore) {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        (dir, store)
    }

    fn mid(s: &str) -> ModelId {
        ModelId::new(s).unwrap()
    }

    #[test]
    fn ensure_layout_creates_namespace_and_subdirs() {
        let (_dir, store) = store();
        let model = mid("m1");
        store.ensure_layout(&model).unwrap();

        assert!(store.model_exists(&model));
        for kind in RequestArtifactKind::all() {
            assert!(store.model_dir(&model).join(kind.dir_name()).is_dir());
        }
    }

    #[test]
    fn ensure_layout_is_idempotent() {
        let (_dir, store) = store();
        let model = mid("m1");
        store.ensure_layout(&model).unwrap();
        store.ensure_layout(&model).unwrap();
        assert!(store.model_exists(&model));
    }

    #[test]
    fn put_get_roundtrip() {
        let (_dir, store) = store();
        let model = mid("m1");
        store.ensure_layout(&model).unwrap();

        store.put(&model, ArtifactKind::Settings, b"{\"k\":2}").unwrap();
        assert!(store.exists(&model, ArtifactKind::Settings));
        assert_eq!(store.get(&model, ArtifactKind::Settings).unwrap(), b"{\"k\":2}");
    }

    #[test]
    fn get_missing_is_not_found() {
        let (_dir, store) = store();
        let model = mid("m1");
        store.ensure_layout(&model).unwrap();

        let err = store.get(&model, ArtifactKind::Srs).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn put_overwrites_last_writer_wins() {
        let (_dir, store) = store();
        let model = mid("m1");
        store.ensure_layout(&model).unwrap();

        store.put(&model, ArtifactKind::Srs, b"one").unwrap();
        store.put(&model, ArtifactKind::Srs, b"two").unwrap();
        assert_eq!(store.get(&model, ArtifactKind::Srs).unwrap(), b"two");
    }

    #[test]
    fn request_artifacts_keyed_by_uuid() {
        let (_dir, store) = store();
        let model = mid("m1");
        store.ensure_layout(&model).unwrap();

        let r1 = RequestId::generate();
        let r2 = RequestId::generate();
        store
            .put_request(&model, &r1, RequestArtifactKind::Input, b"a")
            .unwrap();
        store
            .put_request(&model, &r2, RequestArtifactKind::Input, b"b")
            .unwrap();

        assert_eq!(
            store.get_request(&model, &r1, RequestArtifactKind::Input).unwrap(),
            b"a"
        );
        assert_eq!(
            store.get_request(&model, &r2, RequestArtifactKind::Input).unwrap(),
            b"b"
        );
        assert!(!store.request_exists(&model, &r1, RequestArtifactKind::Witness));
    }

    #[test]
    fn list_models_returns_created_namespaces() {
        let (_dir, store) = store();
        store.ensure_layout(&mid("alpha")).unwrap();
        store.ensure_layout(&mid("beta")).unwrap();

        let mut names: Vec<_> = store
            .list_models()
            .unwrap()
            .into_iter()
            .map(|m| m.as_str().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn distinct_models_do_not_collide() {
        let (_dir, store) = store();
        let a = mid("a");
        let b = mid("b");
        store.ensure_layout(&a).unwrap();
        store.ensure_layout(&b).unwrap();

        store.put(&a, ArtifactKind::Settings, b"for-a").unwrap();
        assert!(!store.exists(&b, ArtifactKind::Settings));
    }

    #[test]
    fn write_leaves_no_temp_files() {
        let (_dir, store) = store();
        let model = mid("m1");
        store.ensure_layout(&model).unwrap();
        store.put(&model, ArtifactKind::Settings, b"x").unwrap();

        let leftovers: Vec<_> = fs::read_dir(store.model_dir(&model))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}

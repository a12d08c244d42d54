//! Repository directory management.
//!
//! This module handles the file system layout of a repository:
//!
//! ```text
//! <repo_path>/
//! ├─ config.json       # Remotes and branch upstreams
//! ├─ refs.json         # All refs, name -> "<hex>" or "ref: <name>"
//! ├─ refs.lock         # Advisory lock held for every ref write
//! ├─ shallow           # Shallow boundary, one hex id per line
//! └─ objects/
//!    └─ ab/cdef...     # CBOR-encoded objects, fanned out by id prefix
//! ```
//!
//! Objects and `refs.json` are written to a temporary file and renamed into
//! place, so readers never observe a partially written file. Ref updates
//! additionally hold an exclusive lock on `refs.lock` across the
//! read-compare-write sequence, which makes compare-and-set atomic across
//! processes.

use crate::config::RepoConfig;
use crate::error::{StoreError, StoreResult};
use crate::object::Object;
use crate::objects::ObjectStore;
use crate::oid::ObjectId;
use crate::refs::{validate_ref_name, RefStore, RefTarget};
use crate::shallow::ShallowBoundary;
use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const CONFIG_FILE: &str = "config.json";
const REFS_FILE: &str = "refs.json";
const REFS_LOCK: &str = "refs.lock";
const SHALLOW_FILE: &str = "shallow";
const OBJECTS_DIR: &str = "objects";
const SYMBOLIC_PREFIX: &str = "ref: ";

/// Distinguishes temporary files written by concurrent writers in one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Writes `data` to `path` via a temporary sibling and an atomic rename.
fn write_atomic(path: &Path, data: &[u8]) -> StoreResult<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StoreError::corrupted(format!("bad path: {}", path.display())))?;
    let temp_path = path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let mut file = File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Paths of one repository directory.
#[derive(Debug, Clone)]
pub struct RepoDir {
    path: PathBuf,
}

impl RepoDir {
    /// Creates the repository layout at `path`.
    ///
    /// Existing files are left untouched, so initialising twice is harmless.
    pub fn init(path: &Path) -> StoreResult<Self> {
        fs::create_dir_all(path.join(OBJECTS_DIR))?;
        let dir = Self {
            path: path.to_path_buf(),
        };
        if !dir.config_path().exists() {
            dir.save_config(&RepoConfig::default())?;
        }
        if !dir.refs_path().exists() {
            write_atomic(&dir.refs_path(), b"{}")?;
        }
        Ok(dir)
    }

    /// Opens an existing repository directory.
    ///
    /// # Errors
    ///
    /// Returns `NotARepository` if the layout is missing.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let dir = Self {
            path: path.to_path_buf(),
        };
        if !dir.objects_dir().is_dir() || !dir.config_path().is_file() {
            return Err(StoreError::NotARepository(path.to_path_buf()));
        }
        Ok(dir)
    }

    /// Returns the repository directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path to `config.json`.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.path.join(CONFIG_FILE)
    }

    /// Returns the path to `refs.json`.
    #[must_use]
    pub fn refs_path(&self) -> PathBuf {
        self.path.join(REFS_FILE)
    }

    /// Returns the path to the shallow file.
    #[must_use]
    pub fn shallow_path(&self) -> PathBuf {
        self.path.join(SHALLOW_FILE)
    }

    /// Returns the objects directory.
    #[must_use]
    pub fn objects_dir(&self) -> PathBuf {
        self.path.join(OBJECTS_DIR)
    }

    /// Loads `config.json`.
    pub fn load_config(&self) -> StoreResult<RepoConfig> {
        let data = fs::read(self.config_path())?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Saves `config.json` atomically.
    pub fn save_config(&self, config: &RepoConfig) -> StoreResult<()> {
        let data = serde_json::to_vec_pretty(config)?;
        write_atomic(&self.config_path(), &data)
    }

    /// Loads the shallow boundary; a missing file means full history.
    pub fn load_shallow(&self) -> StoreResult<ShallowBoundary> {
        let path = self.shallow_path();
        if !path.exists() {
            return Ok(ShallowBoundary::new());
        }
        ShallowBoundary::parse(&fs::read_to_string(path)?)
    }

    /// Saves the shallow boundary; an empty boundary removes the file.
    pub fn save_shallow(&self, boundary: &ShallowBoundary) -> StoreResult<()> {
        let path = self.shallow_path();
        if boundary.is_empty() {
            if path.exists() {
                fs::remove_file(path)?;
            }
            return Ok(());
        }
        write_atomic(&path, boundary.render().as_bytes())
    }

    /// Returns an object store over this directory.
    #[must_use]
    pub fn object_store(&self) -> FileObjectStore {
        FileObjectStore {
            root: self.objects_dir(),
        }
    }

    /// Returns a ref store over this directory.
    #[must_use]
    pub fn ref_store(&self) -> FileRefStore {
        FileRefStore {
            refs_path: self.refs_path(),
            lock_path: self.path.join(REFS_LOCK),
        }
    }
}

/// Object store keeping one CBOR file per object.
#[derive(Debug, Clone)]
pub struct FileObjectStore {
    root: PathBuf,
}

impl FileObjectStore {
    fn object_path(&self, oid: &ObjectId) -> PathBuf {
        let hex = oid.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..])
    }
}

impl ObjectStore for FileObjectStore {
    fn has(&self, oid: &ObjectId) -> StoreResult<bool> {
        Ok(self.object_path(oid).is_file())
    }

    fn try_get(&self, oid: &ObjectId) -> StoreResult<Option<Object>> {
        let path = self.object_path(oid);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let object = Object::decode(&data)?;
        let actual = object.id()?;
        if actual != *oid {
            return Err(StoreError::corrupted(format!(
                "object {} hashes to {}",
                oid, actual
            )));
        }
        Ok(Some(object))
    }

    fn put_batch(&self, objects: &[Object]) -> StoreResult<Vec<ObjectId>> {
        let mut ids = Vec::with_capacity(objects.len());
        for object in objects {
            let data = object.encode()?;
            let oid = ObjectId::digest(&data);
            let path = self.object_path(&oid);
            if !path.exists() {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                write_atomic(&path, &data)?;
            }
            ids.push(oid);
        }
        debug!(count = ids.len(), root = %self.root.display(), "wrote object batch");
        Ok(ids)
    }

    fn len(&self) -> StoreResult<usize> {
        let mut count = 0;
        for fan in fs::read_dir(&self.root)? {
            let fan = fan?;
            if !fan.file_type()?.is_dir() {
                continue;
            }
            for entry in fs::read_dir(fan.path())? {
                let entry = entry?;
                let is_temp = entry.file_name().to_string_lossy().starts_with('.');
                if entry.file_type()?.is_file() && !is_temp {
                    count += 1;
                }
            }
        }
        Ok(count)
    }
}

/// Ref store keeping all refs in one JSON document.
#[derive(Debug, Clone)]
pub struct FileRefStore {
    refs_path: PathBuf,
    lock_path: PathBuf,
}

/// Exclusive hold on `refs.lock`, released on drop.
struct RefsLock {
    file: File,
}

impl Drop for RefsLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl FileRefStore {
    fn lock(&self) -> StoreResult<RefsLock> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?;
        file.lock_exclusive()?;
        Ok(RefsLock { file })
    }

    fn load(&self) -> StoreResult<BTreeMap<String, RefTarget>> {
        let raw: BTreeMap<String, String> = match fs::read(&self.refs_path) {
            Ok(data) => serde_json::from_slice(&data)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        raw.into_iter()
            .map(|(name, value)| {
                let target = decode_target(&value)?;
                Ok((name, target))
            })
            .collect()
    }

    fn store(&self, refs: &BTreeMap<String, RefTarget>) -> StoreResult<()> {
        let raw: BTreeMap<&str, String> = refs
            .iter()
            .map(|(name, target)| (name.as_str(), target.to_string()))
            .collect();
        let data = serde_json::to_vec_pretty(&raw)?;
        write_atomic(&self.refs_path, &data)
    }
}

fn decode_target(value: &str) -> StoreResult<RefTarget> {
    match value.strip_prefix(SYMBOLIC_PREFIX) {
        Some(target) => Ok(RefTarget::Symbolic(target.to_string())),
        None => Ok(RefTarget::Direct(ObjectId::from_hex(value)?)),
    }
}

impl RefStore for FileRefStore {
    fn resolve(&self, name: &str) -> StoreResult<Option<RefTarget>> {
        Ok(self.load()?.remove(name))
    }

    fn compare_and_set(
        &self,
        name: &str,
        expected: Option<ObjectId>,
        new: ObjectId,
    ) -> StoreResult<bool> {
        validate_ref_name(name)?;
        let _guard = self.lock()?;
        let mut refs = self.load()?;
        let matches = match (refs.get(name), expected) {
            (None, None) => true,
            (Some(current), Some(oid)) => *current == RefTarget::Direct(oid),
            _ => false,
        };
        if !matches {
            debug!(ref_name = name, "ref compare-and-set mismatch");
            return Ok(false);
        }
        refs.insert(name.to_string(), RefTarget::Direct(new));
        self.store(&refs)?;
        Ok(true)
    }

    fn set_symbolic(&self, name: &str, target: &str) -> StoreResult<()> {
        validate_ref_name(name)?;
        validate_ref_name(target)?;
        let _guard = self.lock()?;
        let mut refs = self.load()?;
        refs.insert(name.to_string(), RefTarget::Symbolic(target.to_string()));
        self.store(&refs)
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<(String, RefTarget)>> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .collect())
    }
}

//! Change detection for incremental builds.
//!
//! Every job asks the oracle whether its inputs changed since the last
//! successful build before doing any work. A build with no source changes
//! therefore skips every job and writes nothing.
//!
//! # Design
//!
//! The signal is a superset: false positives cost a redundant rebuild, false
//! negatives would leave stale pages behind. Anything the oracle cannot
//! prove unchanged counts as changed: paths it has never seen, unreadable
//! paths, and every path during a forced build.
//!
//! ## Fingerprints
//!
//! - **Files**: SHA-256 of the contents. Content-based rather than
//!   mtime-based so it survives `git checkout`, which resets modification
//!   times.
//! - **Directories**: SHA-256 of the sorted entry names, so adding or
//!   removing a partial or stylesheet is a change of the directory.
//! - **Absent paths**: an explicit marker. Optional view fragments that do
//!   not exist stay "unchanged" until they appear.
//!
//! Fingerprints observed during a build are memoized, so a path shared by
//! many jobs (the universal sources) is hashed once per build.
//!
//! ## Commit discipline
//!
//! Observations only become the new baseline through
//! [`ChangeOracle::commit`], which the orchestrator calls after a fully
//! successful build. The baseline is replaced, not merged: a path the
//! build did not ask about is forgotten, so a source that disappears and
//! later comes back is seen as new. A failed build calls [`ChangeOracle::discard`]
//! instead, so whatever failed is detected as changed again next time.
//!
//! ## Storage
//!
//! The baseline is a JSON file at `<state_dir>/fingerprints.json`. It is
//! rewritten only when the committed set actually differs.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Name of the fingerprint manifest within the state directory.
const MANIFEST_FILENAME: &str = "fingerprints.json";

/// Version of the manifest format. Bump this to invalidate all existing
/// baselines when the format or fingerprint computation changes.
const MANIFEST_VERSION: u32 = 1;

/// Fingerprint recorded for paths that do not exist.
const ABSENT: &str = "absent";

/// Reports whether sources changed since the last successful build.
pub trait ChangeOracle: Sync {
    /// Whether `path` changed since the last committed build.
    fn changed(&self, path: &Path) -> bool;

    /// Whether any of `paths` changed. Every path is still observed, so all
    /// of them are part of the next baseline.
    fn changed_any(&self, paths: &[PathBuf]) -> bool {
        paths
            .iter()
            .fold(false, |any, path| self.changed(path) || any)
    }

    /// Start a build. A forced build reports every path as changed.
    fn begin(&mut self, forced: bool);

    /// Make this build's observations the new baseline. Returns whether
    /// anything was persisted.
    fn commit(&mut self) -> io::Result<bool>;

    /// Forget this build's observations.
    fn discard(&mut self);

    /// Whether no baseline existed when the oracle was created.
    fn is_fresh(&self) -> bool;
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Manifest {
    version: u32,
    fingerprints: BTreeMap<String, String>,
}

/// [`ChangeOracle`] backed by SHA-256 fingerprints persisted in the state
/// directory.
#[derive(Debug)]
pub struct FingerprintOracle {
    state_dir: PathBuf,
    committed: BTreeMap<String, String>,
    observed: Mutex<HashMap<String, String>>,
    forced: bool,
    fresh: bool,
}

impl FingerprintOracle {
    /// Oracle with no baseline (first build, or `--force` without history).
    pub fn empty(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            committed: BTreeMap::new(),
            observed: Mutex::new(HashMap::new()),
            forced: false,
            fresh: true,
        }
    }

    /// Load the baseline from the state directory. Returns an empty oracle
    /// if the manifest doesn't exist or can't be parsed (version mismatch,
    /// corruption).
    pub fn load(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        let path = state_dir.join(MANIFEST_FILENAME);
        let manifest = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<Manifest>(&content).ok())
            .filter(|m| m.version == MANIFEST_VERSION);
        match manifest {
            Some(m) => Self {
                committed: m.fingerprints,
                fresh: false,
                ..Self::empty(state_dir)
            },
            None => Self::empty(state_dir),
        }
    }

    /// Number of paths in the committed baseline.
    pub fn committed_len(&self) -> usize {
        self.committed.len()
    }

    fn observe(&self, path: &Path) -> String {
        let key = path_key(path);
        if let Some(print) = self.lock_observed().get(&key) {
            return print.clone();
        }
        // Hash without holding the lock; a racing job hashing the same
        // path yields the same value, the first insert wins.
        let print = fingerprint(path).unwrap_or_default();
        self.lock_observed().entry(key).or_insert(print).clone()
    }

    fn lock_observed(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.observed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn save(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.state_dir)?;
        let manifest = Manifest {
            version: MANIFEST_VERSION,
            fingerprints: self.committed.clone(),
        };
        let json = serde_json::to_string_pretty(&manifest)?;
        std::fs::write(self.state_dir.join(MANIFEST_FILENAME), json)
    }
}

impl ChangeOracle for FingerprintOracle {
    fn changed(&self, path: &Path) -> bool {
        let current = self.observe(path);
        if self.forced || current.is_empty() {
            return true;
        }
        self.committed.get(&path_key(path)) != Some(&current)
    }

    fn begin(&mut self, forced: bool) {
        self.forced = forced;
        self.observed
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn commit(&mut self) -> io::Result<bool> {
        let observed = std::mem::take(
            self.observed
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner),
        );
        // A successful build observes every live dependency, so the
        // observations replace the baseline. Paths no longer depended on
        // (deleted sources, removed stylesheets) drop out, and unreadable
        // paths stay out so they are rebuilt until they can be read.
        let baseline: BTreeMap<String, String> = observed
            .into_iter()
            .filter(|(_, print)| !print.is_empty())
            .collect();
        let dirty = baseline != self.committed;
        self.committed = baseline;
        self.fresh = false;
        if dirty {
            self.save()?;
        }
        Ok(dirty)
    }

    fn discard(&mut self) {
        self.observed
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn is_fresh(&self) -> bool {
        self.fresh
    }
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Fingerprint a path. `Err` means the path exists but could not be read.
pub fn fingerprint(path: &Path) -> io::Result<String> {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ABSENT.to_string()),
        Err(e) => return Err(e),
    };
    if meta.is_dir() {
        hash_dir_listing(path)
    } else {
        hash_file(path)
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(b"file\0");
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-256 hash of a directory's sorted entry names.
pub fn hash_dir_listing(path: &Path) -> io::Result<String> {
    let mut names = std::fs::read_dir(path)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<io::Result<Vec<_>>>()?;
    names.sort();
    let mut hasher = Sha256::new();
    hasher.update(b"dir\0");
    for name in names {
        hasher.update(name.as_bytes());
        hasher.update(b"\0");
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Oracle that reports everything as changed and never persists anything.
#[derive(Debug, Default)]
pub struct AlwaysChanged;

impl ChangeOracle for AlwaysChanged {
    fn changed(&self, _path: &Path) -> bool {
        true
    }

    fn begin(&mut self, _forced: bool) {}

    fn commit(&mut self) -> io::Result<bool> {
        Ok(false)
    }

    fn discard(&mut self) {}

    fn is_fresh(&self) -> bool {
        true
    }
}

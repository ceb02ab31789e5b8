//! Job state storage

use crate::error::{ReconError, Result};
use crate::job::{JobId, JobRecord, JobState};
use std::collections::HashMap;
use fd_lock::RwLock as FileLock;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use walkdir::WalkDir;

/// Shared job state.
///
/// Writers change a job only through `compare_and_swap`, so each transition
/// is applied at most once even with many workers.
pub trait JobStore: Send + Sync {
    /// Store a new job. Fails if the id already exists.
    fn insert(&self, record: JobRecord) -> Result<()>;

    fn get(&self, id: &JobId) -> Result<Option<JobRecord>>;

    /// Replace the job with `next` if it is currently in `expected`.
    /// Returns false when the job is missing or in another state.
    fn compare_and_swap(&self, id: &JobId, expected: JobState, next: JobRecord) -> Result<bool>;

    /// Delete the job if it is currently in `expected`
    fn remove_if(&self, id: &JobId, expected: JobState) -> Result<bool>;

    /// All jobs, oldest submission first
    fn list(&self) -> Result<Vec<JobRecord>>;
}

fn check_transition(current: &JobRecord, expected: JobState, next: &JobRecord) -> Result<bool> {
    if current.state != expected {
        return Ok(false);
    }
    if !expected.can_transition_to(next.state) {
        return Err(ReconError::internal(format!(
            "illegal job transition {} -> {} for {}",
            expected, next.state, current.id
        )));
    }
    Ok(true)
}

fn poisoned<T>(_: T) -> ReconError {
    ReconError::internal("job store lock poisoned")
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryJobStore {
    fn insert(&self, record: JobRecord) -> Result<()> {
        let mut jobs = self.jobs.write().map_err(poisoned)?;
        if jobs.contains_key(&record.id) {
            return Err(ReconError::internal(format!("duplicate job id {}", record.id)));
        }
        jobs.insert(record.id, record);
        Ok(())
    }

    fn get(&self, id: &JobId) -> Result<Option<JobRecord>> {
        Ok(self.jobs.read().map_err(poisoned)?.get(id).cloned())
    }

    fn compare_and_swap(&self, id: &JobId, expected: JobState, next: JobRecord) -> Result<bool> {
        let mut jobs = self.jobs.write().map_err(poisoned)?;
        match jobs.get_mut(id) {
            Some(current) if check_transition(current, expected, &next)? => {
                *current = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn remove_if(&self, id: &JobId, expected: JobState) -> Result<bool> {
        let mut jobs = self.jobs.write().map_err(poisoned)?;
        let matches = jobs.get(id).map_or(false, |r| r.state == expected);
        if matches {
            jobs.remove(id);
        }
        Ok(matches)
    }

    fn list(&self) -> Result<Vec<JobRecord>> {
        let mut records: Vec<JobRecord> = self.jobs.read().map_err(poisoned)?.values().cloned().collect();
        records.sort_by_key(|r| r.submitted_at);
        Ok(records)
    }
}

/// Store keeping one JSON file per job, shared between processes.
///
/// Files are replaced by atomic rename, so readers never observe a partial
/// record. Every mutation holds an exclusive advisory lock on
/// `jobs/.lock`, which serializes writers across threads and processes.
#[derive(Debug)]
pub struct FileJobStore {
    /// Store root (holds `config.json` and `jobs/`)
    pub root: PathBuf,
    /// Directory of job files
    pub jobs_dir: PathBuf,
    lock_path: PathBuf,
}

impl FileJobStore {
    /// Open the store at `root`, creating its directories if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::from_root(root.into());
        fs::create_dir_all(&store.jobs_dir)?;
        log::debug!("Opened job store at: {}", store.root.display());
        Ok(store)
    }

    /// Describe the store layout without touching the filesystem
    pub fn from_root(root: PathBuf) -> Self {
        let jobs_dir = root.join("jobs");
        let lock_path = jobs_dir.join(".lock");
        Self {
            root,
            jobs_dir,
            lock_path,
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn job_path(&self, id: &JobId) -> PathBuf {
        self.jobs_dir.join(format!("{}.json", id))
    }

    fn read(&self, path: &Path) -> Result<Option<JobRecord>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Run `f` while holding the store-wide write lock
    fn exclusive<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;
        let mut lock = FileLock::new(file);
        let _held = lock.write()?;
        f()
    }

    fn write(&self, record: &JobRecord) -> Result<()> {
        let path = self.job_path(&record.id);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_string_pretty(record)?)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

impl JobStore for FileJobStore {
    fn insert(&self, record: JobRecord) -> Result<()> {
        self.exclusive(|| {
            if self.job_path(&record.id).exists() {
                return Err(ReconError::internal(format!("duplicate job id {}", record.id)));
            }
            self.write(&record)
        })
    }

    fn get(&self, id: &JobId) -> Result<Option<JobRecord>> {
        self.read(&self.job_path(id))
    }

    fn compare_and_swap(&self, id: &JobId, expected: JobState, next: JobRecord) -> Result<bool> {
        self.exclusive(|| match self.read(&self.job_path(id))? {
            Some(current) if check_transition(&current, expected, &next)? => {
                self.write(&next)?;
                Ok(true)
            }
            _ => Ok(false),
        })
    }

    fn remove_if(&self, id: &JobId, expected: JobState) -> Result<bool> {
        self.exclusive(|| {
            let path = self.job_path(id);
            match self.read(&path)? {
                Some(current) if current.state == expected => {
                    fs::remove_file(path)?;
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    fn list(&self) -> Result<Vec<JobRecord>> {
        let mut records = Vec::new();

        if !self.jobs_dir.exists() {
            return Ok(records);
        }

        for entry in WalkDir::new(&self.jobs_dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| ReconError::internal(format!("cannot list jobs: {}", e)))?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            match self.read(path) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping unreadable job file {}: {}", path.display(), e),
            }
        }

        records.sort_by_key(|r| r.submitted_at);
        Ok(records)
    }
}

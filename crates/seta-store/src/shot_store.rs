//! The file-backed shot store.
//!
//! # Write path
//!
//! 1. Lock the partition cursor (one async mutex per shooter/race).
//! 2. On first use, remove temp files left by interrupted writes and
//!    recover the newest timestamp already on disk.
//! 3. Create missing directories, syncing each new entry's parent.
//! 4. Allocate `max(now, last + 1us)` at microsecond precision.
//! 5. Write the record to a hidden temp file, flush it, rename it into
//!    place, then flush the directory.
//!
//! Readers skip hidden files, so a record is either fully present or not
//! visible at all. Timestamps are strictly increasing within a partition,
//! so they double as file names and never collide.

use std::collections::{BTreeSet, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDateTime, SubsecRound, Utc};
use seta_types::{PartitionKey, RaceId, ShooterId, ShotData, StoredShot};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StoreError;

/// File name layout of a stored shot, without the extension. Fixed width,
/// so lexicographic order equals chronological order.
const FILE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S%.6fZ";

/// Extension of committed shot files.
const SHOT_EXTENSION: &str = ".json";

/// Prefix of in-flight temp files. Hidden from every listing.
const TEMP_PREFIX: &str = ".tmp-";

/// How many successive timestamps to try before giving up on a partition.
const MAX_ALLOCATION_ATTEMPTS: u32 = 16;

/// Allocation state for one partition.
#[derive(Debug, Default)]
struct PartitionCursor {
    /// Timestamp of the newest shot in the partition.
    last: Option<DateTime<Utc>>,
    /// Whether `last` has been loaded from disk yet.
    recovered: bool,
}

/// Append-only shot storage rooted at a data directory.
///
/// Cheap to share behind an [`Arc`]; all methods take `&self`.
#[derive(Debug)]
pub struct ShotStore {
    root: PathBuf,
    fsync: bool,
    cursors: Mutex<HashMap<PartitionKey, Arc<Mutex<PartitionCursor>>>>,
}

impl ShotStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// the first append.
    ///
    /// With `fsync` off, a write is confirmed once the rename lands, which
    /// survives a process crash but not a power loss.
    pub fn new(root: impl Into<PathBuf>, fsync: bool) -> Self {
        Self {
            root: root.into(),
            fsync,
            cursors: Mutex::new(HashMap::new()),
        }
    }

    /// The data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Durably append a shot to its partition.
    ///
    /// Returns the stored record including the assigned timestamp. The shot
    /// is visible to readers only once this returns `Ok`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Validation`] if a coordinate is not finite
    /// - [`StoreError::StorageUnavailable`] if any filesystem step fails
    /// - [`StoreError::Conflict`] if no free timestamp could be allocated
    pub async fn append(
        &self,
        key: &PartitionKey,
        shot_data: ShotData,
    ) -> Result<StoredShot, StoreError> {
        shot_data.validate()?;

        let cursor = self.cursor(key).await;
        let mut cursor = cursor.lock().await;
        let dir = self.partition_dir(key);

        if !cursor.recovered {
            sweep_temp_files(&dir).await?;
            cursor.last = latest_on_disk(&dir).await?;
            cursor.recovered = true;
        }

        self.create_partition_dir(&dir).await?;

        let (timestamp, path) = allocate(key, &dir, cursor.last).await?;

        let shot = StoredShot {
            shooter_id: key.shooter.clone(),
            race_id: key.race.clone(),
            timestamp,
            shot_data,
        };
        let bytes = serde_json::to_vec_pretty(&shot)?;
        self.commit(&dir, &path, &bytes).await?;

        cursor.last = Some(timestamp);
        debug!(partition = %key, %timestamp, "Shot stored");

        Ok(shot)
    }

    /// All shooters with at least one stored shot, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StorageUnavailable`] if the data directory
    /// cannot be read. A missing data directory yields an empty list.
    pub async fn list_shooters(&self) -> Result<Vec<ShooterId>, StoreError> {
        let mut shooters = BTreeSet::new();
        for name in subdirectories(&self.root).await? {
            let Ok(shooter) = ShooterId::parse(name) else {
                continue;
            };
            if !self.list_races(&shooter).await?.is_empty() {
                shooters.insert(shooter);
            }
        }
        Ok(shooters.into_iter().collect())
    }

    /// All races of `shooter` with at least one stored shot, sorted.
    /// Unknown shooters yield an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StorageUnavailable`] on I/O failure.
    pub async fn list_races(&self, shooter: &ShooterId) -> Result<Vec<RaceId>, StoreError> {
        let shooter_dir = self.root.join(shooter.as_str());
        let mut races = BTreeSet::new();
        for name in subdirectories(&shooter_dir).await? {
            let Ok(race) = RaceId::parse(name) else {
                continue;
            };
            if !shot_files(&shooter_dir.join(race.as_str())).await?.is_empty() {
                races.insert(race);
            }
        }
        Ok(races.into_iter().collect())
    }

    /// All shots in a partition, oldest first. Unknown partitions yield an
    /// empty list.
    ///
    /// Records that fail to parse are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StorageUnavailable`] on I/O failure.
    pub async fn list_shots(&self, key: &PartitionKey) -> Result<Vec<StoredShot>, StoreError> {
        let dir = self.partition_dir(key);
        let mut shots = Vec::new();

        for name in shot_files(&dir).await? {
            let path = dir.join(&name);
            let contents = match fs::read(&path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StoreError::io("read shot", &path, e)),
            };
            match serde_json::from_slice::<StoredShot>(&contents) {
                Ok(shot) if shot.shooter_id == key.shooter && shot.race_id == key.race => {
                    shots.push(shot);
                }
                Ok(_) => {
                    warn!(path = %path.display(), "Shot record belongs to another partition, skipping");
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unreadable shot record, skipping");
                }
            }
        }

        shots.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(shots)
    }

    fn partition_dir(&self, key: &PartitionKey) -> PathBuf {
        self.root.join(key.shooter.as_str()).join(key.race.as_str())
    }

    async fn cursor(&self, key: &PartitionKey) -> Arc<Mutex<PartitionCursor>> {
        let mut cursors = self.cursors.lock().await;
        Arc::clone(cursors.entry(key.clone()).or_default())
    }

    /// Create the partition directory and any missing ancestors. With
    /// `fsync` on, the parent of every newly created directory is synced so
    /// the new entries survive a power loss.
    async fn create_partition_dir(&self, dir: &Path) -> Result<(), StoreError> {
        let missing = if self.fsync {
            missing_dirs(dir).await?
        } else {
            Vec::new()
        };

        fs::create_dir_all(dir)
            .await
            .map_err(|e| StoreError::io("create partition", dir, e))?;

        // Outermost first, so each parent already exists when synced.
        for created in missing.iter().rev() {
            sync_dir(parent_dir(created)).await?;
        }
        Ok(())
    }

    /// Land `bytes` at `path` atomically via a temp file and rename.
    async fn commit(&self, dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let temp = dir.join(format!("{TEMP_PREFIX}{}{SHOT_EXTENSION}", Uuid::new_v4()));

        if let Err(e) = self.write_temp(&temp, bytes).await {
            discard(&temp).await;
            return Err(e);
        }
        if let Err(e) = fs::rename(&temp, path).await {
            discard(&temp).await;
            return Err(StoreError::io("commit shot", path, e));
        }

        if self.fsync {
            if let Err(e) = sync_dir(dir).await {
                // Not confirmed durable, so it must not stay visible.
                discard(path).await;
                return Err(e);
            }
        }
        Ok(())
    }

    async fn write_temp(&self, temp: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let mut file = fs::File::create(temp)
            .await
            .map_err(|e| StoreError::io("create temp file", temp, e))?;
        file.write_all(bytes)
            .await
            .map_err(|e| StoreError::io("write shot", temp, e))?;
        if self.fsync {
            file.sync_all()
                .await
                .map_err(|e| StoreError::io("sync shot", temp, e))?;
        } else {
            file.flush()
                .await
                .map_err(|e| StoreError::io("flush shot", temp, e))?;
        }
        Ok(())
    }
}

/// Next timestamp for a partition: now, or one microsecond past the last
/// allocation if the clock has not moved past it.
fn next_timestamp(now: DateTime<Utc>, last: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    let now = now.trunc_subsecs(6);
    match last {
        Some(last) if now <= last => last.checked_add_signed(Duration::microseconds(1)),
        _ => Some(now),
    }
}

/// Pick a timestamp whose file does not exist yet.
async fn allocate(
    key: &PartitionKey,
    dir: &Path,
    last: Option<DateTime<Utc>>,
) -> Result<(DateTime<Utc>, PathBuf), StoreError> {
    let conflict = || StoreError::Conflict {
        partition: key.to_string(),
    };

    let mut candidate = next_timestamp(Utc::now(), last).ok_or_else(conflict)?;
    for _ in 0..MAX_ALLOCATION_ATTEMPTS {
        let path = dir.join(file_name(candidate));
        let taken = fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::io("check shot file", &path, e))?;
        if !taken {
            return Ok((candidate, path));
        }
        warn!(partition = %key, timestamp = %candidate, "Timestamp already taken, advancing");
        candidate = next_timestamp(candidate, Some(candidate)).ok_or_else(conflict)?;
    }
    Err(conflict())
}

fn file_name(timestamp: DateTime<Utc>) -> String {
    format!("{}{SHOT_EXTENSION}", timestamp.format(FILE_TIME_FORMAT))
}

fn parse_file_name(name: &str) -> Option<DateTime<Utc>> {
    let stem = name.strip_suffix(SHOT_EXTENSION)?;
    NaiveDateTime::parse_from_str(stem, FILE_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn is_shot_file(name: &str) -> bool {
    !name.starts_with('.') && name.ends_with(SHOT_EXTENSION)
}

/// Committed shot file names in `dir`, sorted. Missing directory is empty.
async fn shot_files(dir: &Path) -> Result<Vec<String>, StoreError> {
    let mut names: Vec<String> = list_dir(dir, false)
        .await?
        .into_iter()
        .filter(|name| is_shot_file(name))
        .collect();
    names.sort();
    Ok(names)
}

/// Names of the sub-directories of `dir`. Missing directory is empty.
async fn subdirectories(dir: &Path) -> Result<Vec<String>, StoreError> {
    list_dir(dir, true).await
}

async fn list_dir(dir: &Path, want_dirs: bool) -> Result<Vec<String>, StoreError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io("list directory", dir, e)),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StoreError::io("list directory", dir, e))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| StoreError::io("stat entry", entry.path(), e))?;
        if file_type.is_dir() != want_dirs {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    Ok(names)
}

/// `dir` and those of its ancestors that do not exist yet, innermost first.
async fn missing_dirs(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut missing = Vec::new();
    let mut next = Some(dir);
    while let Some(path) = next {
        if path.as_os_str().is_empty() {
            break;
        }
        let exists = fs::try_exists(path)
            .await
            .map_err(|e| StoreError::io("check directory", path, e))?;
        if exists {
            break;
        }
        missing.push(path.to_path_buf());
        next = path.parent();
    }
    Ok(missing)
}

/// Parent directory of `path`, with `.` for a bare relative name.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Remove temp files left behind by writes that never reached the rename.
/// Only called with the partition's cursor held, so no live write owns
/// them.
async fn sweep_temp_files(dir: &Path) -> Result<(), StoreError> {
    for name in list_dir(dir, false).await? {
        if !name.starts_with(TEMP_PREFIX) {
            continue;
        }
        let path = dir.join(&name);
        match fs::remove_file(&path).await {
            Ok(()) => warn!(path = %path.display(), "Removed stale temp file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io("remove temp file", &path, e)),
        }
    }
    Ok(())
}

/// Newest timestamp already committed in `dir`.
async fn latest_on_disk(dir: &Path) -> Result<Option<DateTime<Utc>>, StoreError> {
    Ok(shot_files(dir)
        .await?
        .iter()
        .rev()
        .find_map(|name| parse_file_name(name)))
}

#[cfg(unix)]
async fn sync_dir(dir: &Path) -> Result<(), StoreError> {
    let handle = fs::File::open(dir)
        .await
        .map_err(|e| StoreError::io("open directory", dir, e))?;
    handle
        .sync_all()
        .await
        .map_err(|e| StoreError::io("sync directory", dir, e))
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> Result<(), StoreError> {
    Ok(())
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        debug!(path = %path.display(), error = %e, "Failed to remove uncommitted file");
    }
}

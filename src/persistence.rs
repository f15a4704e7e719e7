// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Durable state: the snapshot file, the content tree, rotating backups,
//! and zip archives of the whole data directory.
//!
//! ```text
//! <data>/state.json
//! <data>/content/<kind>/<id>/...
//! <data>/backups/state_backup_<stamp>.json
//! <data>/backups/content_backup_<stamp>/
//! <data>/backups/manual_backup_<stamp>.zip
//! ```

use std::fs::File;
use std::fs::copy;
use std::fs::create_dir_all;
use std::fs::read_to_string;
use std::fs::remove_dir_all;
use std::fs::remove_file;
use std::fs::rename;
use std::fs::write;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::content_tree::ContentTree;
use crate::error::Fallible;
use crate::snapshot::Snapshot;
use crate::types::source::Source;
use crate::types::timestamp::Timestamp;

const STATE_FILE: &str = "state.json";
const STATE_TEMP_FILE: &str = "state.json.tmp";
const CONTENT_DIR: &str = "content";
const BACKUPS_DIR: &str = "backups";

const STATE_BACKUP: BackupKind = BackupKind {
    prefix: "state_backup_",
    extension: ".json",
};

const CONTENT_BACKUP: BackupKind = BackupKind {
    prefix: "content_backup_",
    extension: "",
};

const ARCHIVE_BACKUP: BackupKind = BackupKind {
    prefix: "manual_backup_",
    extension: ".zip",
};

/// A family of backup names: `<prefix><stamp>[_<n>]<extension>`.
#[derive(Clone, Copy)]
struct BackupKind {
    prefix: &'static str,
    extension: &'static str,
}

impl BackupKind {
    fn name(self, stamp: &str, sequence: u32) -> String {
        if sequence == 0 {
            format!("{}{stamp}{}", self.prefix, self.extension)
        } else {
            format!("{}{stamp}_{sequence}{}", self.prefix, self.extension)
        }
    }

    /// The path for a new backup in `dir`. Backups taken within the same
    /// second get increasing sequence numbers, so a new backup always sorts
    /// after the existing ones.
    fn fresh_path(self, dir: &Path, now: Timestamp) -> Fallible<PathBuf> {
        let stamp = now.compact();
        let mut next = None;
        for entry in dir.read_dir()? {
            let name = entry?.file_name().to_string_lossy().to_string();
            if let Some((existing, sequence)) = self.parse(&name) {
                if existing == stamp {
                    next = Some(next.map_or(sequence + 1, |n: u32| n.max(sequence + 1)));
                }
            }
        }
        Ok(dir.join(self.name(&stamp, next.unwrap_or(0))))
    }

    /// The `(stamp, sequence)` ordering key of a backup name, or `None` if
    /// the name is not one of ours.
    fn parse(self, name: &str) -> Option<(String, u32)> {
        let rest = name.strip_prefix(self.prefix)?;
        let rest = rest.strip_suffix(self.extension)?;
        let (stamp, sequence) = match rest.get(15..) {
            Some("") => (rest, 0),
            Some(suffix) => (&rest[..15], suffix.strip_prefix('_')?.parse().ok()?),
            None => return None,
        };
        let valid = stamp.len() == 15
            && stamp.char_indices().all(|(i, c)| {
                if i == 8 {
                    c == '_'
                } else {
                    c.is_ascii_digit()
                }
            });
        if valid {
            Some((stamp.to_string(), sequence))
        } else {
            None
        }
    }
}

/// A snapshot read back from disk, with payloads reattached.
pub struct LoadedState {
    pub snapshot: Snapshot,
    pub sources: Vec<Source>,
}

pub struct PersistenceManager {
    data_dir: PathBuf,
    retention: usize,
}

impl PersistenceManager {
    pub fn new(data_dir: PathBuf, retention: usize) -> Self {
        Self {
            data_dir,
            retention,
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join(STATE_FILE)
    }

    pub fn content_dir(&self) -> PathBuf {
        self.data_dir.join(CONTENT_DIR)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.data_dir.join(BACKUPS_DIR)
    }

    pub fn content_tree(&self) -> ContentTree {
        ContentTree::new(self.content_dir())
    }

    /// Back up the previous state, write the new snapshot and every
    /// source's files, then prune old backups.
    pub fn save_state(&self, snapshot: &Snapshot, sources: &[Source]) -> Fallible<()> {
        let start = std::time::Instant::now();
        create_dir_all(&self.data_dir)?;
        let state_path = self.state_path();
        if state_path.exists() {
            self.backup_previous(snapshot.saved_at)?;
        }

        let temp_path = self.data_dir.join(STATE_TEMP_FILE);
        write(&temp_path, snapshot.to_json()?)?;
        rename(&temp_path, &state_path)?;

        let tree = self.content_tree();
        for source in sources {
            tree.write_source(source)?;
        }

        self.prune(STATE_BACKUP)?;
        self.prune(CONTENT_BACKUP)?;
        let duration = start.elapsed().as_millis();
        log::info!(
            "Saved {} units and {} sources in {duration}ms.",
            snapshot.units.len(),
            sources.len()
        );
        Ok(())
    }

    fn backup_previous(&self, now: Timestamp) -> Fallible<()> {
        let backups = self.backups_dir();
        create_dir_all(&backups)?;
        let state_backup = STATE_BACKUP.fresh_path(&backups, now)?;
        copy(self.state_path(), &state_backup)?;
        log::debug!("Backed up state to {}", state_backup.display());
        let content = self.content_dir();
        if content.exists() {
            let content_backup = CONTENT_BACKUP.fresh_path(&backups, now)?;
            copy_tree(&content, &content_backup)?;
            log::debug!("Backed up content to {}", content_backup.display());
        }
        Ok(())
    }

    /// Backups of a kind, oldest first.
    fn list(&self, kind: BackupKind) -> Fallible<Vec<PathBuf>> {
        let dir = self.backups_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut found = Vec::new();
        for entry in dir.read_dir()? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(key) = kind.parse(&name) {
                found.push((key, entry.path()));
            }
        }
        found.sort();
        Ok(found.into_iter().map(|(_, path)| path).collect())
    }

    fn prune(&self, kind: BackupKind) -> Fallible<()> {
        let backups = self.list(kind)?;
        let excess = backups.len().saturating_sub(self.retention);
        for path in backups.into_iter().take(excess) {
            log::debug!("Pruning backup {}", path.display());
            if path.is_dir() {
                remove_dir_all(&path)?;
            } else {
                remove_file(&path)?;
            }
        }
        Ok(())
    }

    pub fn state_backups(&self) -> Fallible<Vec<PathBuf>> {
        self.list(STATE_BACKUP)
    }

    pub fn content_backups(&self) -> Fallible<Vec<PathBuf>> {
        self.list(CONTENT_BACKUP)
    }

    pub fn archive_backups(&self) -> Fallible<Vec<PathBuf>> {
        self.list(ARCHIVE_BACKUP)
    }

    /// Read the snapshot and reattach payloads. `None` if nothing has been
    /// saved yet.
    pub fn load_state(&self) -> Fallible<Option<LoadedState>> {
        let state_path = self.state_path();
        if !state_path.exists() {
            log::debug!("No saved state in {}.", self.data_dir.display());
            return Ok(None);
        }
        let snapshot = Snapshot::from_json(&read_to_string(&state_path)?)?;
        let tree = self.content_tree();
        let sources = snapshot
            .sources
            .iter()
            .cloned()
            .map(|record| tree.load_source(record))
            .collect::<Fallible<Vec<Source>>>()?;
        log::debug!(
            "Loaded {} units and {} sources.",
            snapshot.units.len(),
            sources.len()
        );
        Ok(Some(LoadedState { snapshot, sources }))
    }

    /// Zip the snapshot and the content tree, with paths relative to the
    /// data directory.
    pub fn create_archive_backup(&self, now: Timestamp) -> Fallible<PathBuf> {
        let backups = self.backups_dir();
        create_dir_all(&backups)?;
        let path = ARCHIVE_BACKUP.fresh_path(&backups, now)?;
        let mut zip = ZipWriter::new(File::create(&path)?);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut count = 0;

        let state_path = self.state_path();
        if state_path.exists() {
            zip.start_file(STATE_FILE, options)?;
            zip.write_all(&std::fs::read(&state_path)?)?;
            count += 1;
        }
        let content = self.content_dir();
        if content.exists() {
            for entry in WalkDir::new(&content).sort_by_file_name() {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative = entry.path().strip_prefix(&self.data_dir)?;
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                zip.start_file(name, options)?;
                let mut bytes = Vec::new();
                File::open(entry.path())?.read_to_end(&mut bytes)?;
                zip.write_all(&bytes)?;
                count += 1;
            }
        }
        zip.finish()?;
        log::info!("Wrote {count} files to {}", path.display());
        Ok(path)
    }

    /// Replace the snapshot and content tree with the contents of an
    /// archive. The archive is opened before anything is deleted, but the
    /// extraction itself is not atomic.
    pub fn restore_from_archive(&self, archive_path: &Path) -> Fallible<()> {
        let mut zip = ZipArchive::new(File::open(archive_path)?)?;

        let state_path = self.state_path();
        if state_path.exists() {
            remove_file(&state_path)?;
        }
        let content = self.content_dir();
        if content.exists() {
            remove_dir_all(&content)?;
        }

        let mut count = 0;
        for index in 0..zip.len() {
            let mut file = zip.by_index(index)?;
            let Some(relative) = file.enclosed_name() else {
                log::warn!("Skipping unsafe archive entry {}", file.name());
                continue;
            };
            let target = self.data_dir.join(relative);
            if file.is_dir() {
                create_dir_all(&target)?;
                continue;
            }
            if let Some(parent) = target.parent() {
                create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            std::io::copy(&mut file, &mut out)?;
            count += 1;
        }
        log::info!(
            "Restored {count} files from {}",
            archive_path.display()
        );
        Ok(())
    }
}

fn copy_tree(from: &Path, to: &Path) -> Fallible<()> {
    for entry in WalkDir::new(from) {
        let entry = entry?;
        let target = to.join(entry.path().strip_prefix(from)?);
        if entry.file_type().is_dir() {
            create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                create_dir_all(parent)?;
            }
            copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::activity::ActivityTracker;
    use crate::error::ErrorKind;
    use crate::scheduler::Scheduler;
    use crate::store::ContentStore;
    use crate::types::response::Response;
    use crate::types::source::Progress;
    use crate::types::source::SourceContent;
    use crate::types::source::SourceStatus;
    use crate::types::source_id::SourceId;

    fn sample_state(now: Timestamp) -> Fallible<(Snapshot, Vec<Source>)> {
        let mut store = ContentStore::new();
        let mut scheduler = Scheduler::new();
        let mut activity = ActivityTracker::new();
        store.add_content("猫が好きです。犬も好きです。", Some("pets"), now);
        let id = store.units()[1].id;
        scheduler.record_response(&mut store, id, Response::Good, now)?;
        activity.record_review(now);
        let sources = vec![Source {
            id: SourceId::random(),
            name: "pets".to_string(),
            created_at: now,
            progress: Progress::default(),
            status: SourceStatus::Active,
            content: SourceContent::Text {
                text: Some("猫が好きです。犬も好きです。".to_string()),
            },
        }];
        let snapshot = Snapshot::capture(&store, &sources, &scheduler, &activity, now);
        Ok((snapshot, sources))
    }

    #[test]
    fn test_load_without_state() -> Fallible<()> {
        let dir = tempdir()?;
        let manager = PersistenceManager::new(dir.path().to_path_buf(), 5);
        assert!(manager.load_state()?.is_none());
        Ok(())
    }

    #[test]
    fn test_save_and_load() -> Fallible<()> {
        let dir = tempdir()?;
        let manager = PersistenceManager::new(dir.path().to_path_buf(), 5);
        let (snapshot, sources) = sample_state(Timestamp::now())?;
        manager.save_state(&snapshot, &sources)?;
        // First save has nothing to back up.
        assert!(manager.state_backups()?.is_empty());
        let loaded = manager.load_state()?;
        let Some(loaded) = loaded else {
            panic!("state was not saved");
        };
        assert_eq!(loaded.snapshot, snapshot);
        assert_eq!(loaded.sources, sources);
        Ok(())
    }

    #[test]
    fn test_retention() -> Fallible<()> {
        let dir = tempdir()?;
        let retention = 3;
        let manager = PersistenceManager::new(dir.path().to_path_buf(), retention);
        let (snapshot, sources) = sample_state(Timestamp::now())?;
        let mut names = Vec::new();
        // The first save creates no backup, so N + 4 saves make N + 3 backups.
        for _ in 0..retention + 4 {
            manager.save_state(&snapshot, &sources)?;
            if let Some(newest) = manager.state_backups()?.last() {
                names.push(newest.clone());
            }
        }
        let kept = manager.state_backups()?;
        assert_eq!(kept.len(), retention);
        names.dedup();
        assert_eq!(kept, names[names.len() - retention..].to_vec());
        assert_eq!(manager.content_backups()?.len(), retention);
        Ok(())
    }

    #[test]
    fn test_backup_name_ordering() {
        let a = STATE_BACKUP.parse("state_backup_20250101_120000.json");
        let b = STATE_BACKUP.parse("state_backup_20250101_120000_2.json");
        let c = STATE_BACKUP.parse("state_backup_20250101_120000_10.json");
        let d = STATE_BACKUP.parse("state_backup_20250102_000000.json");
        assert!(a < b && b < c && c < d);
        assert_eq!(STATE_BACKUP.parse("state_backup_junk.json"), None);
        assert_eq!(CONTENT_BACKUP.parse("state_backup_20250101_120000.json"), None);
        assert_eq!(
            CONTENT_BACKUP.parse("content_backup_20250101_120000"),
            Some(("20250101_120000".to_string(), 0))
        );
    }

    #[test]
    fn test_newer_snapshot_is_rejected() -> Fallible<()> {
        let dir = tempdir()?;
        let manager = PersistenceManager::new(dir.path().to_path_buf(), 5);
        write(
            manager.state_path(),
            r#"{"version": 7, "savedAt": "2025-01-01T00:00:00Z"}"#,
        )?;
        let err = manager.load_state().err();
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::Persistence));
        Ok(())
    }

    #[test]
    fn test_archive_backup_and_restore() -> Fallible<()> {
        let dir = tempdir()?;
        let manager = PersistenceManager::new(dir.path().to_path_buf(), 5);
        let now = Timestamp::now();
        let (snapshot, sources) = sample_state(now)?;
        manager.save_state(&snapshot, &sources)?;
        let archive = manager.create_archive_backup(now)?;
        assert!(archive.exists());
        assert_eq!(manager.archive_backups()?, vec![archive.clone()]);

        // Clobber the state, then restore.
        let (other, _) = sample_state(now.plus_days(1.0))?;
        manager.save_state(&other, &[])?;
        let stray = manager.content_dir().join("text").join("stray.txt");
        write(&stray, "x")?;
        manager.restore_from_archive(&archive)?;

        assert!(!stray.exists());
        let Some(loaded) = manager.load_state()? else {
            panic!("state was not restored");
        };
        assert_eq!(loaded.snapshot, snapshot);
        assert_eq!(loaded.sources, sources);
        Ok(())
    }

    #[test]
    fn test_unreadable_archive_changes_nothing() -> Fallible<()> {
        let dir = tempdir()?;
        let manager = PersistenceManager::new(dir.path().to_path_buf(), 5);
        let (snapshot, sources) = sample_state(Timestamp::now())?;
        manager.save_state(&snapshot, &sources)?;
        let bogus = dir.path().join("bogus.zip");
        write(&bogus, "not a zip")?;
        assert!(manager.restore_from_archive(&bogus).is_err());
        assert!(manager.state_path().exists());
        assert!(manager.load_state()?.is_some());
        Ok(())
    }
}

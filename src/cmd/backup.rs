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

use std::path::Path;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::Fallible;
use crate::error::fail;
use crate::persistence::PersistenceManager;
use crate::types::timestamp::Timestamp;

pub fn create_backup(data_dir: PathBuf, config: Config) -> Fallible<()> {
    let manager = PersistenceManager::new(data_dir, config.retention);
    let path = manager.create_archive_backup(Timestamp::now())?;
    println!("Backup written to {}.", path.display());
    Ok(())
}

pub fn list_backups(data_dir: PathBuf, config: Config) -> Fallible<()> {
    let manager = PersistenceManager::new(data_dir, config.retention);
    let groups = [
        ("Archives", manager.archive_backups()?),
        ("Snapshots", manager.state_backups()?),
        ("Content", manager.content_backups()?),
    ];
    for (title, paths) in groups {
        println!("{title} ({}):", paths.len());
        for path in paths {
            println!("  {}", path.display());
        }
    }
    Ok(())
}

/// Replace the data directory's state with an archive's. This does not load
/// the current state first, so it also recovers from a corrupt snapshot.
pub fn restore_backup(data_dir: PathBuf, config: Config, archive: &Path) -> Fallible<()> {
    if !archive.exists() {
        return fail("archive does not exist.");
    }
    let manager = PersistenceManager::new(data_dir, config.retention);
    manager.restore_from_archive(archive)?;
    println!("Restored from {}.", archive.display());
    Ok(())
}

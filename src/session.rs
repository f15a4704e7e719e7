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

use std::collections::BTreeMap;
use std::fs::create_dir_all;
use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;

use crate::activity::ActivityTracker;
use crate::config::Config;
use crate::error::Fallible;
use crate::fetch::Fetcher;
use crate::persistence::PersistenceManager;
use crate::scheduler::ScheduleEntry;
use crate::scheduler::Scheduler;
use crate::snapshot::Snapshot;
use crate::sources::SourceProcessor;
use crate::store::AddOutcome;
use crate::store::ContentStore;
use crate::types::response::Response;
use crate::types::source::SourceContent;
use crate::types::source_id::SourceId;
use crate::types::timestamp::Timestamp;
use crate::types::unit::StudyUnit;
use crate::types::unit_id::UnitId;

/// Everything loaded from one data directory.
pub struct Session {
    pub config: Config,
    pub persistence: PersistenceManager,
    pub store: ContentStore,
    pub sources: SourceProcessor,
    pub scheduler: Scheduler,
    pub activity: ActivityTracker,
}

/// Units grouped by when they are next due.
#[derive(Clone, PartialEq, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Agenda {
    pub due_now: Vec<UnitId>,
    /// Keyed by the number of local calendar days until the review.
    pub upcoming: BTreeMap<i64, Vec<UnitId>>,
    pub new: Vec<UnitId>,
}

impl Session {
    /// Load the data directory's state, or start empty if nothing has been
    /// saved there yet.
    pub fn open(data_dir: PathBuf, config: Config) -> Fallible<Self> {
        create_dir_all(&data_dir)?;
        let persistence = PersistenceManager::new(data_dir, config.retention);
        let start = Instant::now();
        let session = match persistence.load_state()? {
            Some(loaded) => {
                let snapshot = loaded.snapshot;
                Self {
                    store: ContentStore::from_units(snapshot.units),
                    sources: SourceProcessor::from_sources(
                        persistence.content_tree(),
                        loaded.sources,
                    ),
                    scheduler: Scheduler::from_parts(snapshot.schedule, snapshot.history),
                    activity: ActivityTracker::from_record(snapshot.activity),
                    config,
                    persistence,
                }
            }
            None => Self {
                store: ContentStore::new(),
                sources: SourceProcessor::new(persistence.content_tree()),
                scheduler: Scheduler::new(),
                activity: ActivityTracker::new(),
                config,
                persistence,
            },
        };
        let duration = start.elapsed().as_millis();
        log::debug!("Session loaded in {duration}ms.");
        Ok(session)
    }

    pub fn save(&self, now: Timestamp) -> Fallible<()> {
        let snapshot = Snapshot::capture(
            &self.store,
            self.sources.sources(),
            &self.scheduler,
            &self.activity,
            now,
        );
        self.persistence.save_state(&snapshot, self.sources.sources())
    }

    pub fn add_source(
        &mut self,
        content: SourceContent,
        name: &str,
        now: Timestamp,
    ) -> Fallible<SourceId> {
        self.sources.register(content, name, now)
    }

    /// Process one batch of a source. The batch size defaults to the
    /// configured one.
    pub fn process(
        &mut self,
        id: SourceId,
        batch_size: Option<usize>,
        fetcher: &dyn Fetcher,
        now: Timestamp,
    ) -> Fallible<AddOutcome> {
        let batch_size = batch_size.unwrap_or(self.config.batch_size);
        self.sources
            .process_batch(id, batch_size, &mut self.store, fetcher, now)
    }

    /// Record a review with the scheduler and the activity tracker.
    pub fn review(
        &mut self,
        unit_id: UnitId,
        response: Response,
        now: Timestamp,
    ) -> Fallible<ScheduleEntry> {
        let entry = self
            .scheduler
            .record_response(&mut self.store, unit_id, response, now)?;
        self.activity.record_review(now);
        Ok(entry)
    }

    /// Units to study now: the due ones, then up to `new_limit` units that
    /// have never been reviewed.
    pub fn feed(&self, now: Timestamp, new_limit: usize) -> Vec<&StudyUnit> {
        let mut feed: Vec<&StudyUnit> = self
            .scheduler
            .due_units(now)
            .into_iter()
            .filter_map(|id| self.store.get(id))
            .collect();
        feed.extend(
            self.store
                .new_units()
                .filter(|unit| self.scheduler.entry(unit.id).is_none())
                .take(new_limit),
        );
        feed
    }

    pub fn agenda(&self, now: Timestamp) -> Agenda {
        let mut agenda = Agenda::default();
        let today = now.local_date();
        for unit in self.store.units() {
            match self.scheduler.next_review_date(unit.id) {
                None => agenda.new.push(unit.id),
                Some(next) if next <= now => agenda.due_now.push(unit.id),
                Some(next) => {
                    let days = today.days_until(next.local_date());
                    agenda.upcoming.entry(days).or_default().push(unit.id);
                }
            }
        }
        agenda
    }
}

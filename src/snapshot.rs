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

//! The versioned JSON document holding everything except source payloads.

use serde::Deserialize;
use serde::Serialize;

use crate::activity::ActivityRecord;
use crate::activity::ActivityTracker;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::scheduler::ReviewEvent;
use crate::scheduler::ScheduleEntry;
use crate::scheduler::Scheduler;
use crate::store::ContentStore;
use crate::types::source::Source;
use crate::types::source::SourceRecord;
use crate::types::timestamp::Timestamp;
use crate::types::unit::StudyUnit;

/// The newest snapshot format this build reads and the one it writes.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: Timestamp,
    #[serde(default)]
    pub units: Vec<StudyUnit>,
    #[serde(default)]
    pub sources: Vec<SourceRecord>,
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,
    #[serde(default)]
    pub history: Vec<ReviewEvent>,
    #[serde(default)]
    pub activity: ActivityRecord,
}

impl Snapshot {
    pub fn capture(
        store: &ContentStore,
        sources: &[Source],
        scheduler: &Scheduler,
        activity: &ActivityTracker,
        now: Timestamp,
    ) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: now,
            units: store.units().to_vec(),
            sources: sources.iter().map(SourceRecord::of).collect(),
            schedule: scheduler.entries().into_iter().cloned().collect(),
            history: scheduler.history().to_vec(),
            activity: activity.to_record(),
        }
    }

    pub fn to_json(&self) -> Fallible<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Fallible<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(ErrorReport::new(format!(
                "snapshot version {} is newer than the supported version {SNAPSHOT_VERSION}.",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }
}

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

//! Review intervals. Each response multiplies the current interval by a
//! fixed factor; there is no per-unit ease.

use std::collections::BTreeMap;
use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Fallible;
use crate::store::ContentStore;
use crate::types::date::Date;
use crate::types::response::Response;
use crate::types::timestamp::Timestamp;
use crate::types::unit_id::UnitId;

const HARD_FACTOR: f64 = 1.2;
const GOOD_FACTOR: f64 = 2.5;
const EASY_FACTOR: f64 = 3.5;

/// When a unit is next due, and the interval that got it there.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub unit_id: UnitId,
    pub next_review: Timestamp,
    /// In days.
    pub interval: f64,
    pub last_response: Response,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvent {
    pub unit_id: UnitId,
    pub response: Response,
    pub timestamp: Timestamp,
}

#[derive(Default)]
pub struct Scheduler {
    schedule: HashMap<UnitId, ScheduleEntry>,
    /// Append-only.
    history: Vec<ReviewEvent>,
}

/// The interval following `current` for a response. An interval of zero
/// means the unit was never reviewed.
pub fn next_interval(current: f64, response: Response) -> f64 {
    match response {
        Response::Hard => f64::max(1.0, current * HARD_FACTOR),
        Response::Good => {
            if current > 0.0 {
                current * GOOD_FACTOR
            } else {
                1.0
            }
        }
        Response::Easy => {
            if current > 0.0 {
                current * EASY_FACTOR
            } else {
                2.0
            }
        }
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(entries: Vec<ScheduleEntry>, history: Vec<ReviewEvent>) -> Self {
        let schedule = entries
            .into_iter()
            .map(|entry| (entry.unit_id, entry))
            .collect();
        Self { schedule, history }
    }

    /// Schedule the next review of a unit, log the review, and mark the unit
    /// as reviewed.
    pub fn record_response(
        &mut self,
        store: &mut ContentStore,
        unit_id: UnitId,
        response: Response,
        now: Timestamp,
    ) -> Fallible<ScheduleEntry> {
        store.lookup(unit_id)?;
        let current = self
            .schedule
            .get(&unit_id)
            .map(|entry| entry.interval)
            .unwrap_or(0.0);
        let interval = next_interval(current, response);
        let entry = ScheduleEntry {
            unit_id,
            next_review: now.plus_days(interval),
            interval,
            last_response: response,
        };
        store.mark_reviewed(unit_id)?;
        self.schedule.insert(unit_id, entry.clone());
        self.history.push(ReviewEvent {
            unit_id,
            response,
            timestamp: now,
        });
        log::debug!(
            "Reviewed {} ({response}): next in {interval:.2} days.",
            unit_id.short()
        );
        Ok(entry)
    }

    /// Units whose next review is at or before `now`, soonest first.
    pub fn due_units(&self, now: Timestamp) -> Vec<UnitId> {
        let mut due: Vec<&ScheduleEntry> = self
            .schedule
            .values()
            .filter(|entry| entry.next_review <= now)
            .collect();
        due.sort_by_key(|entry| (entry.next_review, entry.unit_id.to_hex()));
        due.into_iter().map(|entry| entry.unit_id).collect()
    }

    pub fn next_review_date(&self, unit_id: UnitId) -> Option<Timestamp> {
        self.schedule.get(&unit_id).map(|entry| entry.next_review)
    }

    pub fn entry(&self, unit_id: UnitId) -> Option<&ScheduleEntry> {
        self.schedule.get(&unit_id)
    }

    /// Every schedule entry, in a stable order.
    pub fn entries(&self) -> Vec<&ScheduleEntry> {
        let mut entries: Vec<&ScheduleEntry> = self.schedule.values().collect();
        entries.sort_by_key(|entry| (entry.next_review, entry.unit_id.to_hex()));
        entries
    }

    pub fn history(&self) -> &[ReviewEvent] {
        &self.history
    }

    /// How many reviews happened on each local date.
    pub fn reviews_per_day(&self) -> BTreeMap<Date, usize> {
        let mut counts = BTreeMap::new();
        for event in &self.history {
            *counts.entry(event.timestamp.local_date()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::unit::UnitStatus;

    fn store_with_unit() -> (ContentStore, UnitId) {
        let mut store = ContentStore::new();
        store.add_content("猫が好きです。", None, Timestamp::now());
        let id = store.units()[0].id;
        (store, id)
    }

    #[test]
    fn test_first_intervals() {
        assert_eq!(next_interval(0.0, Response::Hard), 1.0);
        assert_eq!(next_interval(0.0, Response::Good), 1.0);
        assert_eq!(next_interval(0.0, Response::Easy), 2.0);
    }

    #[test]
    fn test_repeated_good() {
        let mut interval = 0.0;
        let mut seen = Vec::new();
        for _ in 0..3 {
            interval = next_interval(interval, Response::Good);
            seen.push(interval);
        }
        assert_eq!(seen, vec![1.0, 2.5, 6.25]);
    }

    #[test]
    fn test_hard_bounds() {
        for current in [0.0, 0.5, 1.0, 2.5, 40.0] {
            let next = next_interval(current, Response::Hard);
            assert!(next >= 1.0);
            assert!(next <= f64::max(1.0, current * HARD_FACTOR));
        }
        assert_eq!(next_interval(10.0, Response::Easy), 35.0);
    }

    #[test]
    fn test_record_response() -> Fallible<()> {
        let (mut store, id) = store_with_unit();
        let mut scheduler = Scheduler::new();
        let now = Timestamp::now();
        let entry = scheduler.record_response(&mut store, id, Response::Good, now)?;
        assert_eq!(entry.interval, 1.0);
        assert_eq!(entry.next_review, now.plus_days(1.0));
        let entry = scheduler.record_response(&mut store, id, Response::Good, now)?;
        assert_eq!(entry.interval, 2.5);
        assert_eq!(scheduler.next_review_date(id), Some(now.plus_days(2.5)));
        assert_eq!(scheduler.history().len(), 2);
        let unit = store.lookup(id)?;
        assert_eq!(unit.status, UnitStatus::Reviewed);
        assert_eq!(unit.review_count, 2);
        Ok(())
    }

    #[test]
    fn test_unknown_unit() {
        let mut store = ContentStore::new();
        let mut scheduler = Scheduler::new();
        let id = UnitId::for_normalized_text("猫");
        let err = scheduler
            .record_response(&mut store, id, Response::Easy, Timestamp::now())
            .err();
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::NotFound));
        assert!(scheduler.history().is_empty());
        assert_eq!(scheduler.next_review_date(id), None);
    }

    #[test]
    fn test_due_units() -> Fallible<()> {
        let (mut store, id) = store_with_unit();
        let mut scheduler = Scheduler::new();
        let now = Timestamp::now();
        scheduler.record_response(&mut store, id, Response::Good, now)?;
        assert!(scheduler.due_units(now).is_empty());
        assert_eq!(scheduler.due_units(now.plus_days(1.0)), vec![id]);
        assert_eq!(scheduler.due_units(now.plus_days(3.0)), vec![id]);
        Ok(())
    }

    #[test]
    fn test_reviews_per_day() -> Fallible<()> {
        let (mut store, id) = store_with_unit();
        let mut scheduler = Scheduler::new();
        let now = Timestamp::now();
        scheduler.record_response(&mut store, id, Response::Hard, now)?;
        scheduler.record_response(&mut store, id, Response::Hard, now)?;
        let counts = scheduler.reviews_per_day();
        assert_eq!(counts.get(&now.local_date()), Some(&2));
        Ok(())
    }
}

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

use std::collections::HashMap;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::text::difficulty;
use crate::text::is_valid_sentence;
use crate::text::normalize;
use crate::text::split_sentences;
use crate::types::timestamp::Timestamp;
use crate::types::unit::StudyUnit;
use crate::types::unit::UnitStatus;
use crate::types::unit_id::UnitId;

/// The result of feeding text into the store.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct AddOutcome {
    pub added: usize,
    pub duplicates: usize,
}

impl AddOutcome {
    pub fn merge(self, other: AddOutcome) -> AddOutcome {
        AddOutcome {
            added: self.added + other.added,
            duplicates: self.duplicates + other.duplicates,
        }
    }
}

/// Holds the deduplicated study units, in the order they were added.
#[derive(Default)]
pub struct ContentStore {
    units: Vec<StudyUnit>,
    /// Maps unit IDs to their position in `units`.
    index: HashMap<UnitId, usize>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from previously persisted units. Later units whose
    /// normalized text collides with an earlier one are dropped.
    pub fn from_units(units: Vec<StudyUnit>) -> Self {
        let mut store = Self::new();
        for unit in units {
            let id = UnitId::for_normalized_text(&normalize(&unit.text));
            if store.index.contains_key(&id) {
                log::warn!("Dropping duplicate unit {} on load.", unit.id);
                continue;
            }
            store.insert(StudyUnit { id, ..unit });
        }
        store
    }

    /// Split `text` into sentences and add every valid sentence that is not
    /// already in the store.
    pub fn add_content(
        &mut self,
        text: &str,
        source_name: Option<&str>,
        now: Timestamp,
    ) -> AddOutcome {
        let mut outcome = AddOutcome::default();
        for candidate in split_sentences(text) {
            if !is_valid_sentence(&candidate) {
                continue;
            }
            let id = UnitId::for_normalized_text(&normalize(&candidate));
            if self.index.contains_key(&id) {
                outcome.duplicates += 1;
                continue;
            }
            let unit = StudyUnit {
                id,
                difficulty: difficulty(&candidate),
                text: candidate,
                created_at: now,
                review_count: 0,
                status: UnitStatus::New,
                source_name: source_name.map(|name| name.to_string()),
            };
            self.insert(unit);
            outcome.added += 1;
        }
        log::debug!(
            "Added {} units ({} duplicates).",
            outcome.added,
            outcome.duplicates
        );
        outcome
    }

    pub fn get(&self, id: UnitId) -> Option<&StudyUnit> {
        self.index.get(&id).map(|&position| &self.units[position])
    }

    pub fn lookup(&self, id: UnitId) -> Fallible<&StudyUnit> {
        self.get(id)
            .ok_or_else(|| ErrorReport::not_found(format!("no unit with id {id}.")))
    }

    /// Record that a unit was reviewed. Only the scheduler calls this.
    pub(crate) fn mark_reviewed(&mut self, id: UnitId) -> Fallible<()> {
        let position = *self
            .index
            .get(&id)
            .ok_or_else(|| ErrorReport::not_found(format!("no unit with id {id}.")))?;
        let unit = &mut self.units[position];
        unit.status = UnitStatus::Reviewed;
        unit.review_count += 1;
        Ok(())
    }

    /// Find a unit by a unique prefix of its hex ID.
    pub fn find_by_prefix(&self, prefix: &str) -> Fallible<&StudyUnit> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() {
            return Err(ErrorReport::validation("empty unit id."));
        }
        let mut matches = self
            .units
            .iter()
            .filter(|unit| unit.id.to_hex().starts_with(&prefix));
        match (matches.next(), matches.next()) {
            (Some(unit), None) => Ok(unit),
            (None, _) => Err(ErrorReport::not_found(format!("no unit with id {prefix}."))),
            (Some(_), Some(_)) => Err(ErrorReport::validation(format!(
                "unit id prefix {prefix} is ambiguous."
            ))),
        }
    }

    pub fn units(&self) -> &[StudyUnit] {
        &self.units
    }

    pub fn new_units(&self) -> impl Iterator<Item = &StudyUnit> {
        self.units
            .iter()
            .filter(|unit| unit.status == UnitStatus::New)
    }

    pub fn units_from<'a>(&'a self, source_name: &'a str) -> impl Iterator<Item = &'a StudyUnit> {
        self.units
            .iter()
            .filter(move |unit| unit.source_name.as_deref() == Some(source_name))
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    fn insert(&mut self, unit: StudyUnit) {
        self.index.insert(unit.id, self.units.len());
        self.units.push(unit);
    }
}

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

//! Daily review counts and the study streak.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::types::date::Date;
use crate::types::timestamp::Timestamp;

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub date: Date,
    pub review_count: usize,
    /// The first review of the day.
    pub session_start: Timestamp,
}

/// The persisted form of the tracker.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub daily: Vec<DailyStat>,
    pub streak: usize,
    pub last_active_date: Option<Date>,
    pub last_review_at: Option<Timestamp>,
}

#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStats {
    pub total_days: usize,
    pub current_streak: usize,
    pub last_review_at: Option<Timestamp>,
    pub today_reviews: usize,
    pub total_reviews: usize,
    pub average_daily_reviews: f64,
}

#[derive(Default)]
pub struct ActivityTracker {
    daily: BTreeMap<Date, DailyStat>,
    streak: usize,
    last_active_date: Option<Date>,
    last_review_at: Option<Timestamp>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_record(record: ActivityRecord) -> Self {
        Self {
            daily: record
                .daily
                .into_iter()
                .map(|stat| (stat.date, stat))
                .collect(),
            streak: record.streak,
            last_active_date: record.last_active_date,
            last_review_at: record.last_review_at,
        }
    }

    pub fn to_record(&self) -> ActivityRecord {
        ActivityRecord {
            daily: self.daily.values().cloned().collect(),
            streak: self.streak,
            last_active_date: self.last_active_date,
            last_review_at: self.last_review_at,
        }
    }

    /// Count one review on the local date of `now`. The first review of a
    /// day extends the streak if the last active day was yesterday, and
    /// restarts it otherwise.
    pub fn record_review(&mut self, now: Timestamp) {
        let today = now.local_date();
        if !self.daily.contains_key(&today) {
            self.streak = match self.last_active_date {
                Some(last) if Some(last) == today.pred() => self.streak + 1,
                _ => 1,
            };
            self.daily.insert(
                today,
                DailyStat {
                    date: today,
                    review_count: 0,
                    session_start: now,
                },
            );
            log::debug!("First review on {today}, streak is {}.", self.streak);
        }
        if let Some(stat) = self.daily.get_mut(&today) {
            stat.review_count += 1;
        }
        self.last_active_date = Some(today);
        self.last_review_at = Some(now);
    }

    pub fn stats(&self, now: Timestamp) -> ActivityStats {
        let total_days = self.daily.len();
        let total_reviews: usize = self.daily.values().map(|stat| stat.review_count).sum();
        let today_reviews = self
            .daily
            .get(&now.local_date())
            .map(|stat| stat.review_count)
            .unwrap_or(0);
        let average_daily_reviews = if total_days == 0 {
            0.0
        } else {
            total_reviews as f64 / total_days as f64
        };
        ActivityStats {
            total_days,
            current_streak: self.streak,
            last_review_at: self.last_review_at,
            today_reviews,
            total_reviews,
            average_daily_reviews,
        }
    }
}

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
use std::fmt::Display;
use std::fmt::Formatter;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::Serialize;

use crate::activity::ActivityStats;
use crate::config::Config;
use crate::error::Fallible;
use crate::session::Session;
use crate::sources::SourceSummary;
use crate::types::date::Date;
use crate::types::timestamp::Timestamp;

#[derive(ValueEnum, Clone)]
pub enum StatsFormat {
    /// Plain text output.
    Text,
    /// JSON output.
    Json,
}

impl Display for StatsFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsFormat::Text => write!(f, "text"),
            StatsFormat::Json => write!(f, "json"),
        }
    }
}

pub fn print_stats(data_dir: PathBuf, config: Config, format: StatsFormat) -> Fallible<()> {
    let session = Session::open(data_dir, config)?;
    let stats = get_stats(&session, Timestamp::now());
    match format {
        StatsFormat::Text => {
            let activity = &stats.activity;
            println!("Units:            {} ({} new)", stats.unit_count, stats.new_unit_count);
            println!("Due now:          {}", stats.due_count);
            println!("Reviews today:    {}", activity.today_reviews);
            println!("Total reviews:    {}", activity.total_reviews);
            println!("Study days:       {}", activity.total_days);
            println!("Current streak:   {}", activity.current_streak);
            println!("Daily average:    {:.1}", activity.average_daily_reviews);
            let sources = &stats.sources;
            println!(
                "Sources:          {} ({} archives, {} other)",
                sources.total_sources, sources.archives, sources.others
            );
            println!(
                "Source progress:  {}/{}",
                sources.processed_units, sources.total_units
            );
        }
        StatsFormat::Json => {
            let stats_json = serde_json::to_string_pretty(&stats)?;
            println!("{}", stats_json);
        }
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    unit_count: usize,
    new_unit_count: usize,
    due_count: usize,
    activity: ActivityStats,
    sources: SourceSummary,
    reviews_per_day: BTreeMap<Date, usize>,
}

fn get_stats(session: &Session, now: Timestamp) -> Stats {
    Stats {
        unit_count: session.store.len(),
        new_unit_count: session.store.new_units().count(),
        due_count: session.scheduler.due_units(now).len(),
        activity: session.activity.stats(now),
        sources: session.sources.summary(),
        reviews_per_day: session.scheduler.reviews_per_day(),
    }
}

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

use std::path::PathBuf;

use crate::config::Config;
use crate::error::Fallible;
use crate::session::Session;
use crate::types::response::Response;
use crate::types::timestamp::Timestamp;
use crate::types::unit::StudyUnit;

fn print_unit(unit: &StudyUnit) {
    println!(
        "{}  [{:.1}]  {}",
        unit.id.short(),
        unit.difficulty,
        unit.text
    );
}

/// Print the units to study now.
pub fn print_feed(data_dir: PathBuf, config: Config, new: Option<usize>) -> Fallible<()> {
    let new_limit = new.unwrap_or(config.new_per_feed);
    let session = Session::open(data_dir, config)?;
    let feed = session.feed(Timestamp::now(), new_limit);
    if feed.is_empty() {
        println!("Nothing to study.");
    }
    for unit in feed {
        print_unit(unit);
    }
    Ok(())
}

pub fn review_unit(
    data_dir: PathBuf,
    config: Config,
    unit: &str,
    response: Response,
) -> Fallible<()> {
    let now = Timestamp::now();
    let mut session = Session::open(data_dir, config)?;
    let unit_id = session.store.find_by_prefix(unit)?.id;
    let entry = session.review(unit_id, response, now)?;
    session.save(now)?;
    println!(
        "Next review of {} in {:.1} days ({}).",
        unit_id.short(),
        entry.interval,
        entry.next_review.local_date()
    );
    Ok(())
}

pub fn print_due(data_dir: PathBuf, config: Config) -> Fallible<()> {
    let session = Session::open(data_dir, config)?;
    let due = session.scheduler.due_units(Timestamp::now());
    println!("{} units due.", due.len());
    for id in due {
        print_unit(session.store.lookup(id)?);
    }
    Ok(())
}

pub fn print_schedule(data_dir: PathBuf, config: Config) -> Fallible<()> {
    let session = Session::open(data_dir, config)?;
    let agenda = session.agenda(Timestamp::now());
    println!("Due now: {}", agenda.due_now.len());
    for (days, ids) in &agenda.upcoming {
        match days {
            0 => println!("Later today: {}", ids.len()),
            1 => println!("Tomorrow: {}", ids.len()),
            days => println!("In {days} days: {}", ids.len()),
        }
    }
    println!("New: {}", agenda.new.len());
    Ok(())
}

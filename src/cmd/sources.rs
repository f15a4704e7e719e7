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
use crate::types::source_id::SourceId;
use crate::types::timestamp::Timestamp;

pub fn list_sources(data_dir: PathBuf, config: Config) -> Fallible<()> {
    let session = Session::open(data_dir, config)?;
    let sources = session.sources.sources();
    if sources.is_empty() {
        println!("No sources.");
        return Ok(());
    }
    for source in sources {
        let progress = session.sources.progress(source.id)?;
        let last = match progress.last_processed_at {
            Some(ts) => ts.to_string(),
            None => "never".to_string(),
        };
        let units = session.store.units_from(&source.name).count();
        println!(
            "{}  {:<7}  {:>5.1}%  {}/{}  {} units  last processed {}  {}",
            source.id,
            source.kind().as_str(),
            progress.percentage,
            progress.processed,
            progress.total,
            units,
            last,
            source.name
        );
    }
    let summary = session.sources.summary();
    println!(
        "{} sources ({} archives, {} other), {}/{} processed.",
        summary.total_sources,
        summary.archives,
        summary.others,
        summary.processed_units,
        summary.total_units
    );
    Ok(())
}

pub fn remove_source(data_dir: PathBuf, config: Config, source: &str) -> Fallible<()> {
    let id = SourceId::parse(source)?;
    let mut session = Session::open(data_dir, config)?;
    session.sources.remove(id)?;
    session.save(Timestamp::now())?;
    println!("Removed source {id}.");
    Ok(())
}

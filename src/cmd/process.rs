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
use crate::fetch::HttpFetcher;
use crate::session::Session;
use crate::store::AddOutcome;
use crate::types::source_id::SourceId;
use crate::types::timestamp::Timestamp;

/// Process one batch of a source, or every remaining batch with `all`.
/// The session is saved after each batch, so an interrupted run resumes
/// where it stopped.
pub fn process_source(
    data_dir: PathBuf,
    config: Config,
    source: &str,
    batch_size: Option<usize>,
    all: bool,
) -> Fallible<()> {
    let id = SourceId::parse(source)?;
    let fetcher = HttpFetcher::new(&config.fetch)?;
    let mut session = Session::open(data_dir, config)?;
    let mut total = AddOutcome::default();
    loop {
        let now = Timestamp::now();
        let outcome = session.process(id, batch_size, &fetcher, now)?;
        session.save(now)?;
        total = total.merge(outcome);
        let progress = session.sources.progress(id)?;
        println!(
            "{}: {}/{} ({:.0}%), {} added, {} duplicates.",
            progress.name,
            progress.processed,
            progress.total,
            progress.percentage,
            outcome.added,
            outcome.duplicates
        );
        if !all || session.sources.get(id)?.progress.is_complete() {
            break;
        }
    }
    if all {
        println!(
            "Done: {} added, {} duplicates.",
            total.added, total.duplicates
        );
    }
    Ok(())
}

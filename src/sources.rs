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

//! The source registry, and resumable ingestion of each source into the
//! content store.

use serde::Serialize;

use crate::archive::DocumentArchive;
use crate::content_tree::ContentTree;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::fetch::Fetcher;
use crate::markup::chapter_text;
use crate::markup::page_text;
use crate::store::AddOutcome;
use crate::store::ContentStore;
use crate::text::collapse_whitespace;
use crate::text::has_target_script;
use crate::text::normalize;
use crate::types::source::Progress;
use crate::types::source::Source;
use crate::types::source::SourceContent;
use crate::types::source::SourceKind;
use crate::types::source::SourceStatus;
use crate::types::source_id::SourceId;
use crate::types::timestamp::Timestamp;

/// How far a source has been ingested.
#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceProgress {
    pub name: String,
    pub kind: SourceKind,
    pub processed: usize,
    pub total: usize,
    pub percentage: f64,
    pub last_processed_at: Option<Timestamp>,
}

/// Totals across every registered source.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub total_sources: usize,
    pub processed_units: usize,
    pub total_units: usize,
    pub archives: usize,
    pub others: usize,
}

pub struct SourceProcessor {
    tree: ContentTree,
    sources: Vec<Source>,
}

impl SourceProcessor {
    pub fn new(tree: ContentTree) -> Self {
        Self {
            tree,
            sources: Vec::new(),
        }
    }

    pub fn from_sources(tree: ContentTree, sources: Vec<Source>) -> Self {
        Self { tree, sources }
    }

    /// Registered sources, oldest first.
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn get(&self, id: SourceId) -> Fallible<&Source> {
        self.sources
            .iter()
            .find(|source| source.id == id)
            .ok_or_else(|| ErrorReport::not_found(format!("no source with id {id}.")))
    }

    fn position(&self, id: SourceId) -> Fallible<usize> {
        self.sources
            .iter()
            .position(|source| source.id == id)
            .ok_or_else(|| ErrorReport::not_found(format!("no source with id {id}.")))
    }

    /// Add a new source. Its files are written before it enters the
    /// registry, so a failed registration leaves no trace.
    pub fn register(
        &mut self,
        content: SourceContent,
        name: &str,
        now: Timestamp,
    ) -> Fallible<SourceId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ErrorReport::validation("source name is empty."));
        }
        let empty = match &content {
            SourceContent::Text { text } => text.as_deref().is_none_or(|t| t.trim().is_empty()),
            SourceContent::Url { url, .. } => url.trim().is_empty(),
            SourceContent::Archive { data } => data.as_deref().is_none_or(|d| d.is_empty()),
        };
        if empty {
            return Err(ErrorReport::validation(format!(
                "{} source has no content.",
                content.kind()
            )));
        }
        let source = Source {
            id: SourceId::random(),
            name: name.to_string(),
            created_at: now,
            progress: Progress::default(),
            status: SourceStatus::Active,
            content,
        };
        self.tree.stage_source(&source)?;
        let id = source.id;
        log::debug!("Registered {} source {id} ({}).", source.kind(), source.name);
        self.sources.push(source);
        Ok(id)
    }

    /// Feed the next batch of a source into the store. Progress is only
    /// committed once the whole batch has been extracted.
    pub fn process_batch(
        &mut self,
        id: SourceId,
        batch_size: usize,
        store: &mut ContentStore,
        fetcher: &dyn Fetcher,
        now: Timestamp,
    ) -> Fallible<AddOutcome> {
        let position = self.position(id)?;
        if batch_size == 0 {
            return Err(ErrorReport::validation("batch size must be at least 1."));
        }
        let source = &mut self.sources[position];
        if source.progress.is_complete() {
            log::debug!("Source {id} is already complete.");
            return Ok(AddOutcome::default());
        }
        let name = source.name.clone();
        let (outcome, progress) = match &mut source.content {
            SourceContent::Text { text } => {
                let text = text.as_deref().ok_or_else(|| {
                    ErrorReport::validation(format!("text source {id} has no payload."))
                })?;
                let outcome = store.add_content(text, Some(name.as_str()), now);
                (outcome, whole_source_progress(now))
            }
            SourceContent::Url { url, page } => {
                let html = match page.as_ref() {
                    Some(html) => html.clone(),
                    None => {
                        let html = fetcher.fetch(url)?;
                        *page = Some(html.clone());
                        html
                    }
                };
                let text = normalize(&page_text(&html));
                let outcome = store.add_content(&text, Some(name.as_str()), now);
                (outcome, whole_source_progress(now))
            }
            SourceContent::Archive { data } => {
                let data = data.as_deref().ok_or_else(|| {
                    ErrorReport::validation(format!("archive source {id} has no payload."))
                })?;
                let start = source.progress.cursor;
                let (texts, progress) = read_chapters(data, start, batch_size, now)?;
                let outcome = texts
                    .iter()
                    .map(|text| store.add_content(text, Some(name.as_str()), now))
                    .fold(AddOutcome::default(), AddOutcome::merge);
                (outcome, progress)
            }
        };
        source.progress = progress;
        log::debug!(
            "Processed {id}: {}/{} units.",
            source.progress.processed_units,
            source.progress.total_units
        );
        if source.kind() == SourceKind::Url {
            // The page was cached on this batch, persist it with the metadata.
            self.tree.write_source(source)?;
        } else {
            self.tree.write_metadata(source)?;
        }
        Ok(outcome)
    }

    /// Delete a source's files and its registry entry. Units already
    /// extracted from it stay in the store.
    pub fn remove(&mut self, id: SourceId) -> Fallible<()> {
        let position = self.position(id)?;
        let kind = self.sources[position].kind();
        self.tree.remove_source(kind, id)?;
        let source = self.sources.remove(position);
        log::debug!("Removed source {id} ({}).", source.name);
        Ok(())
    }

    pub fn progress(&self, id: SourceId) -> Fallible<SourceProgress> {
        let source = self.get(id)?;
        Ok(SourceProgress {
            name: source.name.clone(),
            kind: source.kind(),
            processed: source.progress.processed_units,
            total: source.progress.total_units,
            percentage: source.progress.percentage(),
            last_processed_at: source.progress.last_processed_at,
        })
    }

    pub fn summary(&self) -> SourceSummary {
        let mut summary = SourceSummary::default();
        for source in &self.sources {
            summary.total_sources += 1;
            summary.processed_units += source.progress.processed_units;
            summary.total_units += source.progress.total_units;
            match source.kind() {
                SourceKind::Archive => summary.archives += 1,
                SourceKind::Text | SourceKind::Url => summary.others += 1,
            }
        }
        summary
    }
}

/// Text and URL sources are consumed in one go.
fn whole_source_progress(now: Timestamp) -> Progress {
    Progress {
        total_units: 1,
        processed_units: 1,
        cursor: 1,
        last_processed_at: Some(now),
    }
}

/// Extract the chapters `[start, start + batch_size)` of an archive. Returns
/// the normalized texts worth feeding, and the progress after the batch.
fn read_chapters(
    data: &[u8],
    start: usize,
    batch_size: usize,
    now: Timestamp,
) -> Fallible<(Vec<String>, Progress)> {
    let mut archive = DocumentArchive::open(data)?;
    if archive.is_empty() {
        log::warn!("Archive has no readable documents.");
    }
    let total = archive.len();
    let start = start.min(total);
    let end = start.saturating_add(batch_size).min(total);
    log::debug!("Reading chapters {start}..{end} of {total}.");
    let mut texts = Vec::new();
    for index in start..end {
        log::debug!("Reading {}.", archive.documents()[index]);
        let text = chapter_text(&archive.read(index)?);
        if has_target_script(&text) {
            texts.push(normalize(&collapse_whitespace(&text)));
        }
    }
    let progress = Progress {
        total_units: total,
        processed_units: end,
        cursor: end,
        last_processed_at: Some(now),
    };
    Ok((texts, progress))
}

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

use std::fmt::Display;
use std::fmt::Formatter;

use serde::Deserialize;
use serde::Serialize;

use crate::types::source_id::SourceId;
use crate::types::timestamp::Timestamp;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Text,
    Url,
    Archive,
}

impl SourceKind {
    /// The name of the content subdirectory for sources of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Text => "text",
            SourceKind::Url => "url",
            SourceKind::Archive => "archive",
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Active,
    Removed,
}

/// How far ingestion of a source has got.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub total_units: usize,
    pub processed_units: usize,
    /// Index of the next unprocessed sub-unit (chapter, for archives).
    pub cursor: usize,
    pub last_processed_at: Option<Timestamp>,
}

impl Progress {
    /// A source is complete once it has been processed at least once and
    /// every sub-unit has been visited.
    pub fn is_complete(&self) -> bool {
        self.last_processed_at.is_some() && self.processed_units >= self.total_units
    }

    pub fn percentage(&self) -> f64 {
        if self.total_units == 0 {
            0.0
        } else {
            self.processed_units as f64 / self.total_units as f64 * 100.0
        }
    }
}

/// The raw material behind a source. Payloads are optional because they
/// live in the content tree, and may be missing after a partial restore.
#[derive(Clone, PartialEq, Debug)]
pub enum SourceContent {
    Text {
        text: Option<String>,
    },
    Url {
        url: String,
        /// The fetched page, once cached.
        page: Option<String>,
    },
    Archive {
        data: Option<Vec<u8>>,
    },
}

impl SourceContent {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceContent::Text { .. } => SourceKind::Text,
            SourceContent::Url { .. } => SourceKind::Url,
            SourceContent::Archive { .. } => SourceKind::Archive,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            SourceContent::Url { url, .. } => Some(url),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Source {
    pub id: SourceId,
    pub name: String,
    pub created_at: Timestamp,
    pub progress: Progress,
    pub status: SourceStatus,
    pub content: SourceContent,
}

impl Source {
    pub fn kind(&self) -> SourceKind {
        self.content.kind()
    }
}

/// Source metadata without the payload. This is what goes into the
/// snapshot and into each source's `metadata.json`.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    pub id: SourceId,
    pub kind: SourceKind,
    pub name: String,
    pub created_at: Timestamp,
    pub progress: Progress,
    pub status: SourceStatus,
    #[serde(default)]
    pub url: Option<String>,
}

impl SourceRecord {
    pub fn of(source: &Source) -> Self {
        Self {
            id: source.id,
            kind: source.kind(),
            name: source.name.clone(),
            created_at: source.created_at,
            progress: source.progress.clone(),
            status: source.status,
            url: source.content.url().map(|url| url.to_string()),
        }
    }
}

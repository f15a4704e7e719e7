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

//! The on-disk tree holding each source's metadata and raw payload:
//! `content/<kind>/<id>/{metadata.json, content.<ext>}`.

use std::fs::create_dir_all;
use std::fs::read;
use std::fs::read_to_string;
use std::fs::remove_dir_all;
use std::fs::rename;
use std::fs::write;
use std::path::Path;
use std::path::PathBuf;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::types::source::Source;
use crate::types::source::SourceContent;
use crate::types::source::SourceKind;
use crate::types::source::SourceRecord;
use crate::types::source_id::SourceId;

const METADATA_FILE: &str = "metadata.json";

/// Prefix of the directories new sources are assembled in before they
/// become visible.
const STAGING_PREFIX: &str = ".staging-";

#[derive(Clone, Debug)]
pub struct ContentTree {
    root: PathBuf,
}

impl ContentTree {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn source_dir(&self, kind: SourceKind, id: SourceId) -> PathBuf {
        self.root.join(kind.as_str()).join(id.to_string())
    }

    /// Write a source's metadata and payload into its directory.
    pub fn write_source(&self, source: &Source) -> Fallible<()> {
        let dir = self.source_dir(source.kind(), source.id);
        create_dir_all(&dir)?;
        write_into(&dir, source)
    }

    /// Only rewrite the metadata, leaving the payload alone.
    pub fn write_metadata(&self, source: &Source) -> Fallible<()> {
        let dir = self.source_dir(source.kind(), source.id);
        create_dir_all(&dir)?;
        let json = serde_json::to_string_pretty(&SourceRecord::of(source))?;
        write(dir.join(METADATA_FILE), json)?;
        Ok(())
    }

    /// Write a new source into a staging directory, then move it into place
    /// with a single rename. Until the rename, the source does not exist.
    pub fn stage_source(&self, source: &Source) -> Fallible<()> {
        let kind_dir = self.root.join(source.kind().as_str());
        create_dir_all(&kind_dir)?;
        let staging = kind_dir.join(format!("{STAGING_PREFIX}{}", source.id));
        if staging.exists() {
            remove_dir_all(&staging)?;
        }
        create_dir_all(&staging)?;
        if let Err(e) = write_into(&staging, source) {
            let _ = remove_dir_all(&staging);
            return Err(e);
        }
        let target = self.source_dir(source.kind(), source.id);
        rename(&staging, &target)?;
        log::debug!("Registered source at {}", target.display());
        Ok(())
    }

    /// Reattach the payload stored on disk to a source record. A missing
    /// payload file leaves the payload empty.
    pub fn load_source(&self, record: SourceRecord) -> Fallible<Source> {
        let payload = self
            .source_dir(record.kind, record.id)
            .join(payload_file(record.kind));
        let content = match record.kind {
            SourceKind::Text => SourceContent::Text {
                text: read_optional_text(&payload)?,
            },
            SourceKind::Url => {
                let url = record.url.clone().ok_or_else(|| {
                    ErrorReport::new(format!("URL source {} has no URL.", record.id))
                })?;
                SourceContent::Url {
                    url,
                    page: read_optional_text(&payload)?,
                }
            }
            SourceKind::Archive => SourceContent::Archive {
                data: if payload.exists() {
                    Some(read(&payload)?)
                } else {
                    None
                },
            },
        };
        Ok(Source {
            id: record.id,
            name: record.name,
            created_at: record.created_at,
            progress: record.progress,
            status: record.status,
            content,
        })
    }

    pub fn remove_source(&self, kind: SourceKind, id: SourceId) -> Fallible<()> {
        let dir = self.source_dir(kind, id);
        if dir.exists() {
            remove_dir_all(&dir)?;
        }
        Ok(())
    }
}

/// The payload's file name for a source kind.
pub fn payload_file(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Text => "content.txt",
        SourceKind::Url => "content.html",
        SourceKind::Archive => "content.data",
    }
}

fn write_into(dir: &Path, source: &Source) -> Fallible<()> {
    let json = serde_json::to_string_pretty(&SourceRecord::of(source))?;
    write(dir.join(METADATA_FILE), json)?;
    let payload = dir.join(payload_file(source.kind()));
    match &source.content {
        SourceContent::Text { text: Some(text) } => write(payload, text)?,
        SourceContent::Url {
            page: Some(page), ..
        } => write(payload, page)?,
        SourceContent::Archive { data: Some(data) } => write(payload, data)?,
        _ => {}
    }
    Ok(())
}

fn read_optional_text(path: &Path) -> Fallible<Option<String>> {
    if path.exists() {
        Ok(Some(read_to_string(path)?))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::types::source::Progress;
    use crate::types::source::SourceStatus;
    use crate::types::timestamp::Timestamp;

    fn text_source(text: &str) -> Source {
        Source {
            id: SourceId::random(),
            name: "notes".to_string(),
            created_at: Timestamp::now(),
            progress: Progress::default(),
            status: SourceStatus::Active,
            content: SourceContent::Text {
                text: Some(text.to_string()),
            },
        }
    }

    #[test]
    fn test_stage_and_load() -> Fallible<()> {
        let dir = tempdir()?;
        let tree = ContentTree::new(dir.path().join("content"));
        let source = text_source("猫が好きです。");
        tree.stage_source(&source)?;
        let source_dir = tree.source_dir(SourceKind::Text, source.id);
        assert!(source_dir.join("metadata.json").exists());
        assert!(source_dir.join("content.txt").exists());
        let staged: Vec<_> = std::fs::read_dir(dir.path().join("content").join("text"))?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
            .collect();
        assert!(staged.is_empty());
        let loaded = tree.load_source(SourceRecord::of(&source))?;
        assert_eq!(loaded, source);
        Ok(())
    }

    #[test]
    fn test_missing_payload_loads_empty() -> Fallible<()> {
        let dir = tempdir()?;
        let tree = ContentTree::new(dir.path().to_path_buf());
        let source = Source {
            content: SourceContent::Url {
                url: "https://example.com/a".to_string(),
                page: None,
            },
            ..text_source("")
        };
        tree.write_source(&source)?;
        let loaded = tree.load_source(SourceRecord::of(&source))?;
        assert_eq!(loaded.content, source.content);
        Ok(())
    }

    #[test]
    fn test_remove_source() -> Fallible<()> {
        let dir = tempdir()?;
        let tree = ContentTree::new(dir.path().to_path_buf());
        let source = text_source("猫が好きです。");
        tree.write_source(&source)?;
        tree.remove_source(SourceKind::Text, source.id)?;
        assert!(!tree.source_dir(SourceKind::Text, source.id).exists());
        // Removing twice is fine.
        tree.remove_source(SourceKind::Text, source.id)?;
        Ok(())
    }
}

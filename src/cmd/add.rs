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

use std::fs::read;
use std::fs::read_to_string;
use std::path::Path;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::Fallible;
use crate::error::fail;
use crate::session::Session;
use crate::types::source::SourceContent;
use crate::types::source_id::SourceId;
use crate::types::timestamp::Timestamp;

pub fn add_text(data_dir: PathBuf, config: Config, name: &str, file: &Path) -> Fallible<()> {
    if !file.exists() {
        return fail("file does not exist.");
    }
    let text = read_to_string(file)?;
    let content = SourceContent::Text { text: Some(text) };
    register(data_dir, config, content, name)
}

pub fn add_url(data_dir: PathBuf, config: Config, name: &str, url: &str) -> Fallible<()> {
    let content = SourceContent::Url {
        url: url.to_string(),
        page: None,
    };
    register(data_dir, config, content, name)
}

pub fn add_archive(data_dir: PathBuf, config: Config, name: &str, file: &Path) -> Fallible<()> {
    if !file.exists() {
        return fail("file does not exist.");
    }
    let data = read(file)?;
    let content = SourceContent::Archive { data: Some(data) };
    register(data_dir, config, content, name)
}

fn register(
    data_dir: PathBuf,
    config: Config,
    content: SourceContent,
    name: &str,
) -> Fallible<()> {
    let now = Timestamp::now();
    let mut session = Session::open(data_dir, config)?;
    let kind = content.kind();
    let id: SourceId = session.add_source(content, name, now)?;
    session.save(now)?;
    println!("Added {kind} source {id}.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::helper::build_epub;

    #[test]
    fn test_add_sources() -> Fallible<()> {
        let dir = tempdir()?;
        let data_dir = dir.path().join("data");
        let text_file = dir.path().join("notes.txt");
        std::fs::write(&text_file, "猫が好きです。")?;
        let book = dir.path().join("book.epub");
        std::fs::write(&book, build_epub(&["<p>本文です。</p>"])?)?;

        add_text(data_dir.clone(), Config::default(), "notes", &text_file)?;
        add_url(data_dir.clone(), Config::default(), "blog", "https://example.com/a")?;
        add_archive(data_dir.clone(), Config::default(), "book", &book)?;

        let session = Session::open(data_dir, Config::default())?;
        assert_eq!(session.sources.sources().len(), 3);
        Ok(())
    }

    #[test]
    fn test_missing_file() -> Fallible<()> {
        let dir = tempdir()?;
        let missing = dir.path().join("missing.txt");
        assert!(add_text(dir.path().to_path_buf(), Config::default(), "x", &missing).is_err());
        assert!(add_archive(dir.path().to_path_buf(), Config::default(), "x", &missing).is_err());
        Ok(())
    }
}

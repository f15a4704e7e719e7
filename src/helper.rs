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

//! Fixtures shared by the unit tests.

use std::cell::Cell;
use std::io::Cursor;
use std::io::Write;

use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::fetch::Fetcher;

/// Zip the given `(name, content)` entries in memory.
pub fn build_archive<C: AsRef<[u8]>>(entries: &[(&str, C)]) -> Fallible<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, content) in entries {
        zip.start_file(*name, options)?;
        zip.write_all(content.as_ref())?;
    }
    Ok(zip.finish()?.into_inner())
}

/// Build an EPUB-style archive with one XHTML document per chapter body.
pub fn build_epub(chapters: &[&str]) -> Fallible<Vec<u8>> {
    let container = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;
    let mut items = String::new();
    let mut documents = Vec::new();
    for (index, body) in chapters.iter().enumerate() {
        items.push_str(&format!(
            "    <item id=\"ch{index}\" href=\"text/chapter{index}.xhtml\" media-type=\"application/xhtml+xml\"/>\n"
        ));
        documents.push((
            format!("OEBPS/text/chapter{index}.xhtml"),
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title>{index}</title></head><body>{body}</body></html>"
            ),
        ));
    }
    let package = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="css" href="style.css" media-type="text/css"/>
{items}  </manifest>
</package>"#
    );
    let mut entries: Vec<(&str, &str)> = vec![
        ("mimetype", "application/epub+zip"),
        ("META-INF/container.xml", container),
        ("OEBPS/content.opf", package.as_str()),
        ("OEBPS/nav.xhtml", "<html><body><nav>目次</nav></body></html>"),
        ("OEBPS/style.css", "p {}"),
    ];
    for (name, content) in &documents {
        entries.push((name.as_str(), content.as_str()));
    }
    build_archive(entries.as_slice())
}

/// A fetcher that serves a fixed page, or fails if there is none.
pub struct StubFetcher {
    page: Option<String>,
    calls: Cell<usize>,
}

impl StubFetcher {
    pub fn serving(page: &str) -> Self {
        Self {
            page: Some(page.to_string()),
            calls: Cell::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            page: None,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Fetcher for StubFetcher {
    fn fetch(&self, url: &str) -> Fallible<String> {
        self.calls.set(self.calls.get() + 1);
        self.page
            .clone()
            .ok_or_else(|| ErrorReport::fetch(format!("fetching {url} failed with status 404.")))
    }
}

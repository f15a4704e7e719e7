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

//! Reading the chapters of an EPUB-style zip archive.

use std::io::Cursor;
use std::io::Read;

use percent_encoding::percent_decode_str;
use quick_xml::Reader;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use zip::ZipArchive;

use crate::error::ErrorReport;
use crate::error::Fallible;

const CONTAINER: &str = "META-INF/container.xml";

const DOCUMENT_MEDIA_TYPE: &str = "application/xhtml+xml";

const DOCUMENT_EXTENSIONS: [&str; 3] = [".xhtml", ".html", ".htm"];

/// An opened archive together with the ordered list of its documents.
pub struct DocumentArchive<'a> {
    zip: ZipArchive<Cursor<&'a [u8]>>,
    documents: Vec<String>,
}

impl<'a> DocumentArchive<'a> {
    pub fn open(data: &'a [u8]) -> Fallible<Self> {
        let mut zip = ZipArchive::new(Cursor::new(data))
            .map_err(|e| ErrorReport::extraction(format!("unreadable archive: {e}")))?;
        let documents = if zip.index_for_name(CONTAINER).is_some() {
            let container = read_entry(&mut zip, CONTAINER)?;
            let package_path = package_path(&container)?;
            let package = read_entry(&mut zip, &package_path)?;
            let mut documents = Vec::new();
            for href in manifest_documents(&package)? {
                let name = resolve(&package_path, &href)?;
                if zip.index_for_name(&name).is_some() {
                    documents.push(name);
                } else {
                    log::warn!("Manifest lists missing entry {name}, skipping.");
                }
            }
            documents
        } else {
            let mut documents: Vec<String> = zip
                .file_names()
                .filter(|name| {
                    let lower = name.to_ascii_lowercase();
                    DOCUMENT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
                })
                .map(|name| name.to_string())
                .collect();
            documents.sort();
            documents
        };
        log::debug!("Archive has {} documents.", documents.len());
        Ok(Self { zip, documents })
    }

    /// Entry names of the documents, in reading order.
    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The markup of the document at `index`.
    pub fn read(&mut self, index: usize) -> Fallible<String> {
        let name = self.documents.get(index).cloned().ok_or_else(|| {
            ErrorReport::extraction(format!("archive has no document {index}."))
        })?;
        read_entry(&mut self.zip, &name)
    }
}

fn read_entry(zip: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Fallible<String> {
    let mut file = zip
        .by_name(name)
        .map_err(|e| ErrorReport::extraction(format!("unreadable entry {name}: {e}")))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| ErrorReport::extraction(format!("unreadable entry {name}: {e}")))?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            log::warn!("Entry {name} is not valid UTF-8, dropping invalid bytes.");
            Ok(String::from_utf8_lossy(e.as_bytes())
                .replace(char::REPLACEMENT_CHARACTER, ""))
        }
    }
}

fn attribute(element: &BytesStart, key: &str) -> Option<String> {
    element
        .attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.local_name().as_ref() == key.as_bytes())
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

/// Walk every start or empty element of an XML document.
fn each_element(xml: &str, mut visit: impl FnMut(&str, &BytesStart)) -> Fallible<()> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                visit(&name, e);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ErrorReport::extraction(format!(
                    "malformed XML at position {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

/// The path of the package document named by the container.
fn package_path(container: &str) -> Fallible<String> {
    let mut path = None;
    each_element(container, |name, e| {
        if name == "rootfile" && path.is_none() {
            path = attribute(e, "full-path");
        }
    })?;
    path.ok_or_else(|| ErrorReport::extraction("container names no package document."))
}

/// The `href` of every document item in the package manifest. The
/// navigation document is a table of contents, not a chapter.
fn manifest_documents(package: &str) -> Fallible<Vec<String>> {
    let mut hrefs = Vec::new();
    each_element(package, |name, e| {
        if name != "item" || attribute(e, "media-type").as_deref() != Some(DOCUMENT_MEDIA_TYPE) {
            return;
        }
        let properties = attribute(e, "properties").unwrap_or_default();
        if properties.split_whitespace().any(|p| p == "nav") {
            return;
        }
        if let Some(href) = attribute(e, "href") {
            hrefs.push(href);
        }
    })?;
    Ok(hrefs)
}

/// Resolve a manifest `href` against the directory of the package document.
fn resolve(package_path: &str, href: &str) -> Fallible<String> {
    let href = href.split('#').next().unwrap_or(href);
    let href = percent_decode_str(href)
        .decode_utf8()
        .map_err(|_| ErrorReport::extraction(format!("undecodable href {href}.")))?;
    let mut segments: Vec<&str> = package_path.split('/').collect();
    segments.pop();
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::helper::build_archive;
    use crate::helper::build_epub;

    #[test]
    fn test_manifest_order() -> Fallible<()> {
        let data = build_epub(&["<p>一。</p>", "<p>二。</p>", "<p>三。</p>"])?;
        let mut archive = DocumentArchive::open(&data)?;
        assert_eq!(
            archive.documents(),
            &[
                "OEBPS/text/chapter0.xhtml",
                "OEBPS/text/chapter1.xhtml",
                "OEBPS/text/chapter2.xhtml"
            ]
        );
        assert!(archive.read(1)?.contains("二。"));
        Ok(())
    }

    #[test]
    fn test_without_container() -> Fallible<()> {
        let data = build_archive(&[
            ("b.html", "<p>二</p>"),
            ("a.xhtml", "<p>一</p>"),
            ("style.css", "p {}"),
        ])?;
        let archive = DocumentArchive::open(&data)?;
        assert_eq!(archive.documents(), &["a.xhtml", "b.html"]);
        Ok(())
    }

    #[test]
    fn test_not_a_zip() {
        let err = DocumentArchive::open(b"not a zip").err();
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::Extraction));
    }

    #[test]
    fn test_resolve() -> Fallible<()> {
        assert_eq!(resolve("OEBPS/content.opf", "text/ch%201.xhtml")?, "OEBPS/text/ch 1.xhtml");
        assert_eq!(resolve("OEBPS/content.opf", "../ch.xhtml#top")?, "ch.xhtml");
        assert_eq!(resolve("content.opf", "./ch.xhtml")?, "ch.xhtml");
        Ok(())
    }

    #[test]
    fn test_missing_manifest_entry_is_skipped() -> Fallible<()> {
        let container = r#"<?xml version="1.0"?>
<container xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles><rootfile full-path="content.opf" media-type="application/oebps-package+xml"/></rootfiles>
</container>"#;
        let package = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf"><manifest>
  <item id="a" href="a.xhtml" media-type="application/xhtml+xml"/>
  <item id="b" href="gone.xhtml" media-type="application/xhtml+xml"/>
  <item id="c" href="style.css" media-type="text/css"/>
</manifest></package>"#;
        let data = build_archive(&[
            ("META-INF/container.xml", container),
            ("content.opf", package),
            ("a.xhtml", "<p>一</p>"),
        ])?;
        let archive = DocumentArchive::open(&data)?;
        assert_eq!(archive.documents(), &["a.xhtml"]);
        Ok(())
    }
}

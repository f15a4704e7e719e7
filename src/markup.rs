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

//! Just enough HTML handling to pull readable text out of web pages and
//! e-book chapters: drop non-content elements, find elements by tag and
//! class, and flatten markup to text.
//!
//! This is a tag scanner, not a parser. Elements are matched by counting
//! nested open and close tags of the same name, which is good enough for
//! the well-formed XHTML found in e-books and for typical article pages.

use std::sync::LazyLock;

use regex::Captures;
use regex::Regex;

use crate::text::collapse_whitespace;

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9:-]*)((?:\s[^>]*)?/?)>").unwrap());

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[.*?\]\]>|<![^>]*>|<\?.*?\?>").unwrap());

static CLASS_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|\s)class\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});

static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:(\d+)|[xX]([0-9a-fA-F]+));").unwrap());

/// Elements removed from web pages before extraction.
pub const PAGE_NOISE: [&str; 6] = ["style", "script", "nav", "header", "footer", "iframe"];

/// Elements removed from e-book chapters before extraction.
pub const CHAPTER_NOISE: [&str; 5] = ["style", "script", "nav", "header", "footer"];

/// Byte offsets of one element in the document.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Span {
    /// Start of the opening tag.
    outer_start: usize,
    /// End of the opening tag.
    inner_start: usize,
    /// Start of the closing tag.
    inner_end: usize,
    /// End of the closing tag.
    outer_end: usize,
}

/// Find the outermost elements whose tag name satisfies `is_name` and whose
/// opening tag attributes satisfy `is_match`. An element that is never
/// closed extends to the end of the document.
fn element_spans(
    html: &str,
    is_name: impl Fn(&str) -> bool,
    is_match: impl Fn(&str) -> bool,
) -> Vec<Span> {
    let mut spans = Vec::new();
    // The name and start offsets of the element being captured, and how
    // many same-named elements are open inside it.
    let mut open: Option<(String, usize, usize)> = None;
    let mut depth = 0usize;
    for caps in TAG.captures_iter(html) {
        let Some(whole) = caps.get(0) else { continue };
        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();
        let attrs = &caps[3];
        let self_closing = attrs.trim_end().ends_with('/');
        match &open {
            None => {
                if !closing && is_name(&name) && is_match(attrs) {
                    if self_closing {
                        spans.push(Span {
                            outer_start: whole.start(),
                            inner_start: whole.end(),
                            inner_end: whole.end(),
                            outer_end: whole.end(),
                        });
                    } else {
                        open = Some((name, whole.start(), whole.end()));
                        depth = 1;
                    }
                }
            }
            Some((open_name, outer_start, inner_start)) => {
                if name != *open_name || self_closing {
                    continue;
                }
                if closing {
                    depth -= 1;
                    if depth == 0 {
                        spans.push(Span {
                            outer_start: *outer_start,
                            inner_start: *inner_start,
                            inner_end: whole.start(),
                            outer_end: whole.end(),
                        });
                        open = None;
                    }
                } else {
                    depth += 1;
                }
            }
        }
    }
    if let Some((_, outer_start, inner_start)) = open {
        spans.push(Span {
            outer_start,
            inner_start,
            inner_end: html.len(),
            outer_end: html.len(),
        });
    }
    spans
}

fn has_any_class(attrs: &str, classes: &[&str]) -> bool {
    let Some(caps) = CLASS_ATTR.captures(attrs) else {
        return false;
    };
    let value = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str())
        .unwrap_or("");
    value.split_whitespace().any(|class| classes.contains(&class))
}

/// Remove comments, declarations, and every element named in `names`
/// together with its content.
pub fn strip_elements(html: &str, names: &[&str]) -> String {
    let html = COMMENT.replace_all(html, "");
    let html = DECLARATION.replace_all(&html, "");
    let spans = element_spans(&html, |name| names.contains(&name), |_| true);
    let mut result = String::with_capacity(html.len());
    let mut last = 0;
    for span in spans {
        result.push_str(&html[last..span.outer_start]);
        last = span.outer_end;
    }
    result.push_str(&html[last..]);
    result
}

/// The inner markup of every outermost `name` element.
pub fn find_all(html: &str, name: &str) -> Vec<String> {
    element_spans(html, |n| n == name, |_| true)
        .into_iter()
        .map(|span| html[span.inner_start..span.inner_end].to_string())
        .collect()
}

/// The inner markup of every outermost `name` element carrying at least one
/// of `classes`.
pub fn find_all_with_class(html: &str, name: &str, classes: &[&str]) -> Vec<String> {
    element_spans(html, |n| n == name, |attrs| has_any_class(attrs, classes))
        .into_iter()
        .map(|span| html[span.inner_start..span.inner_end].to_string())
        .collect()
}

pub fn find_first(html: &str, name: &str) -> Option<String> {
    find_all(html, name).into_iter().next()
}

pub fn find_first_with_class(html: &str, name: &str, classes: &[&str]) -> Option<String> {
    find_all_with_class(html, name, classes).into_iter().next()
}

/// Flatten markup to text: drop tags and decode entities. Text is joined
/// without separators, the way a DOM's text content is.
pub fn text_content(html: &str) -> String {
    let text = TAG.replace_all(html, "");
    decode_entities(&text)
}

pub fn decode_entities(text: &str) -> String {
    let text = NUMERIC_ENTITY.replace_all(text, |caps: &Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(decimal), _) => decimal.as_str().parse::<u32>().ok(),
            (None, Some(hex)) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, None) => None,
        };
        code.and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_default()
    });
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&hellip;", "\u{2026}")
        .replace("&mdash;", "\u{2014}")
        .replace("&ndash;", "\u{2013}")
        .replace("&laquo;", "\u{00ab}")
        .replace("&raquo;", "\u{00bb}")
        .replace("&amp;", "&")
}

/// The main text of a web page: the first `<article>`, else the first
/// article-like `<div>`, else the whole page. Whitespace is collapsed.
pub fn page_text(html: &str) -> String {
    let html = strip_elements(html, &PAGE_NOISE);
    let region = find_first(&html, "article")
        .or_else(|| find_first_with_class(&html, "div", &["article", "content", "main-content"]));
    let text = match region {
        Some(region) => text_content(&region),
        None => text_content(&html),
    };
    collapse_whitespace(&text).trim().to_string()
}

/// The text of an e-book chapter: its paragraphs one per line, else the
/// text of content-like `<div>`s, else everything.
pub fn chapter_text(html: &str) -> String {
    let html = strip_elements(html, &CHAPTER_NOISE);
    let paragraphs = join_texts(&find_all(&html, "p"));
    if !paragraphs.is_empty() {
        return paragraphs;
    }
    let divs = join_texts(&find_all_with_class(
        &html,
        "div",
        &["text", "content", "body"],
    ));
    if !divs.is_empty() {
        return divs;
    }
    text_content(&html).trim().to_string()
}

fn join_texts(fragments: &[String]) -> String {
    fragments
        .iter()
        .map(|fragment| text_content(fragment).trim().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

//! Human-readable labels for table-of-contents entries.

use std::io::{Read, Seek};
use std::sync::LazyLock;

use regex::Regex;

use crate::epub::SourceArchive;
use crate::path;
use crate::util::decode_document;

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").expect("valid regex"));

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h[1-6]\b[^>]*>(.*?)</h[1-6]\s*>").expect("valid regex"));

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// File stems that usually hold a book's own table of contents.
const TOC_STEMS: &[&str] = &["nav", "toc", "contents", "content"];

/// Synthetic label for the `n`th content file.
pub fn section_label(n: usize) -> String {
    format!("Section {}", n)
}

/// Best-effort label for an XHTML document: its `<title>`, or failing that
/// its first `<h1>`..`<h6>`. Markup is stripped, entities decoded, and
/// whitespace collapsed. Returns `None` if both are missing or empty.
pub fn extract_doc_label(xhtml: &str) -> Option<String> {
    [&*TITLE, &*HEADING].into_iter().find_map(|re| {
        re.captures(xhtml)
            .and_then(|caps| caps.get(1))
            .and_then(|inner| clean_label(inner.as_str()))
    })
}

fn clean_label(raw: &str) -> Option<String> {
    let text = TAG.replace_all(raw, "");
    let text = html_escape::decode_html_entities(&text);
    let label = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!label.is_empty()).then_some(label)
}

/// Look for the source's own navigation/TOC document and use its title or
/// first heading as the combined navigation heading.
pub fn detect_toc_heading<R: Read + Seek>(source: &mut SourceArchive<R>) -> Option<String> {
    let mut candidates: Vec<String> = Vec::new();
    for name in source.entries() {
        let is_candidate = TOC_STEMS.contains(&path::stem(name).as_str())
            && crate::epub::is_content_file(name);
        if is_candidate && !candidates.contains(name) {
            candidates.push(name.clone());
        }
    }

    for name in candidates {
        let bytes = match source.read(&name) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(entry = %name, "skipping unreadable TOC candidate: {e}");
                continue;
            }
        };
        if let Some(label) = extract_doc_label(&decode_document(&bytes)) {
            return Some(label);
        }
    }

    None
}

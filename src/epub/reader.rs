//! Read-only view over one input EPUB and its resolved reading order.

use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::error::Result;
use crate::path;

use super::parser::{CONTAINER_PATH, PackageDocument, parse_container_xml, parse_opf};
use crate::util::decode_document;

/// Extensions of content documents (the XHTML family).
const CONTENT_EXTENSIONS: &[&str] = &["xhtml", "html", "htm", "xml"];

/// Which original navigation documents to leave out of the combined spine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentFilter {
    /// Skip EPUB3 navigation documents (`nav.xhtml`, ...).
    pub exclude_nav: bool,
    /// Skip legacy TOC documents (`toc.xhtml`, `contents.html`, ...).
    pub exclude_toc: bool,
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self {
            exclude_nav: true,
            exclude_toc: true,
        }
    }
}

impl ContentFilter {
    /// Whether an archive entry is a content document that belongs in the spine.
    pub fn qualifies(&self, name: &str) -> bool {
        if !is_content_file(name) {
            return false;
        }
        !(self.exclude_nav && is_nav_doc(name)) && !(self.exclude_toc && is_toc_doc(name))
    }
}

/// Content document by extension. `META-INF/` is package plumbing, never content.
pub fn is_content_file(name: &str) -> bool {
    let normalized = path::normalize(name);
    if normalized.starts_with("meta-inf/") {
        return false;
    }
    CONTENT_EXTENSIONS.contains(&path::extension(name).as_str())
}

/// Original EPUB3 navigation document (we generate our own).
pub fn is_nav_doc(name: &str) -> bool {
    path::stem(name) == "nav"
}

/// Original legacy table-of-contents document.
pub fn is_toc_doc(name: &str) -> bool {
    if path::basename(name).to_lowercase().ends_with("toc.ncx") {
        return true;
    }
    matches!(path::stem(name).as_str(), "toc" | "contents" | "content")
}

/// One input EPUB: its entry listing plus on-demand entry reads.
pub struct SourceArchive<R> {
    path: PathBuf,
    archive: ZipArchive<R>,
    entries: Vec<String>,
}

impl SourceArchive<File> {
    /// Open an EPUB from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::from_reader(path, file)
    }
}

impl<R: Read + Seek> SourceArchive<R> {
    /// Wrap any [`Read`] + [`Seek`] source. `path` is only used for messages.
    pub fn from_reader<P: AsRef<Path>>(path: P, reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;

        // Central-directory order, directories skipped
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            match archive.by_index(i) {
                Ok(file) if !file.is_dir() => entries.push(file.name().to_string()),
                Ok(_) => {}
                Err(e) => tracing::warn!(
                    source = %path.as_ref().display(),
                    index = i,
                    "skipping unreadable entry: {e}"
                ),
            }
        }

        Ok(Self {
            path: path.as_ref().to_path_buf(),
            archive,
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name for progress messages.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Entry names in archive order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Read an entry's raw bytes.
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = self.archive.by_name(name)?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        Ok(contents)
    }

    /// Locate the package document: container.xml first, then any `.opf` entry.
    pub fn package_path(&mut self) -> Option<String> {
        match self.read(CONTAINER_PATH).and_then(|bytes| parse_container_xml(&bytes)) {
            Ok(opf_path) => return Some(opf_path),
            Err(e) => tracing::debug!(
                source = %self.path.display(),
                "no usable container.xml ({e}), searching for an .opf entry"
            ),
        }

        self.entries
            .iter()
            .find(|name| path::extension(name) == "opf")
            .cloned()
    }

    /// Parse the package document, if one can be found and parsed.
    pub fn package(&mut self) -> Option<(String, PackageDocument)> {
        let opf_path = self.package_path()?;
        let parsed = self.read(&opf_path).and_then(|bytes| {
            let text = decode_document(&bytes).into_owned();
            parse_opf(&text)
        });

        match parsed {
            Ok(package) => Some((opf_path, package)),
            Err(e) => {
                tracing::warn!(
                    source = %self.path.display(),
                    opf = %opf_path,
                    "unreadable package document, falling back to lexical order: {e}"
                );
                None
            }
        }
    }
}

/// Resolve spine hrefs against the package document's directory.
pub fn spine_paths(opf_path: &str, package: &PackageDocument) -> Vec<String> {
    let opf_dir = path::parent_dir(opf_path);
    package
        .spine_hrefs()
        .map(|href| path::join(&opf_dir, path::split_ref_suffix(href).0))
        .collect()
}

/// Order qualifying entries by the spine, appending unlisted ones lexically.
pub fn order_content(
    entries: &[String],
    spine: &[String],
    filter: &ContentFilter,
) -> Vec<String> {
    let qualifying: Vec<&String> = entries.iter().filter(|n| filter.qualifies(n)).collect();
    let mut placed: HashSet<&str> = HashSet::new();
    let mut ordered = Vec::with_capacity(qualifying.len());

    for spine_path in spine {
        let spine_key = path::normalize(spine_path);
        let matched = qualifying
            .iter()
            .find(|name| !placed.contains(name.as_str()) && name.as_str() == spine_path.as_str())
            .or_else(|| {
                qualifying.iter().find(|name| {
                    !placed.contains(name.as_str()) && path::normalize(name) == spine_key
                })
            });

        if let Some(name) = matched {
            placed.insert(name.as_str());
            ordered.push((*name).clone());
        }
    }

    let mut leftovers: Vec<&String> = qualifying
        .into_iter()
        .filter(|name| !placed.contains(name.as_str()))
        .collect();
    leftovers.sort();
    ordered.extend(leftovers.into_iter().cloned());

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_content_qualification() {
        let filter = ContentFilter::default();
        assert!(filter.qualifies("OEBPS/Text/ch1.xhtml"));
        assert!(filter.qualifies("ch1.HTML"));
        assert!(!filter.qualifies("OEBPS/Images/a.png"));
        assert!(!filter.qualifies("META-INF/container.xml"));
        assert!(!filter.qualifies("OEBPS/nav.xhtml"));
        assert!(!filter.qualifies("OEBPS/Text/TOC.xhtml"));
        assert!(!filter.qualifies("contents.html"));

        let keep_all = ContentFilter {
            exclude_nav: false,
            exclude_toc: false,
        };
        assert!(keep_all.qualifies("OEBPS/nav.xhtml"));
        assert!(keep_all.qualifies("toc.xhtml"));
    }

    #[test]
    fn test_nav_and_toc_heuristics() {
        assert!(is_nav_doc("OEBPS/nav.xhtml"));
        assert!(is_nav_doc("NAV.html"));
        assert!(!is_nav_doc("navigation.xhtml"));
        assert!(is_toc_doc("toc.ncx"));
        assert!(is_toc_doc("OEBPS/book-toc.ncx"));
        assert!(is_toc_doc("content.xhtml"));
        assert!(!is_toc_doc("chapter.xhtml"));
    }

    #[test]
    fn test_spine_paths_resolve_against_opf_dir() {
        let opf = r#"<package><manifest>
            <item id="a" href="Text/a.xhtml#top" media-type="application/xhtml+xml"/>
            <item id="b" href="b.xhtml" media-type="application/xhtml+xml"/>
        </manifest><spine><itemref idref="b"/><itemref idref="a"/></spine></package>"#;
        let package = parse_opf(opf).unwrap();
        assert_eq!(
            spine_paths("OEBPS/content.opf", &package),
            vec!["OEBPS/b.xhtml", "OEBPS/Text/a.xhtml"]
        );
        assert_eq!(spine_paths("content.opf", &package), vec!["b.xhtml", "Text/a.xhtml"]);
    }

    #[test]
    fn test_order_content_spine_then_lexical() {
        let entries = names(&[
            "mimetype",
            "OEBPS/Text/z.xhtml",
            "OEBPS/Text/b.xhtml",
            "OEBPS/Text/Ch%201.xhtml",
            "OEBPS/Text/ch 1.xhtml",
            "OEBPS/Text/a.xhtml",
            "OEBPS/nav.xhtml",
        ]);
        let spine = names(&["OEBPS/Text/b.xhtml", "OEBPS/./text/CH%201.xhtml"]);

        let ordered = order_content(&entries, &spine, &ContentFilter::default());
        assert_eq!(
            ordered,
            names(&[
                "OEBPS/Text/b.xhtml",
                "OEBPS/Text/Ch%201.xhtml",
                "OEBPS/Text/a.xhtml",
                "OEBPS/Text/ch 1.xhtml",
                "OEBPS/Text/z.xhtml",
            ])
        );
    }

    #[test]
    fn test_order_content_without_spine_is_lexical() {
        let entries = names(&["c.xhtml", "a.xhtml", "b.html"]);
        let ordered = order_content(&entries, &[], &ContentFilter::default());
        assert_eq!(ordered, names(&["a.xhtml", "b.html", "c.xhtml"]));
    }
}

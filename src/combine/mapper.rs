//! Per-source translation from original references to combined-package hrefs.

use std::collections::{BTreeSet, HashMap};

use crate::path::{self, classify, normalize, split_ref_suffix};

/// Maps one source's original archive paths to their final hrefs.
///
/// Lookups try an exact canonical-path match first (as written, then
/// resolved against the referencing document), and only then fall back to
/// matching by file name, and only for names that are unambiguous within
/// this source.
#[derive(Debug, Default)]
pub struct ReferenceMapper {
    exact: HashMap<String, String>,
    basename_targets: HashMap<String, BTreeSet<String>>,
    basename_map: HashMap<String, String>,
}

impl ReferenceMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the entry at `original_path` now lives at `new_href`.
    pub fn add(&mut self, original_path: &str, new_href: impl Into<String>) {
        let new_href = new_href.into();

        let key = normalize(original_path);
        if !key.is_empty() {
            self.exact.insert(key, new_href.clone());
        }

        let base_key = normalize(path::basename(&original_path.replace('\\', "/")));
        if !base_key.is_empty() {
            self.basename_targets
                .entry(base_key)
                .or_default()
                .insert(new_href);
        }
    }

    /// Rebuild the basename fallback table, keeping only file names that
    /// point at exactly one distinct href.
    pub fn finalize(&mut self) {
        self.basename_map = self
            .basename_targets
            .iter()
            .filter(|(_, targets)| targets.len() == 1)
            .filter_map(|(base, targets)| {
                targets
                    .iter()
                    .next()
                    .map(|href| (base.clone(), href.clone()))
            })
            .collect();
    }

    /// Translate `reference`, found inside the document at `containing_path`.
    ///
    /// Any `?query`/`#fragment` suffix is carried over verbatim. Returns
    /// `None` for empty, external, and fragment-only references, and for
    /// anything that cannot be resolved confidently; callers must then leave
    /// the original reference untouched.
    pub fn lookup(&self, reference: &str, containing_path: &str) -> Option<String> {
        if !classify(reference).is_rewritable() {
            return None;
        }

        let (base, suffix) = split_ref_suffix(reference);
        let base = base.trim().replace('\\', "/");
        if base.is_empty() {
            return None;
        }

        let mut candidates = vec![normalize(&base)];
        if !base.starts_with('/') {
            let dir = path::parent_dir(containing_path);
            if !dir.is_empty() {
                candidates.push(normalize(&path::join(&dir, &base)));
            }
        }

        if let Some(href) = candidates.iter().find_map(|c| self.exact.get(c)) {
            return Some(format!("{}{}", href, suffix));
        }

        let base_key = normalize(path::basename(&base));
        self.basename_map
            .get(&base_key)
            .map(|href| format!("{}{}", href, suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> ReferenceMapper {
        let mut m = ReferenceMapper::new();
        m.add("OEBPS/Images/Cover Art.png", "../Images/img_1.png");
        m.add("OEBPS/Images/a.png", "../Images/img_2.png");
        m.add("OEBPS/Text/ch1.xhtml", "../Text/1.xhtml");
        m.finalize();
        m
    }

    #[test]
    fn test_lookup_relative_to_document() {
        let m = mapper();
        assert_eq!(
            m.lookup("../Images/a.png", "OEBPS/Text/ch1.xhtml").as_deref(),
            Some("../Images/img_2.png")
        );
        assert_eq!(
            m.lookup("../Images/Cover%20Art.png", "OEBPS/Text/ch1.xhtml").as_deref(),
            Some("../Images/img_1.png")
        );
    }

    #[test]
    fn test_lookup_as_written_and_rooted() {
        let m = mapper();
        assert_eq!(
            m.lookup("OEBPS/IMAGES/A.PNG", "elsewhere/x.xhtml").as_deref(),
            Some("../Images/img_2.png")
        );
        assert_eq!(
            m.lookup("/OEBPS/Images/a.png", "OEBPS/Text/ch1.xhtml").as_deref(),
            Some("../Images/img_2.png")
        );
    }

    #[test]
    fn test_lookup_preserves_suffix() {
        let m = mapper();
        assert_eq!(
            m.lookup("ch1.xhtml#sec-2", "OEBPS/Text/ch2.xhtml").as_deref(),
            Some("../Text/1.xhtml#sec-2")
        );
        assert_eq!(
            m.lookup("ch1.xhtml?x=1#Top", "OEBPS/Text/ch2.xhtml").as_deref(),
            Some("../Text/1.xhtml?x=1#Top")
        );
    }

    #[test]
    fn test_lookup_rejects_non_local() {
        let m = mapper();
        assert_eq!(m.lookup("", "OEBPS/Text/ch1.xhtml"), None);
        assert_eq!(m.lookup("#frag", "OEBPS/Text/ch1.xhtml"), None);
        assert_eq!(m.lookup("http://x/a.png", "OEBPS/Text/ch1.xhtml"), None);
        assert_eq!(m.lookup("data:image/png;base64,a.png", "OEBPS/Text/ch1.xhtml"), None);
        assert_eq!(m.lookup("?only-query", "OEBPS/Text/ch1.xhtml"), None);
        assert_eq!(m.lookup("missing.png", "OEBPS/Text/ch1.xhtml"), None);
    }

    #[test]
    fn test_basename_fallback_when_unique() {
        let m = mapper();
        // Wrong directory, but the file name is unique in this source
        assert_eq!(
            m.lookup("images/a.png", "OEBPS/Text/ch1.xhtml").as_deref(),
            Some("../Images/img_2.png")
        );
    }

    #[test]
    fn test_basename_fallback_ambiguous_is_no_match() {
        let mut m = ReferenceMapper::new();
        m.add("OEBPS/a/pic.png", "../Images/img_1.png");
        m.add("OEBPS/b/pic.png", "../Images/img_2.png");
        m.finalize();

        assert_eq!(m.lookup("elsewhere/pic.png", "OEBPS/Text/ch1.xhtml"), None);
        // Exact paths still resolve
        assert_eq!(
            m.lookup("../b/pic.png", "OEBPS/Text/ch1.xhtml").as_deref(),
            Some("../Images/img_2.png")
        );
    }

    #[test]
    fn test_basename_same_target_is_not_ambiguous() {
        // Deduplicated copies share one href, so the name stays unambiguous
        let mut m = ReferenceMapper::new();
        m.add("OEBPS/a/pic.png", "../Images/img_1.png");
        m.add("OEBPS/b/pic.png", "../Images/img_1.png");
        m.finalize();

        assert_eq!(
            m.lookup("pic.png", "x.xhtml").as_deref(),
            Some("../Images/img_1.png")
        );
    }

    #[test]
    fn test_basename_table_requires_finalize() {
        let mut m = ReferenceMapper::new();
        m.add("OEBPS/Images/a.png", "../Images/img_1.png");
        assert_eq!(m.lookup("other/a.png", "OEBPS/Text/ch1.xhtml"), None);
        m.finalize();
        assert!(m.lookup("other/a.png", "OEBPS/Text/ch1.xhtml").is_some());
    }
}

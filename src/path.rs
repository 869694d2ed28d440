//! In-archive path and hyperlink reference canonicalization.
//!
//! EPUB hrefs are relative, URL-encoded, and occasionally written with
//! backslashes, leading slashes, or inconsistent case. Everything that
//! compares a reference against an archive entry goes through [`normalize`]
//! first so both sides land on the same key.

use percent_encoding::percent_decode_str;

/// Schemes that always point outside the package.
const EXTERNAL_SCHEMES: &[&str] = &["http:", "https:", "mailto:", "tel:", "data:"];

/// What kind of target a hyperlink reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// Empty or whitespace-only.
    Empty,
    /// Absolute URL with an external scheme (`http:`, `mailto:`, `data:`, ...).
    External,
    /// Fragment-only reference into the same document (`#note-1`).
    Fragment,
    /// A path inside the package, possibly with a query or fragment.
    Local,
}

impl RefKind {
    /// Whether rewriting should even attempt to map this reference.
    pub fn is_rewritable(self) -> bool {
        self == RefKind::Local
    }
}

/// Classify a raw reference for rewriting.
pub fn classify(reference: &str) -> RefKind {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return RefKind::Empty;
    }
    if trimmed.starts_with('#') {
        return RefKind::Fragment;
    }
    let is_external = EXTERNAL_SCHEMES.iter().any(|scheme| {
        trimmed
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    });
    if is_external {
        RefKind::External
    } else {
        RefKind::Local
    }
}

/// Canonical, comparable key for an in-archive path or reference.
///
/// Backslashes become slashes, percent-escapes are decoded, a leading slash
/// is stripped, `.` and empty segments are dropped, `..` pops the previous
/// segment (or is dropped at the root), and the result is lowercased.
pub fn normalize(path: &str) -> String {
    fold_segments(&fully_decode(path)).to_lowercase()
}

/// Percent-decode until nothing changes, so `normalize` stays idempotent on
/// double-encoded input (`%2520`). Each round consumes at least one escape.
fn fully_decode(path: &str) -> String {
    let mut current = path.replace('\\', "/");
    loop {
        let decoded = percent_decode_str(&current)
            .decode_utf8_lossy()
            .replace('\\', "/");
        if decoded == current {
            return current;
        }
        current = decoded;
    }
}

/// Fold `.`/`..`/empty segments without changing case or decoding.
pub fn fold_segments(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Split a reference into `(base, suffix)` where the suffix starts at the
/// first `?` or `#`. The suffix is carried verbatim and never normalized.
pub fn split_ref_suffix(reference: &str) -> (&str, &str) {
    match reference.find(['?', '#']) {
        Some(cut) => reference.split_at(cut),
        None => (reference, ""),
    }
}

/// Directory portion of an archive path, folded (empty at the root).
pub fn parent_dir(path: &str) -> String {
    let folded = fold_segments(&path.replace('\\', "/"));
    match folded.rfind('/') {
        Some(i) => folded[..i].to_string(),
        None => String::new(),
    }
}

/// Join a relative href onto an archive directory.
pub fn join(dir: &str, href: &str) -> String {
    if dir.is_empty() {
        href.to_string()
    } else {
        format!("{}/{}", dir, href)
    }
}

/// Final path segment, as written.
pub fn basename(path: &str) -> &str {
    let path = path.trim_end_matches(['/', '\\']);
    match path.rfind(['/', '\\']) {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// Lowercased extension of the final path segment, without the dot.
pub fn extension(path: &str) -> String {
    let name = basename(path);
    match name.rfind('.') {
        Some(i) if i > 0 => name[i + 1..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Lowercased final segment with its extension removed.
pub fn stem(path: &str) -> String {
    let name = basename(path);
    let stem = match name.rfind('.') {
        Some(i) if i > 0 => &name[..i],
        _ => name,
    };
    stem.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("OEBPS/Text/Ch1.xhtml"), "oebps/text/ch1.xhtml");
        assert_eq!(normalize("OEBPS\\Images\\A.PNG"), "oebps/images/a.png");
        assert_eq!(normalize("/OEBPS//Text/./ch1.xhtml"), "oebps/text/ch1.xhtml");
    }

    #[test]
    fn test_normalize_decodes_percent_escapes() {
        assert_eq!(normalize("Images/My%20Pic.png"), "images/my pic.png");
        assert_eq!(normalize("a%2Fb"), "a/b");
        assert_eq!(normalize("a%5Cb"), "a/b");
        assert_eq!(normalize("a%2520b"), "a b");
    }

    #[test]
    fn test_normalize_traversal_never_escapes_root() {
        assert_eq!(normalize("Text/../Images/a.png"), "images/a.png");
        assert_eq!(normalize("../../a.png"), "a.png");
        assert_eq!(normalize("a/b/../../../c"), "c");
    }

    #[test]
    fn test_normalize_idempotent_examples() {
        for p in ["", "A\\B", "X/%41.png", "../a/./B", "/lead/Trail/", "a%2525b"] {
            let once = normalize(p);
            assert_eq!(normalize(&once), once, "input {:?}", p);
        }
    }

    #[test]
    fn test_split_ref_suffix() {
        assert_eq!(split_ref_suffix("ch1.xhtml#sec"), ("ch1.xhtml", "#sec"));
        assert_eq!(split_ref_suffix("a.css?v=2#x"), ("a.css", "?v=2#x"));
        assert_eq!(split_ref_suffix("a#b?c"), ("a", "#b?c"));
        assert_eq!(split_ref_suffix("plain.png"), ("plain.png", ""));
        assert_eq!(split_ref_suffix(""), ("", ""));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(""), RefKind::Empty);
        assert_eq!(classify("   "), RefKind::Empty);
        assert_eq!(classify("#note"), RefKind::Fragment);
        assert_eq!(classify("http://example.com/a.png"), RefKind::External);
        assert_eq!(classify("HTTPS://example.com"), RefKind::External);
        assert_eq!(classify("mailto:a@b.c"), RefKind::External);
        assert_eq!(classify("tel:123"), RefKind::External);
        assert_eq!(classify("data:image/png;base64,AAAA"), RefKind::External);
        assert_eq!(classify("../Images/a.png"), RefKind::Local);
        assert!(classify("a.xhtml#x").is_rewritable());
    }

    #[test]
    fn test_path_parts() {
        assert_eq!(parent_dir("OEBPS/Text/ch1.xhtml"), "OEBPS/Text");
        assert_eq!(parent_dir("ch1.xhtml"), "");
        assert_eq!(parent_dir("OEBPS/./content.opf"), "OEBPS");
        assert_eq!(join("", "a.xhtml"), "a.xhtml");
        assert_eq!(join("OEBPS", "a.xhtml"), "OEBPS/a.xhtml");
        assert_eq!(basename("OEBPS/Images/a.png"), "a.png");
        assert_eq!(basename("a\\b.png"), "b.png");
        assert_eq!(extension("Images/A.JPEG"), "jpeg");
        assert_eq!(extension(".hidden"), "");
        assert_eq!(stem("Text/TOC.xhtml"), "toc");
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(
            segments in prop::collection::vec(
                prop_oneof![
                    Just("..".to_string()),
                    Just(".".to_string()),
                    Just(String::new()),
                    "[A-Za-z0-9 _.-]{1,8}",
                    "%[0-9A-Fa-f]{2}",
                    "%25[0-9A-Fa-f]{2}",
                    "[a-zA-Z%\\\\]{1,6}",
                    "\\PC{1,4}",
                ],
                0..8
            ),
            sep in prop_oneof![Just("/"), Just("\\")],
            lead in any::<bool>(),
        ) {
            let mut p = segments.join(sep);
            if lead {
                p.insert(0, '/');
            }
            let once = normalize(&p);
            prop_assert_eq!(normalize(&once), once.clone());
            prop_assert!(!once.starts_with('/'));
            prop_assert!(once.split('/').all(|seg| seg != "." && seg != ".."));
        }

        #[test]
        fn prop_split_ref_suffix_reassembles(s in "\\PC{0,20}") {
            let (base, suffix) = split_ref_suffix(&s);
            prop_assert_eq!(format!("{}{}", base, suffix), s.clone());
            prop_assert!(!base.contains(['?', '#']));
        }
    }
}

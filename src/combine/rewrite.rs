//! Textual rewriting of references in XHTML and CSS.
//!
//! Rewriting is plain substitution over the serialized text: only the URL
//! inside a matched construct changes, every other byte is kept as-is. A
//! reference the [`ReferenceMapper`] cannot resolve is left untouched.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::mapper::ReferenceMapper;

/// `url(...)`, with double, single, or no quotes.
static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^)"']*?))\s*\)"#).expect("valid regex")
});

/// `@import "..."` / `@import '...'` (the `url()` form is covered above).
static CSS_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)@import\s+(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

/// URL-bearing attributes.
static URL_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:xlink:)?(?:src|href|poster)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("valid regex")
});

static SRCSET_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bsrcset\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

static STYLE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bstyle\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

static STYLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<style\b[^>]*>(.*?)</style\s*>"#).expect("valid regex")
});

/// Rewrite `url(...)` and `@import` references in a stylesheet, an inline
/// `style` value, or a `<style>` block body.
pub fn rewrite_css(css: &str, mapper: &ReferenceMapper, containing_path: &str) -> String {
    let lookup = |url: &str| mapper.lookup(url.trim(), containing_path);
    let css = replace_values(css, &CSS_URL, lookup);
    replace_values(&css, &CSS_IMPORT, lookup).into_owned()
}

/// Rewrite every reference in an XHTML document:
///
/// 1. `src`, `href`, `xlink:href`, and `poster` attributes
/// 2. `srcset` candidates (URL token only; descriptors kept)
/// 3. inline `style` attributes
/// 4. `<style>` block bodies
pub fn rewrite_html(html: &str, mapper: &ReferenceMapper, containing_path: &str) -> String {
    let html = replace_values(html, &URL_ATTR, |url| mapper.lookup(url, containing_path));

    let html = replace_values(&html, &SRCSET_ATTR, |srcset| {
        rewrite_srcset(srcset, mapper, containing_path)
    })
    .into_owned();

    let html = replace_values(&html, &STYLE_ATTR, |style| {
        changed(style, rewrite_css(style, mapper, containing_path))
    })
    .into_owned();

    replace_values(&html, &STYLE_BLOCK, |body| {
        changed(body, rewrite_css(body, mapper, containing_path))
    })
    .into_owned()
}

/// Rewrite the URL of each `srcset` candidate. Returns `None` when nothing
/// mapped, so the attribute stays byte-identical.
fn rewrite_srcset(
    srcset: &str,
    mapper: &ReferenceMapper,
    containing_path: &str,
) -> Option<String> {
    let mut any = false;
    let candidates: Vec<String> = srcset
        .split(',')
        .map(|candidate| {
            let rest = candidate.trim_start();
            let lead = &candidate[..candidate.len() - rest.len()];
            let url_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            let (url, descriptor) = rest.split_at(url_end);

            match mapper.lookup(url, containing_path) {
                Some(new_url) => {
                    any = true;
                    format!("{}{}{}", lead, new_url, descriptor)
                }
                None => candidate.to_string(),
            }
        })
        .collect();

    any.then(|| candidates.join(","))
}

fn changed(original: &str, rewritten: String) -> Option<String> {
    (rewritten != original).then_some(rewritten)
}

/// Replace the first participating capture group of each match with
/// `rewrite(value)`, keeping the rest of the match verbatim. Matches where
/// `rewrite` returns `None` are left as they are.
fn replace_values<'t, F>(text: &'t str, re: &Regex, mut rewrite: F) -> Cow<'t, str>
where
    F: FnMut(&str) -> Option<String>,
{
    re.replace_all(text, |caps: &Captures<'_>| {
        let whole = &caps[0];
        let (Some(outer), Some(value)) = (caps.get(0), caps.iter().skip(1).flatten().next()) else {
            return whole.to_string();
        };

        match rewrite(value.as_str()) {
            Some(new_value) => {
                let start = value.start() - outer.start();
                let end = value.end() - outer.start();
                format!("{}{}{}", &whole[..start], new_value, &whole[end..])
            }
            None => whole.to_string(),
        }
    })
}

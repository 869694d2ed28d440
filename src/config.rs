//! Options for a combine run.

use crate::epub::ContentFilter;

/// Default book title when neither the caller nor the first source has one.
pub const DEFAULT_TITLE: &str = "Combined EPUB";

/// Default heading of the generated table of contents.
pub const DEFAULT_HEADING: &str = "Contents";

/// Where the navigation heading comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "cli",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum HeadingSource {
    /// Use [`CombineConfig::toc_heading`] as given.
    #[default]
    Fixed,
    /// Use the title of the first source's own TOC document, if it has one.
    Source,
}

/// Configuration for [`crate::Combiner`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "cli",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct CombineConfig {
    /// Title of the combined book. Blank means "derive it".
    pub title: String,
    pub heading_source: HeadingSource,
    pub toc_heading: String,
    /// Label entries by document title/heading; otherwise `Section N`.
    pub use_chapter_titles: bool,
    pub exclude_nav: bool,
    pub exclude_toc: bool,
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            heading_source: HeadingSource::Fixed,
            toc_heading: DEFAULT_HEADING.to_string(),
            use_chapter_titles: true,
            exclude_nav: true,
            exclude_toc: true,
        }
    }
}

impl CombineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_heading_source(mut self, source: HeadingSource) -> Self {
        self.heading_source = source;
        self
    }

    pub fn with_toc_heading(mut self, heading: impl Into<String>) -> Self {
        self.toc_heading = heading.into();
        self
    }

    pub fn with_chapter_titles(mut self, enabled: bool) -> Self {
        self.use_chapter_titles = enabled;
        self
    }

    pub fn with_exclude_nav(mut self, exclude: bool) -> Self {
        self.exclude_nav = exclude;
        self
    }

    pub fn with_exclude_toc(mut self, exclude: bool) -> Self {
        self.exclude_toc = exclude;
        self
    }

    pub fn content_filter(&self) -> ContentFilter {
        ContentFilter {
            exclude_nav: self.exclude_nav,
            exclude_toc: self.exclude_toc,
        }
    }

    /// Fixed heading, or the default one if blank.
    pub fn heading(&self) -> &str {
        let heading = self.toc_heading.trim();
        if heading.is_empty() {
            DEFAULT_HEADING
        } else {
            heading
        }
    }

    /// Title to write, falling back to `source_title`, then [`DEFAULT_TITLE`].
    pub fn resolve_title(&self, source_title: Option<&str>) -> String {
        [Some(self.title.as_str()), source_title]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CombineConfig::default();
        assert_eq!(config.title, "Combined EPUB");
        assert_eq!(config.heading_source, HeadingSource::Fixed);
        assert_eq!(config.heading(), "Contents");
        assert!(config.use_chapter_titles);
        assert_eq!(config.content_filter(), ContentFilter::default());
    }

    #[test]
    fn test_builders() {
        let config = CombineConfig::new()
            .with_title("Omnibus")
            .with_heading_source(HeadingSource::Source)
            .with_toc_heading("  ")
            .with_chapter_titles(false)
            .with_exclude_nav(false);

        assert_eq!(config.title, "Omnibus");
        assert_eq!(config.heading_source, HeadingSource::Source);
        assert_eq!(config.heading(), "Contents");
        assert!(!config.use_chapter_titles);
        assert!(!config.content_filter().exclude_nav);
        assert!(config.content_filter().exclude_toc);
    }

    #[test]
    fn test_resolve_title() {
        let config = CombineConfig::new().with_title("Omnibus");
        assert_eq!(config.resolve_title(Some("First")), "Omnibus");

        let blank = CombineConfig::new().with_title(" ");
        assert_eq!(blank.resolve_title(Some(" First Book ")), "First Book");
        assert_eq!(blank.resolve_title(Some("")), "Combined EPUB");
        assert_eq!(blank.resolve_title(None), "Combined EPUB");
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_partial_json() {
        let config: CombineConfig =
            serde_json::from_str(r#"{"title": "Box Set", "heading_source": "source"}"#).unwrap();
        assert_eq!(config.title, "Box Set");
        assert_eq!(config.heading_source, HeadingSource::Source);
        assert_eq!(config.toc_heading, "Contents");
        assert!(config.exclude_toc);
    }
}

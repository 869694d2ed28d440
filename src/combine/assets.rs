//! Content-addressed asset naming shared across all sources of one run.

use std::collections::HashMap;

use crate::epub::ManifestItem;
use crate::error::Result;
use crate::path;
use crate::util::media_type;

use super::tree::OutputTree;

/// Image extensions collected from every source.
const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "webp", "bmp", "tif", "tiff",
];
const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "woff", "woff2"];
const STYLE_EXTENSIONS: &[&str] = &["css"];

/// Resource classes, each with its own directory and counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetClass {
    Image,
    Font,
    Style,
}

impl AssetClass {
    /// Collection order within a source: stylesheets last, since their
    /// `url()`s point at images and fonts.
    pub const ALL: [AssetClass; 3] = [AssetClass::Image, AssetClass::Font, AssetClass::Style];

    /// Classify an archive entry by extension.
    pub fn of(name: &str) -> Option<AssetClass> {
        let ext = path::extension(name);
        let ext = ext.as_str();
        if IMAGE_EXTENSIONS.contains(&ext) {
            Some(AssetClass::Image)
        } else if FONT_EXTENSIONS.contains(&ext) {
            Some(AssetClass::Font)
        } else if STYLE_EXTENSIONS.contains(&ext) {
            Some(AssetClass::Style)
        } else {
            None
        }
    }

    /// Directory under `OEBPS/`.
    pub fn dir(self) -> &'static str {
        match self {
            AssetClass::Image => "Images",
            AssetClass::Font => "Fonts",
            AssetClass::Style => "Styles",
        }
    }

    fn name_prefix(self) -> &'static str {
        match self {
            AssetClass::Image => "img",
            AssetClass::Font => "font",
            AssetClass::Style => "style",
        }
    }

    fn id_prefix(self) -> &'static str {
        match self {
            AssetClass::Image => "img",
            AssetClass::Font => "font",
            AssetClass::Style => "css",
        }
    }

    /// Output file name for the `n`th distinct asset of this class.
    /// Stylesheets are always `.css`; other classes keep the source extension.
    fn file_name(self, n: usize, original: &str) -> String {
        let ext = match self {
            AssetClass::Style => "css".to_string(),
            _ => path::extension(original),
        };
        if ext.is_empty() {
            format!("{}_{}", self.name_prefix(), n)
        } else {
            format!("{}_{}.{}", self.name_prefix(), n, ext)
        }
    }
}

/// One distinct asset in the combined package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    /// File name inside the class directory (`img_1.png`).
    pub name: String,
    /// Manifest id (`img_1`).
    pub id: String,
    pub media_type: &'static str,
    pub class: AssetClass,
}

impl AssetRecord {
    /// Href relative to `OEBPS/` (as listed in the manifest).
    pub fn package_href(&self) -> String {
        format!("{}/{}", self.class.dir(), self.name)
    }

    /// Href relative to any sibling directory of the class directory
    /// (`Text/`, `Styles/`), as written into rewritten references.
    pub fn relative_href(&self) -> String {
        format!("../{}", self.package_href())
    }
}

/// SHA-1 hex digest used as the content identity of an asset.
pub fn fingerprint(bytes: &[u8]) -> String {
    sha1_smol::Sha1::from(bytes).hexdigest()
}

/// Assigns one output name per distinct `(class, content)` pair.
///
/// Owned by a single combine run; identical bytes always map to the same
/// record for the lifetime of the store, whichever source they came from.
#[derive(Debug, Default)]
pub struct AssetStore {
    records: HashMap<(AssetClass, String), AssetRecord>,
    counters: HashMap<AssetClass, usize>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the record for `bytes`, allocating the next name for `class`
    /// on first sight. New assets are written into `tree` once and appended
    /// to `manifest`.
    pub fn assign(
        &mut self,
        class: AssetClass,
        original_name: &str,
        bytes: &[u8],
        tree: &OutputTree,
        manifest: &mut Vec<ManifestItem>,
    ) -> Result<AssetRecord> {
        let key = (class, fingerprint(bytes));
        if let Some(record) = self.records.get(&key) {
            tracing::debug!(
                original = original_name,
                existing = %record.name,
                "duplicate asset content"
            );
            return Ok(record.clone());
        }

        let counter = self.counters.entry(class).or_insert(0);
        *counter += 1;
        let n = *counter;

        let name = class.file_name(n, original_name);
        let record = AssetRecord {
            id: format!("{}_{}", class.id_prefix(), n),
            media_type: match class {
                AssetClass::Style => "text/css",
                _ => media_type(&name),
            },
            name,
            class,
        };

        tree.write(&format!("OEBPS/{}", record.package_href()), bytes)?;
        manifest.push(ManifestItem::new(
            record.id.clone(),
            record.package_href(),
            record.media_type,
        ));

        self.records.insert(key, record.clone());
        Ok(record)
    }

    /// Number of distinct assets of `class` assigned so far.
    pub fn count(&self, class: AssetClass) -> usize {
        self.counters.get(&class).copied().unwrap_or(0)
    }
}

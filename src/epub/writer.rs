//! Combined package documents (OPF, NCX, nav) and archive packaging.

use std::fs;
use std::io::{Seek, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::combine::OutputTree;
use crate::error::Result;
use crate::util::escape_xml;

/// The mimetype entry's exact content.
pub const MIMETYPE: &[u8] = b"application/epub+zip";

/// Language tag written for every combined book.
pub const LANGUAGE: &str = "en";

/// Container.xml template.
pub const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

/// Where the generated documents live inside the package.
pub const OPF_PATH: &str = "OEBPS/content.opf";
pub const NCX_PATH: &str = "OEBPS/toc.ncx";
pub const NAV_PATH: &str = "OEBPS/Text/nav.xhtml";

const DEFLATE_LEVEL: i64 = 6;

/// One declared resource of the combined package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    /// Href relative to `OEBPS/`.
    pub href: String,
    pub media_type: String,
    /// `properties` attribute (`nav` for the navigation document).
    pub properties: Option<String>,
}

impl ManifestItem {
    pub fn new(
        id: impl Into<String>,
        href: impl Into<String>,
        media_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
            properties: None,
        }
    }

    pub fn with_properties(mut self, properties: impl Into<String>) -> Self {
        self.properties = Some(properties.into());
        self
    }
}

/// One content document in final reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineEntry {
    /// Manifest id of the content file.
    pub id: String,
    /// Href relative to `OEBPS/` (`Text/3.xhtml`).
    pub href: String,
    /// Display label for both navigation documents.
    pub label: String,
}

/// Book-level metadata of the combined package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    pub title: String,
    /// `urn:uuid:...`
    pub identifier: String,
    /// `dcterms:modified`, UTC, second precision.
    pub modified: String,
}

impl PackageMetadata {
    /// Fresh metadata: random UUID identifier, modified now.
    pub fn generate(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            identifier: format!("urn:uuid:{}", uuid::Uuid::new_v4()),
            modified: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        }
    }
}

/// Generate content.opf: metadata, manifest (NCX first), and spine.
pub fn build_opf(
    meta: &PackageMetadata,
    manifest: &[ManifestItem],
    spine: &[SpineEntry],
) -> String {
    let mut opf = String::new();

    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="BookId" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
"#,
    );
    opf.push_str(&format!(
        "    <dc:title>{}</dc:title>\n",
        escape_xml(&meta.title)
    ));
    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape_xml(&meta.identifier)
    ));
    opf.push_str(&format!("    <dc:language>{}</dc:language>\n", LANGUAGE));
    opf.push_str(&format!(
        "    <meta property=\"dcterms:modified\">{}</meta>\n",
        escape_xml(&meta.modified)
    ));
    opf.push_str("  </metadata>\n  <manifest>\n");

    opf.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );
    for item in manifest {
        let properties = item
            .properties
            .as_deref()
            .map(|p| format!(" properties=\"{}\"", escape_xml(p)))
            .unwrap_or_default();
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\"{} media-type=\"{}\"/>\n",
            escape_xml(&item.id),
            escape_xml(&item.href),
            properties,
            escape_xml(&item.media_type)
        ));
    }

    opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");
    for entry in spine {
        opf.push_str(&format!(
            "    <itemref idref=\"{}\"/>\n",
            escape_xml(&entry.id)
        ));
    }
    opf.push_str("  </spine>\n</package>\n");
    opf
}

/// Generate the flat legacy toc.ncx, one navPoint per spine entry.
pub fn build_ncx(meta: &PackageMetadata, spine: &[SpineEntry]) -> String {
    let mut ncx = String::new();

    ncx.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
"#,
    );
    ncx.push_str(&format!(
        "    <meta name=\"dtb:uid\" content=\"{}\"/>\n",
        escape_xml(&meta.identifier)
    ));
    ncx.push_str(
        r#"    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
"#,
    );
    ncx.push_str(&format!(
        "  <docTitle><text>{}</text></docTitle>\n  <navMap>\n",
        escape_xml(&meta.title)
    ));

    for (i, entry) in spine.iter().enumerate() {
        let play_order = i + 1;
        ncx.push_str(&format!(
            "    <navPoint id=\"nav_{}\" playOrder=\"{}\">\n",
            play_order, play_order
        ));
        ncx.push_str(&format!(
            "      <navLabel><text>{}</text></navLabel>\n",
            escape_xml(&entry.label)
        ));
        ncx.push_str(&format!(
            "      <content src=\"{}\"/>\n",
            escape_xml(&entry.href)
        ));
        ncx.push_str("    </navPoint>\n");
    }

    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

/// Generate the EPUB3 navigation document. It lives next to the content
/// files, so its links are relative to `Text/`.
pub fn build_nav(title: &str, heading: &str, spine: &[SpineEntry]) -> String {
    let title = escape_xml(title);
    let heading = escape_xml(heading);

    let mut nav = String::new();
    nav.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head>
"#,
    );
    nav.push_str(&format!("  <title>{} - {}</title>\n", title, heading));
    nav.push_str("  <meta charset=\"utf-8\"/>\n</head>\n<body>\n");
    nav.push_str(&format!("  <h1>{}</h1>\n", title));
    nav.push_str("  <nav epub:type=\"toc\" id=\"toc\">\n");
    nav.push_str(&format!("    <h2>{}</h2>\n    <ol>\n", heading));

    for entry in spine {
        let href = entry
            .href
            .strip_prefix("Text/")
            .map(str::to_string)
            .unwrap_or_else(|| format!("../{}", entry.href));
        nav.push_str(&format!(
            "      <li><a href=\"{}\">{}</a></li>\n",
            escape_xml(&href),
            escape_xml(&entry.label)
        ));
    }

    nav.push_str("    </ol>\n  </nav>\n</body>\n</html>\n");
    nav
}

/// Zip the working tree into an EPUB.
///
/// `mimetype` goes first, stored, with its fixed content; every other file
/// follows in lexical path order, deflated. Entry timestamps are pinned so
/// identical trees produce identical archives.
pub fn write_package<W: Write + Seek>(tree: &OutputTree, writer: W) -> Result<W> {
    let mut zip = ZipWriter::new(writer);

    let stored = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);
    let deflated = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(DEFLATE_LEVEL))
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    zip.start_file("mimetype", stored)?;
    zip.write_all(MIMETYPE)?;

    for rel_path in tree.files()? {
        if rel_path == "mimetype" {
            continue;
        }
        let data = fs::read(tree.resolve(&rel_path))?;
        zip.start_file(rel_path.as_str(), deflated)?;
        zip.write_all(&data)?;
    }

    Ok(zip.finish()?)
}

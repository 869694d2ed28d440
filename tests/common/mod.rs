//! Small in-memory EPUB fixtures for integration tests.

#![allow(dead_code)]

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR shared-image-bytes";

/// Builds a source EPUB entry by entry, in insertion order.
#[derive(Default)]
pub struct EpubBuilder {
    entries: Vec<(String, Vec<u8>)>,
    stored: bool,
}

impl EpubBuilder {
    /// `mimetype` plus a container.xml pointing at `opf_path`.
    pub fn with_container(opf_path: &str) -> Self {
        Self::default()
            .file("mimetype", "application/epub+zip")
            .file("META-INF/container.xml", container_xml(opf_path))
    }

    pub fn file(mut self, name: &str, data: impl AsRef<[u8]>) -> Self {
        self.entries.push((name.to_string(), data.as_ref().to_vec()));
        self
    }

    /// Store every entry uncompressed, so entry data can be found (and
    /// damaged) in the raw archive bytes.
    pub fn stored(mut self) -> Self {
        self.stored = true;
        self
    }

    pub fn write_to(&self, path: &Path) -> PathBuf {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        let method = if self.stored {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };
        let options = SimpleFileOptions::default().compression_method(method);
        for (name, data) in &self.entries {
            zip.start_file(name.as_str(), options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
        path.to_path_buf()
    }
}

pub fn container_xml(opf_path: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="{opf_path}" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#
    )
}

/// Package document with one manifest item per `(id, href)` and the given
/// spine order.
pub fn opf(title: &str, items: &[(&str, &str)], spine: &[&str]) -> String {
    let manifest: String = items
        .iter()
        .map(|(id, href)| {
            format!(
                "    <item id=\"{id}\" href=\"{href}\" media-type=\"application/xhtml+xml\"/>\n"
            )
        })
        .collect();
    let itemrefs: String = spine
        .iter()
        .map(|id| format!("    <itemref idref=\"{id}\"/>\n"))
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{title}</dc:title>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine>
{itemrefs}  </spine>
</package>"#
    )
}

/// XHTML document with an optional `<title>` and the given body markup.
pub fn xhtml(title: Option<&str>, body: &str) -> String {
    let head = title
        .map(|t| format!("<title>{t}</title>"))
        .unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>{head}</head>
<body>
{body}
</body>
</html>"#
    )
}

/// All entries of a written archive, in archive order.
pub struct Output {
    archive: ZipArchive<File>,
}

impl Output {
    pub fn open(path: &Path) -> Self {
        Self {
            archive: ZipArchive::new(File::open(path).unwrap()).unwrap(),
        }
    }

    pub fn names(&mut self) -> Vec<String> {
        (0..self.archive.len())
            .map(|i| self.archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    pub fn text(&mut self, name: &str) -> String {
        let mut file = self.archive.by_name(name).unwrap();
        let mut text = String::new();
        file.read_to_string(&mut text).unwrap();
        text
    }

    pub fn bytes(&mut self, name: &str) -> Vec<u8> {
        let mut file = self.archive.by_name(name).unwrap();
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        data
    }

    pub fn has(&mut self, name: &str) -> bool {
        self.archive.by_name(name).is_ok()
    }

    pub fn archive(&mut self) -> &mut ZipArchive<File> {
        &mut self.archive
    }
}

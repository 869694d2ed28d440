//! EPUB parsing utilities (container.xml, OPF)

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};

/// Fixed location of the container descriptor.
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Parsed OPF package data: just what combining needs.
#[derive(Debug, Default)]
pub struct PackageDocument {
    /// First `dc:title`, if any.
    pub title: Option<String>,
    /// Maps manifest id -> item.
    pub manifest: HashMap<String, ManifestEntry>,
    /// Spine `idref`s in reading order.
    pub spine_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Href relative to the OPF directory, entity-unescaped.
    pub href: String,
    pub media_type: String,
}

impl PackageDocument {
    /// Spine hrefs (relative to the OPF directory) in reading order.
    /// Idrefs with no manifest entry are skipped.
    pub fn spine_hrefs(&self) -> impl Iterator<Item = &str> {
        self.spine_ids
            .iter()
            .filter_map(|id| self.manifest.get(id))
            .map(|item| item.href.as_str())
            .filter(|href| !href.is_empty())
    }
}

/// Parse META-INF/container.xml to find the OPF path.
pub fn parse_container_xml(bytes: &[u8]) -> Result<String> {
    let content = String::from_utf8(strip_bom(bytes).to_vec())?;

    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if local_name(e.name().as_ref()) == b"rootfile" =>
            {
                if let Some(path) = attr_value(&e, b"full-path")?
                    && !path.is_empty()
                {
                    return Ok(path);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Err(Error::MissingElement("rootfile in container.xml".to_string()))
}

/// Parse OPF package document.
pub fn parse_opf(content: &str) -> Result<PackageDocument> {
    // No text trimming: it would eat the spaces around entity references in titles.
    let mut reader = Reader::from_str(content);

    let mut package = PackageDocument::default();
    let mut saw_package = false;
    let mut in_metadata = false;
    let mut in_title = false;
    let mut buf_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"package" => saw_package = true,
                    b"metadata" => in_metadata = true,
                    b"title" if in_metadata && package.title.is_none() => {
                        in_title = true;
                        buf_text.clear();
                    }
                    // Some generators write <item ...></item> instead of <item/>
                    b"item" => add_manifest_item(&mut package, &e)?,
                    b"itemref" => add_itemref(&mut package, &e)?,
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"item" => add_manifest_item(&mut package, &e)?,
                    b"itemref" => add_itemref(&mut package, &e)?,
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if in_title {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_title {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        buf_text.push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"metadata" => in_metadata = false,
                    b"title" if in_title => {
                        in_title = false;
                        let title = buf_text.split_whitespace().collect::<Vec<_>>().join(" ");
                        if !title.is_empty() {
                            package.title = Some(title);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    if !saw_package {
        return Err(Error::InvalidEpub("no <package> element in OPF".to_string()));
    }
    Ok(package)
}

fn add_manifest_item(package: &mut PackageDocument, e: &BytesStart<'_>) -> Result<()> {
    let id = attr_value(e, b"id")?.unwrap_or_default();
    let href = attr_value(e, b"href")?.unwrap_or_default();
    let media_type = attr_value(e, b"media-type")?.unwrap_or_default();

    if !id.is_empty() && !href.is_empty() {
        package.manifest.insert(id, ManifestEntry { href, media_type });
    }
    Ok(())
}

fn add_itemref(package: &mut PackageDocument, e: &BytesStart<'_>) -> Result<()> {
    if let Some(idref) = attr_value(e, b"idref")?
        && !idref.is_empty()
    {
        package.spine_ids.push(idref);
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

/// Look up an attribute by exact key and unescape its value.
fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            let raw = String::from_utf8(attr.value.to_vec())?;
            return Ok(Some(html_escape::decode_html_entities(&raw).into_owned()));
        }
    }
    Ok(None)
}

/// Strip UTF-8 BOM if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}

/// Extract local name from namespaced XML name (e.g., "dc:title" -> "title").
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Resolve XML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    let code = if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        entity.strip_prefix('#')?.parse::<u32>().ok()?
    };
    char::from_u32(code).map(|c| c.to_string())
}

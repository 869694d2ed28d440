//! EPUB container plumbing: reading source archives and writing the
//! combined package.

mod parser;
mod reader;
mod writer;

pub use parser::{
    CONTAINER_PATH, ManifestEntry, PackageDocument, parse_container_xml, parse_opf, strip_bom,
};
pub use reader::{
    ContentFilter, SourceArchive, is_content_file, is_nav_doc, is_toc_doc, order_content,
    spine_paths,
};
pub use writer::{
    CONTAINER_XML, LANGUAGE, MIMETYPE, ManifestItem, NAV_PATH, NCX_PATH, OPF_PATH,
    PackageMetadata, SpineEntry, build_nav, build_ncx, build_opf, write_package,
};

//! The combine operation.
//!
//! Sources are processed strictly one after another. Per source: resolve
//! the reading order, collect images and fonts, rewrite and collect
//! stylesheets, number the content documents, then rewrite and emit them.
//! Once every source is in, the package documents are generated and the
//! working tree is zipped to the destination.

mod assets;
mod label;
mod mapper;
mod rewrite;
mod tree;

pub use assets::{AssetClass, AssetRecord, AssetStore, fingerprint};
pub use label::{detect_toc_heading, extract_doc_label, section_label};
pub use mapper::ReferenceMapper;
pub use rewrite::{rewrite_css, rewrite_html};
pub use tree::OutputTree;

use std::fs;
use std::io::{BufWriter, Read, Seek};
use std::path::{Path, PathBuf};

use crate::config::{CombineConfig, HeadingSource};
use crate::epub::{
    CONTAINER_PATH, CONTAINER_XML, ManifestItem, NAV_PATH, NCX_PATH, OPF_PATH, PackageMetadata,
    SourceArchive, SpineEntry, build_nav, build_ncx, build_opf, order_content, spine_paths,
    write_package,
};
use crate::error::{Error, Result};
use crate::util::SourceText;

const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

/// Receives coarse `(percent, stage)` updates while a combine runs.
pub trait Progress {
    fn report(&mut self, percent: u8, message: &str);
}

impl<F: FnMut(u8, &str)> Progress for F {
    fn report(&mut self, percent: u8, message: &str) {
        self(percent, message)
    }
}

/// Discards all progress updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&mut self, _percent: u8, _message: &str) {}
}

/// Merges EPUBs according to a [`CombineConfig`].
#[derive(Debug, Clone, Default)]
pub struct Combiner {
    config: CombineConfig,
}

impl Combiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CombineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CombineConfig {
        &self.config
    }

    /// Combine `sources`, in the given order, into one EPUB at `output`.
    ///
    /// Sources that are not readable archives are skipped with a warning.
    /// The destination is only created once the whole package has been
    /// written; on error nothing is left at `output`. Returns the absolute
    /// path of the written file.
    pub fn combine<P: AsRef<Path>>(
        &self,
        sources: &[P],
        output: impl AsRef<Path>,
        progress: &mut dyn Progress,
    ) -> Result<PathBuf> {
        if sources.is_empty() {
            return Err(Error::NoSources);
        }
        let output = output.as_ref();

        let mut ctx = CombineContext::new(&self.config)?;
        let total = sources.len();

        for (idx, source_path) in sources.iter().enumerate() {
            let source_path = source_path.as_ref();
            let percent = (idx * 90 / total) as u8;
            progress.report(percent, &format!("Processing {}…", display_name(source_path)));

            let mut source = match SourceArchive::open(source_path) {
                Ok(source) => source,
                Err(e) => {
                    tracing::warn!(
                        source = %source_path.display(),
                        "skipping unreadable archive: {e}"
                    );
                    continue;
                }
            };
            ctx.add_source(&mut source)?;
        }

        progress.report(90, "Writing EPUB package…");
        let written = ctx.finish(output)?;
        progress.report(100, "Done!");

        Ok(written)
    }
}

/// Combine `sources` into `output` with `config`. See [`Combiner::combine`].
pub fn combine_epubs<P: AsRef<Path>>(
    sources: &[P],
    output: impl AsRef<Path>,
    config: &CombineConfig,
    progress: &mut dyn Progress,
) -> Result<PathBuf> {
    Combiner::with_config(config.clone()).combine(sources, output, progress)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// State of one in-flight combine call.
struct CombineContext<'a> {
    config: &'a CombineConfig,
    tree: OutputTree,
    assets: AssetStore,
    manifest: Vec<ManifestItem>,
    spine: Vec<SpineEntry>,
    heading: String,
    /// `dc:title` of the first readable source.
    source_title: Option<String>,
    sources_seen: usize,
}

impl<'a> CombineContext<'a> {
    fn new(config: &'a CombineConfig) -> Result<Self> {
        Ok(Self {
            config,
            tree: OutputTree::new()?,
            assets: AssetStore::new(),
            manifest: Vec::new(),
            spine: Vec::new(),
            heading: config.heading().to_string(),
            source_title: None,
            sources_seen: 0,
        })
    }

    fn add_source<R: Read + Seek>(&mut self, source: &mut SourceArchive<R>) -> Result<()> {
        let first = self.sources_seen == 0;
        self.sources_seen += 1;

        if first
            && self.config.heading_source == HeadingSource::Source
            && let Some(heading) = detect_toc_heading(source)
        {
            tracing::debug!(%heading, "using navigation heading from first source");
            self.heading = heading;
        }

        let package = source.package();
        let spine = package
            .as_ref()
            .map(|(opf_path, package)| spine_paths(opf_path, package))
            .unwrap_or_default();
        if first {
            self.source_title = package.and_then(|(_, package)| package.title);
        }

        let ordered = order_content(source.entries(), &spine, &self.config.content_filter());
        tracing::debug!(
            source = %source.path().display(),
            spine_len = spine.len(),
            content = ordered.len(),
            "resolved reading order"
        );

        // Unreadable documents drop out here, before anything is numbered
        let documents: Vec<(String, SourceText)> = ordered
            .into_iter()
            .filter_map(|name| {
                let bytes = read_entry(source, &name)?;
                Some((name, SourceText::decode(&bytes)))
            })
            .collect();

        let mut mapper = ReferenceMapper::new();
        self.collect_assets(source, &mut mapper)?;

        let start = self.spine.len();
        for (i, (name, _)) in documents.iter().enumerate() {
            mapper.add(name, format!("../Text/{}.xhtml", start + i + 1));
        }
        mapper.finalize();

        for (i, (name, doc)) in documents.iter().enumerate() {
            let n = start + i + 1;
            let label = if self.config.use_chapter_titles {
                extract_doc_label(&doc.text).unwrap_or_else(|| section_label(n))
            } else {
                section_label(n)
            };

            let rewritten = rewrite_html(&doc.text, &mapper, name);
            let href = format!("Text/{}.xhtml", n);
            self.tree.write(&format!("OEBPS/{}", href), &doc.encode(&rewritten))?;

            let id = format!("chapter_{}", n);
            let item = ManifestItem::new(id.clone(), href.clone(), XHTML_MEDIA_TYPE);
            self.manifest.push(item);
            self.spine.push(SpineEntry { id, href, label });
        }

        Ok(())
    }

    /// Images, then fonts, then stylesheets. Stylesheets are rewritten
    /// against the image/font mappings before they are fingerprinted.
    fn collect_assets<R: Read + Seek>(
        &mut self,
        source: &mut SourceArchive<R>,
        mapper: &mut ReferenceMapper,
    ) -> Result<()> {
        let entries = source.entries().to_vec();

        for class in AssetClass::ALL {
            if class == AssetClass::Style {
                mapper.finalize();
            }

            for name in entries.iter().filter(|n| AssetClass::of(n) == Some(class)) {
                let Some(bytes) = read_entry(source, name) else {
                    continue;
                };
                let bytes = match class {
                    AssetClass::Style => {
                        let sheet = SourceText::decode(&bytes);
                        sheet.encode(&rewrite_css(&sheet.text, mapper, name))
                    }
                    _ => bytes,
                };

                let record =
                    self.assets.assign(class, name, &bytes, &self.tree, &mut self.manifest)?;
                mapper.add(name, record.relative_href());
            }
        }

        Ok(())
    }

    /// Generate the package documents and zip the tree to `output`.
    fn finish(mut self, output: &Path) -> Result<PathBuf> {
        let title = self.config.resolve_title(self.source_title.as_deref());
        let meta = PackageMetadata::generate(title);

        self.tree.write(
            NAV_PATH,
            build_nav(&meta.title, &self.heading, &self.spine).as_bytes(),
        )?;
        self.manifest.push(
            ManifestItem::new("nav", "Text/nav.xhtml", XHTML_MEDIA_TYPE).with_properties("nav"),
        );

        self.tree.write(CONTAINER_PATH, CONTAINER_XML.as_bytes())?;
        self.tree.write(
            OPF_PATH,
            build_opf(&meta, &self.manifest, &self.spine).as_bytes(),
        )?;
        self.tree.write(NCX_PATH, build_ncx(&meta, &self.spine).as_bytes())?;

        tracing::debug!(
            chapters = self.spine.len(),
            images = self.assets.count(AssetClass::Image),
            fonts = self.assets.count(AssetClass::Font),
            styles = self.assets.count(AssetClass::Style),
            "packaging"
        );

        persist_package(&self.tree, output)
    }
}

fn read_entry<R: Read + Seek>(source: &mut SourceArchive<R>, name: &str) -> Option<Vec<u8>> {
    match source.read(name) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!(
                source = %source.path().display(),
                entry = name,
                "skipping unreadable entry: {e}"
            );
            None
        }
    }
}

/// Zip into a temp file beside `output`, then move it into place.
fn persist_package(tree: &OutputTree, output: &Path) -> Result<PathBuf> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = tempfile::Builder::new()
        .prefix(".epub_combine_")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    {
        let writer = write_package(tree, BufWriter::new(staged.as_file_mut()))?;
        writer.into_inner().map_err(|e| e.into_error())?;
    }
    staged.persist(output).map_err(|e| e.error)?;

    Ok(fs::canonicalize(output)?)
}

//! # epub-combine
//!
//! Merge several EPUB files into one self-consistent EPUB.
//!
//! ## Features
//!
//! - Keeps each source's own reading order (its package spine)
//! - Deduplicates images, fonts, and stylesheets by content across sources
//! - Rewrites every internal reference (attributes, `srcset`, inline and
//!   embedded CSS, stylesheets) to the renamed files
//! - Generates a fresh package document, NCX, and EPUB3 navigation document
//!
//! ## Quick Start
//!
//! ```no_run
//! use epub_combine::{CombineConfig, NoProgress, combine_epubs};
//!
//! let config = CombineConfig::new().with_title("The Complete Trilogy");
//! let written = combine_epubs(
//!     &["book1.epub", "book2.epub", "book3.epub"],
//!     "trilogy.epub",
//!     &config,
//!     &mut NoProgress,
//! )
//! .unwrap();
//! println!("wrote {}", written.display());
//! ```
//!
//! ## Progress
//!
//! Any `FnMut(u8, &str)` closure can observe a run:
//!
//! ```no_run
//! use epub_combine::Combiner;
//!
//! let mut report = |pct: u8, msg: &str| eprintln!("[{pct:3}%] {msg}");
//! Combiner::new()
//!     .combine(&["a.epub", "b.epub"], "out.epub", &mut report)
//!     .unwrap();
//! ```

pub mod combine;
pub mod config;
pub mod epub;
pub mod error;
pub mod path;
pub mod util;

pub use combine::{Combiner, NoProgress, Progress, combine_epubs};
pub use config::{CombineConfig, HeadingSource};
pub use error::{Error, Result};

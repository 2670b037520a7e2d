//! # bookslice
//!
//! Split EPUB books into chapters at their table-of-contents anchors.
//!
//! ## Features
//!
//! - Read EPUB 2/3 packages: metadata, manifest, spine, NCX or nav TOC
//! - Detect the text encoding of each content document (BOM, UTF-8,
//!   declared charset, Windows-1252 fallback)
//! - Flatten the TOC into `parent|child` titled bookmarks
//! - Slice the text between consecutive bookmarks, across documents
//! - Export chapters as pretty-printed JSON
//!
//! ## Quick Start
//!
//! ```no_run
//! use bookslice::{read_epub, save_chapters, split_book};
//!
//! let book = read_epub("input.epub")?;
//! let chapters = split_book(&book, |chapter| println!("{}", chapter.title));
//! save_chapters("out/input.json", &chapters)?;
//! # Ok::<(), bookslice::Error>(())
//! ```
//!
//! ## Slicing your own documents
//!
//! Anything implementing [`DocumentStore`] can be sliced:
//!
//! ```
//! use bookslice::{ChapterSlicer, MemoryStore, TocNode, extract_bookmarks};
//!
//! let store = MemoryStore::new().with_document(
//!     "text/ch1.html",
//!     r#"<h1 id="a">One</h1><p>1</p><h1 id="b">Two</h1><p>2</p>"#,
//! );
//! let toc = vec![
//!     TocNode::Leaf { title: "One".into(), href: "ch1.html#a".into() },
//!     TocNode::Leaf { title: "Two".into(), href: "ch1.html#b".into() },
//! ];
//!
//! let chapters = ChapterSlicer::new(&store).split(&extract_bookmarks(&toc), |_| {});
//! assert_eq!(chapters[0].content, "One\n1");
//! assert_eq!(chapters[1].content, "Two\n2");
//! ```

pub mod book;
pub mod dom;
pub mod epub;
pub mod error;
pub mod export;
pub mod slice;
mod util;

pub use book::{Book, ManifestItem, Metadata, Resource, SpineItem, TocEntry};
pub use epub::{read_epub, read_epub_from_reader};
pub use error::{Error, Result};
pub use export::{JsonConfig, JsonExporter, save_chapters};
pub use slice::{
    AnchorRef, Bookmark, Chapter, ChapterEnd, ChapterSlicer, DocumentStore, MemoryStore, TocNode,
    extract_bookmarks, split_book,
};

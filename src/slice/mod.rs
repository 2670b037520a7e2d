//! Splitting a book into chapters at its table-of-contents anchors.
//!
//! The pipeline is:
//! 1. [`extract_bookmarks`] flattens the table of contents into titled
//!    [`AnchorRef`]s;
//! 2. [`ChapterSlicer`] takes each bookmark and the next one as a span and
//!    collects the text between them, walking as many documents as needed.

mod bookmark;
mod extract;
mod slicer;

pub use bookmark::{AnchorRef, Bookmark, TocNode, extract_bookmarks};
pub use extract::{document_text, text_after_anchor, text_before_anchor, text_between_anchors};
pub use slicer::{Chapter, ChapterEnd, ChapterSlicer, DocumentStore, MemoryStore, split_book};

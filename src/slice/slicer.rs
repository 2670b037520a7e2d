//! Chapter slicing across the documents of a book.

use std::collections::HashMap;

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::book::Book;
use crate::dom::{self, ArenaDom};
use crate::slice::bookmark::{AnchorRef, Bookmark, TocNode, extract_bookmarks};
use crate::slice::extract::{
    document_text, text_after_anchor, text_before_anchor, text_between_anchors,
};

/// Named content documents in collection order.
///
/// Decoding and parsing have default implementations; stores override them
/// when they know better (a declared charset, a pre-parsed tree, ...).
pub trait DocumentStore {
    /// Every content document as `(name, raw bytes)`, in collection order.
    fn documents(&self) -> impl Iterator<Item = (&str, &[u8])> + '_;

    /// Guess the text encoding of a document's bytes.
    fn detect_encoding(&self, bytes: &[u8]) -> &'static Encoding {
        dom::detect_encoding(bytes)
    }

    /// Decode and parse a document into a tree.
    fn parse(&self, bytes: &[u8], encoding: &'static Encoding) -> ArenaDom {
        dom::parse_content(&dom::decode_document(bytes, encoding))
    }
}

impl DocumentStore for Book {
    fn documents(&self) -> impl Iterator<Item = (&str, &[u8])> + '_ {
        self.content_documents()
    }
}

/// A list of named documents held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Vec<(String, Vec<u8>)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.documents.push((name.into(), data.into()));
        self
    }
}

impl DocumentStore for MemoryStore {
    fn documents(&self) -> impl Iterator<Item = (&str, &[u8])> + '_ {
        self.documents
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice()))
    }
}

/// Where a chapter stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterEnd<'a> {
    /// At the next bookmark's start position.
    Anchor(&'a AnchorRef),
    /// After the last document of the book.
    EndOfBook,
}

/// A sliced chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub content: String,
}

/// Slices chapter text out of a [`DocumentStore`].
///
/// A document name in an [`AnchorRef`] matches every stored name that
/// contains it, so `ch1.xhtml` finds `OEBPS/Text/ch1.xhtml`; the first match
/// in collection order is used. Documents are parsed the first time a slice
/// touches them and kept for later chapters.
pub struct ChapterSlicer<'a, S: DocumentStore> {
    store: &'a S,
    documents: Vec<(&'a str, &'a [u8])>,
    parsed: HashMap<usize, ArenaDom>,
}

impl<'a, S: DocumentStore> ChapterSlicer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            documents: store.documents().collect(),
            parsed: HashMap::new(),
        }
    }

    /// Slice one chapter per bookmark. `progress` sees each chapter as soon
    /// as it is done.
    pub fn split(
        &mut self,
        bookmarks: &[Bookmark],
        mut progress: impl FnMut(&Chapter),
    ) -> Vec<Chapter> {
        let mut chapters = Vec::with_capacity(bookmarks.len());

        for (i, bookmark) in bookmarks.iter().enumerate() {
            let end = match bookmarks.get(i + 1) {
                Some(next) => ChapterEnd::Anchor(&next.anchor_ref),
                None => ChapterEnd::EndOfBook,
            };
            let chapter = Chapter {
                title: bookmark.title.clone(),
                content: self.extract_text(&bookmark.anchor_ref, end),
            };
            progress(&chapter);
            chapters.push(chapter);
        }

        chapters
    }

    /// Text from `start` up to `end`, trimmed.
    ///
    /// Lookup misses are logged and never fail: an unknown start document
    /// yields an empty string, an unknown end document lets the scan run to
    /// the end of the book.
    pub fn extract_text(&mut self, start: &AnchorRef, end: ChapterEnd<'_>) -> String {
        if let ChapterEnd::Anchor(end) = end
            && end.document_name == start.document_name
        {
            let Some(index) = self.position(&start.document_name) else {
                log::warn!("document {} not found", start.document_name);
                return String::new();
            };
            let dom = self.dom(index);
            return text_between_anchors(dom, start.anchor_id(), end.anchor_id())
                .trim()
                .to_string();
        }

        self.scan(start, end)
    }

    /// Walk the documents from the start document to the end document.
    fn scan(&mut self, start: &AnchorRef, end: ChapterEnd<'_>) -> String {
        let Some(first) = self.position(&start.document_name) else {
            log::warn!("document {} not found", start.document_name);
            return String::new();
        };

        let mut parts = Vec::new();
        let dom = self.dom(first);
        parts.push(match start.anchor_id() {
            Some(anchor) => text_after_anchor(dom, anchor),
            None => document_text(dom),
        });

        let mut reached_end = false;
        for index in first + 1..self.documents.len() {
            let name = self.documents[index].0;
            if let ChapterEnd::Anchor(end) = end
                && name.contains(end.document_name.as_str())
            {
                if let Some(anchor) = end.anchor_id() {
                    parts.push(text_before_anchor(self.dom(index), anchor));
                }
                reached_end = true;
                break;
            }
            log::debug!("including all of {name}");
            parts.push(document_text(self.dom(index)));
        }

        if let ChapterEnd::Anchor(end) = end
            && !reached_end
        {
            log::debug!(
                "end document {} not found after {}; took the rest of the book",
                end.document_name,
                start.document_name
            );
        }

        join_fragments(&parts)
    }

    /// Index of the first document whose name contains `document_name`.
    fn position(&self, document_name: &str) -> Option<usize> {
        self.documents
            .iter()
            .position(|(name, _)| name.contains(document_name))
    }

    fn dom(&mut self, index: usize) -> &ArenaDom {
        let store = self.store;
        let (name, bytes) = self.documents[index];
        self.parsed.entry(index).or_insert_with(|| {
            let encoding = store.detect_encoding(bytes);
            log::debug!("parsing {name} as {}", encoding.name());
            store.parse(bytes, encoding)
        })
    }
}

fn join_fragments(parts: &[String]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Flatten the book's table of contents and slice one chapter per entry.
pub fn split_book(book: &Book, progress: impl FnMut(&Chapter)) -> Vec<Chapter> {
    let bookmarks = extract_bookmarks(&TocNode::from_entries(&book.toc));
    ChapterSlicer::new(book).split(&bookmarks, progress)
}

//! Flattening a table of contents into ordered bookmarks.

use percent_encoding::percent_decode_str;

use crate::book::TocEntry;

/// A table-of-contents node as seen by the slicer.
///
/// Entries that have children are groups. A group only lends its title to
/// its children; its own target is not a bookmark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TocNode {
    Leaf { title: String, href: String },
    Group { title: String, children: Vec<TocNode> },
}

impl TocNode {
    /// Convert the reader's hierarchical entries.
    pub fn from_entries(entries: &[TocEntry]) -> Vec<TocNode> {
        entries
            .iter()
            .map(|entry| {
                if entry.children.is_empty() {
                    TocNode::Leaf {
                        title: entry.title.clone(),
                        href: entry.href.clone(),
                    }
                } else {
                    TocNode::Group {
                        title: entry.title.clone(),
                        children: Self::from_entries(&entry.children),
                    }
                }
            })
            .collect()
    }
}

/// A position in the book: a content document plus an optional element id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnchorRef {
    pub document_name: String,
    pub anchor_id: Option<String>,
}

impl AnchorRef {
    /// Split an href such as `Text/ch01.xhtml#sec2` at the fragment separator.
    ///
    /// Both halves are percent-decoded. An empty fragment counts as absent.
    pub fn parse(href: &str) -> Self {
        let (document, fragment) = match href.split_once('#') {
            Some((document, fragment)) => (document, Some(fragment)),
            None => (href, None),
        };

        AnchorRef {
            document_name: percent_decode_str(document).decode_utf8_lossy().into_owned(),
            anchor_id: fragment
                .filter(|f| !f.is_empty())
                .map(|f| percent_decode_str(f).decode_utf8_lossy().into_owned()),
        }
    }

    pub fn anchor_id(&self) -> Option<&str> {
        self.anchor_id.as_deref()
    }
}

/// A titled chapter start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub title: String,
    pub anchor_ref: AnchorRef,
}

/// Flatten a table of contents depth-first into bookmarks.
///
/// Nested leaves are titled `parent|child`, where `parent` is the immediate
/// group only. Within one sibling list a title seen before gets the count of
/// its earlier occurrences plus one appended: `A, A, A` becomes `A, A2, A3`.
pub fn extract_bookmarks(toc: &[TocNode]) -> Vec<Bookmark> {
    flatten(toc, None)
}

fn flatten(nodes: &[TocNode], prefix: Option<&str>) -> Vec<Bookmark> {
    let mut bookmarks = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    for node in nodes {
        match node {
            TocNode::Leaf { title, href } => {
                let candidate = match prefix {
                    Some(prefix) => format!("{prefix}|{title}"),
                    None => title.clone(),
                };
                let prior = seen.iter().filter(|t| **t == candidate).count();
                seen.push(candidate.clone());

                let title = if prior == 0 {
                    candidate
                } else {
                    format!("{candidate}{}", prior + 1)
                };
                bookmarks.push(Bookmark {
                    title,
                    anchor_ref: AnchorRef::parse(href),
                });
            }
            TocNode::Group { title, children } => {
                bookmarks.extend(flatten(children, Some(title.as_str())));
            }
        }
    }

    bookmarks
}

use std::collections::HashMap;

/// In-memory view of an EPUB package.
///
/// Resources are keyed by their full path inside the archive
/// (e.g. `OEBPS/Text/ch01.xhtml`). The manifest keeps package order, which is
/// the order content documents are scanned in when slicing chapters.
#[derive(Debug, Clone, Default)]
pub struct Book {
    pub metadata: Metadata,
    pub manifest: Vec<ManifestItem>,
    pub spine: Vec<SpineItem>,
    pub toc: Vec<TocEntry>,
    pub resources: HashMap<String, Resource>,
}

/// Book metadata (Dublin Core subset)
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: String,
    pub authors: Vec<String>,
    pub language: String,
    pub identifier: String,
    pub publisher: Option<String>,
    pub description: Option<String>,
    pub subjects: Vec<String>,
    pub date: Option<String>,
    pub rights: Option<String>,
    pub cover_image: Option<String>,
}

/// An entry of the OPF manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    /// Full archive path of the item.
    pub path: String,
    pub media_type: String,
}

impl ManifestItem {
    /// Whether the item is an (X)HTML content document.
    pub fn is_document(&self) -> bool {
        matches!(
            self.media_type.as_str(),
            "application/xhtml+xml" | "text/html"
        )
    }
}

/// An item in the reading order (spine)
#[derive(Debug, Clone)]
pub struct SpineItem {
    pub id: String,
    pub path: String,
    pub media_type: String,
    pub linear: bool,
}

/// A table of contents entry (hierarchical)
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TocEntry {
    pub title: String,
    pub href: String,
    pub children: Vec<TocEntry>,
    /// Play order for sorting (from NCX playOrder attribute)
    pub play_order: Option<usize>,
}

/// Raw bytes of an archive member plus its declared media type.
#[derive(Debug, Clone)]
pub struct Resource {
    pub data: Vec<u8>,
    pub media_type: String,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource to the book
    pub fn add_resource(
        &mut self,
        path: impl Into<String>,
        data: Vec<u8>,
        media_type: impl Into<String>,
    ) {
        self.resources.insert(
            path.into(),
            Resource {
                data,
                media_type: media_type.into(),
            },
        );
    }

    /// Add a spine item
    pub fn add_spine_item(
        &mut self,
        id: impl Into<String>,
        path: impl Into<String>,
        media_type: impl Into<String>,
    ) {
        self.spine.push(SpineItem {
            id: id.into(),
            path: path.into(),
            media_type: media_type.into(),
            linear: true,
        });
    }

    /// Content documents in manifest order, skipping items whose bytes are
    /// missing from the archive.
    pub fn content_documents(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.manifest
            .iter()
            .filter(|item| item.is_document())
            .filter_map(|item| {
                self.resources
                    .get(&item.path)
                    .map(|res| (item.path.as_str(), res.data.as_slice()))
            })
    }
}

impl TocEntry {
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
            children: Vec::new(),
            play_order: None,
        }
    }

    pub fn with_child(mut self, child: TocEntry) -> Self {
        self.children.push(child);
        self
    }
}

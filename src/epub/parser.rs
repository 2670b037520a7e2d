//! EPUB parsing utilities (container.xml, OPF, NCX, EPUB 3 nav)

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::book::{Metadata, TocEntry};
use crate::error::{Error, Result};
use crate::util::{local_name, resolve_entity};

/// Parsed OPF package data.
pub struct OpfData {
    pub metadata: Metadata,
    /// Manifest items in package order. Hrefs are relative to the OPF.
    pub manifest: Vec<OpfItem>,
    /// Spine as `(idref, linear)` pairs.
    pub spine: Vec<(String, bool)>,
    pub ncx_href: Option<String>,
    pub nav_href: Option<String>,
}

/// A raw `<item>` of the OPF manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpfItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub properties: Option<String>,
}

impl OpfItem {
    fn has_property(&self, name: &str) -> bool {
        self.properties
            .as_ref()
            .is_some_and(|props| props.split_ascii_whitespace().any(|p| p == name))
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
                if let Some(path) = attr_value(&e, b"full-path")? {
                    return Ok(path);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Err(Error::InvalidEpub(
        "No rootfile found in container.xml".into(),
    ))
}

/// Parse OPF package document.
pub fn parse_opf(content: &str) -> Result<OpfData> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut metadata = Metadata::default();
    let mut manifest: Vec<OpfItem> = Vec::new();
    let mut spine: Vec<(String, bool)> = Vec::new();
    let mut toc_id: Option<String> = None;
    let mut epub2_cover_id: Option<String> = None;

    let mut in_metadata = false;
    let mut current_element: Option<String> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                match local {
                    b"metadata" => in_metadata = true,
                    b"title" | b"creator" | b"language" | b"identifier" | b"publisher"
                    | b"description" | b"subject" | b"date" | b"rights" => {
                        if in_metadata {
                            current_element = Some(String::from_utf8_lossy(local).to_string());
                            buf_text.clear();
                        }
                    }
                    b"spine" => toc_id = attr_value(&e, b"toc")?,
                    // Some packages write `<item ...></item>` instead of the empty form
                    b"item" => {
                        if let Some(item) = manifest_item(&e)? {
                            manifest.push(item);
                        }
                    }
                    b"itemref" => {
                        if let Some(idref) = spine_itemref(&e)? {
                            spine.push(idref);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                match local {
                    b"item" => {
                        if let Some(item) = manifest_item(&e)? {
                            manifest.push(item);
                        }
                    }
                    b"itemref" => {
                        if let Some(idref) = spine_itemref(&e)? {
                            spine.push(idref);
                        }
                    }
                    b"meta" => {
                        if attr_value(&e, b"name")?.as_deref() == Some("cover")
                            && let Some(cover_id) = attr_value(&e, b"content")?
                            && !cover_id.is_empty()
                        {
                            epub2_cover_id = Some(cover_id);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if current_element.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if current_element.is_some() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        buf_text.push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                if local == b"metadata" {
                    in_metadata = false;
                }

                if let Some(ref elem) = current_element {
                    match elem.as_str() {
                        "title" => metadata.title = buf_text.clone(),
                        "creator" => metadata.authors.push(buf_text.clone()),
                        "language" => metadata.language = buf_text.clone(),
                        "identifier" if metadata.identifier.is_empty() => {
                            metadata.identifier = buf_text.clone()
                        }
                        "publisher" => metadata.publisher = Some(buf_text.clone()),
                        "description" => metadata.description = Some(buf_text.clone()),
                        "subject" => metadata.subjects.push(buf_text.clone()),
                        "date" => metadata.date = Some(buf_text.clone()),
                        "rights" => metadata.rights = Some(buf_text.clone()),
                        _ => {}
                    }
                    current_element = None;
                    buf_text.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    // Detect cover image (EPUB3 property takes priority)
    if let Some(cover_item) = manifest.iter().find(|item| item.has_property("cover-image")) {
        metadata.cover_image = Some(cover_item.href.clone());
    } else if let Some(cover_id) = epub2_cover_id
        && let Some(item) = manifest.iter().find(|item| item.id == cover_id)
    {
        metadata.cover_image = Some(item.href.clone());
    }

    let ncx_href = toc_id.and_then(|id| {
        manifest
            .iter()
            .find(|item| item.id == id)
            .map(|item| item.href.clone())
    });
    let nav_href = manifest
        .iter()
        .find(|item| item.has_property("nav"))
        .map(|item| item.href.clone());

    Ok(OpfData {
        metadata,
        manifest,
        spine,
        ncx_href,
        nav_href,
    })
}

/// Parse NCX table of contents.
///
/// navPoints without a label or a content src are dropped together with
/// their children.
pub fn parse_ncx(content: &str) -> Result<Vec<TocEntry>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    struct NavPointState {
        children: Vec<TocEntry>,
        text: Option<String>,
        src: Option<String>,
        play_order: Option<usize>,
    }

    let mut stack: Vec<NavPointState> = vec![NavPointState {
        children: Vec::new(),
        text: None,
        src: None,
        play_order: None,
    }];
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                match local {
                    b"navPoint" => {
                        let play_order = attr_value(&e, b"playOrder")?.and_then(|s| s.parse().ok());
                        stack.push(NavPointState {
                            children: Vec::new(),
                            text: None,
                            src: None,
                            play_order,
                        });
                    }
                    b"text" => in_text = true,
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                if local_name(name.as_ref()) == b"content"
                    && let Some(src) = attr_value(&e, b"src")?
                    && let Some(state) = stack.last_mut()
                {
                    state.src = Some(src);
                }
            }
            Ok(Event::Text(e)) => {
                if in_text && let Some(state) = stack.last_mut() {
                    let raw = String::from_utf8_lossy(e.as_ref());
                    match &mut state.text {
                        Some(existing) => existing.push_str(&raw),
                        None => state.text = Some(raw.into_owned()),
                    }
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text && let Some(state) = stack.last_mut() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        match &mut state.text {
                            Some(existing) => existing.push_str(&resolved),
                            None => state.text = Some(resolved),
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                match local {
                    b"text" => in_text = false,
                    b"navPoint" => {
                        if let Some(state) = stack.pop()
                            && let (Some(text), Some(src)) = (state.text, state.src)
                        {
                            let mut entry = TocEntry::new(text, src);
                            entry.children = state.children;
                            entry.play_order = state.play_order;

                            if let Some(parent) = stack.last_mut() {
                                parent.children.push(entry);
                            }
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

    Ok(stack.pop().map(|s| s.children).unwrap_or_default())
}

/// Parse the `toc` navigation list of an EPUB 3 navigation document.
///
/// Each `<li>` becomes an entry labelled by its `<a>` (or `<span>`) text.
/// Label-only items are kept when they group children, and dropped otherwise.
pub fn parse_nav(content: &str) -> Result<Vec<TocEntry>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    struct ItemState {
        children: Vec<TocEntry>,
        label: String,
        href: Option<String>,
    }

    let mut stack: Vec<ItemState> = vec![ItemState {
        children: Vec::new(),
        label: String::new(),
        href: None,
    }];
    let mut in_toc = false;
    let mut in_label = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"nav" => in_toc = nav_is_toc(&e)?,
                    b"li" if in_toc => stack.push(ItemState {
                        children: Vec::new(),
                        label: String::new(),
                        href: None,
                    }),
                    b"a" | b"span" if in_toc && stack.len() > 1 => {
                        in_label = true;
                        if let Some(href) = attr_value(&e, b"href")?
                            && let Some(state) = stack.last_mut()
                        {
                            state.href = Some(href);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if in_label && let Some(state) = stack.last_mut() {
                    state.label.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_label && let Some(state) = stack.last_mut() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        state.label.push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"nav" => {
                        if in_toc {
                            break;
                        }
                    }
                    b"a" | b"span" => in_label = false,
                    b"li" if in_toc && stack.len() > 1 => {
                        if let Some(state) = stack.pop() {
                            let title = collapse_whitespace(&state.label);
                            let keep = !title.is_empty()
                                && (state.href.is_some() || !state.children.is_empty());
                            if keep && let Some(parent) = stack.last_mut() {
                                let href = state.href.unwrap_or_default();
                                let mut entry = TocEntry::new(title, href);
                                entry.children = state.children;
                                parent.children.push(entry);
                            }
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

    Ok(stack.swap_remove(0).children)
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

fn manifest_item(e: &BytesStart<'_>) -> Result<Option<OpfItem>> {
    let mut item = OpfItem {
        id: String::new(),
        href: String::new(),
        media_type: String::new(),
        properties: None,
    };

    for attr in e.attributes().flatten() {
        let value = String::from_utf8(attr.value.to_vec())?;
        match attr.key.as_ref() {
            b"id" => item.id = value,
            b"href" => item.href = value,
            b"media-type" => item.media_type = value,
            b"properties" => item.properties = Some(value),
            _ => {}
        }
    }

    Ok((!item.id.is_empty()).then_some(item))
}

fn spine_itemref(e: &BytesStart<'_>) -> Result<Option<(String, bool)>> {
    let linear = attr_value(e, b"linear")?.as_deref() != Some("no");
    Ok(attr_value(e, b"idref")?.map(|idref| (idref, linear)))
}

/// `<nav epub:type="toc">`; the prefix on `type` varies between books.
fn nav_is_toc(e: &BytesStart<'_>) -> Result<bool> {
    for attr in e.attributes().flatten() {
        if local_name(attr.key.as_ref()) == b"type" {
            let value = String::from_utf8(attr.value.to_vec())?;
            return Ok(value.split_ascii_whitespace().any(|t| t == "toc"));
        }
    }
    Ok(false)
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            return Ok(Some(String::from_utf8(attr.value.to_vec())?));
        }
    }
    Ok(None)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip UTF-8 BOM if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}

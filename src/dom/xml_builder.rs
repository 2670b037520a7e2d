//! XML tree building for XHTML content documents.
//!
//! The HTML tree builder ignores the self-closing slash on non-void elements,
//! so `<a id="s"/>` would swallow the blocks after it. Well-formed XHTML is
//! built here with quick-xml instead, where empty elements stay empty.

use std::borrow::Cow;

use html5ever::{LocalName, Namespace, QualName, ns};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::arena::{ArenaDom, ArenaNodeId, Attribute};
use crate::error::Result;
use crate::util::{local_name, resolve_entity};

/// Build an [`ArenaDom`] from an XHTML string.
///
/// Fails on markup that is not well-formed (mismatched end tags, broken
/// attributes). Unknown entity references are kept as literal text.
pub fn parse_xhtml(xml: &str) -> Result<ArenaDom> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut dom = ArenaDom::new();
    let document = dom.document();
    let mut open = vec![document];

    loop {
        let parent = open.last().copied().unwrap_or(document);
        match reader.read_event()? {
            Event::Start(e) => {
                let element = create_element(&mut dom, &e);
                dom.append(parent, element);
                open.push(element);
            }
            Event::Empty(e) => {
                let element = create_element(&mut dom, &e);
                dom.append(parent, element);
            }
            Event::End(_) => {
                if open.len() > 1 {
                    open.pop();
                }
            }
            Event::Text(e) => dom.append_text(parent, &String::from_utf8_lossy(e.as_ref())),
            Event::CData(e) => dom.append_text(parent, &String::from_utf8_lossy(e.as_ref())),
            Event::GeneralRef(e) => {
                let entity = String::from_utf8_lossy(e.as_ref());
                match resolve_entity(&entity) {
                    Some(resolved) => dom.append_text(parent, &resolved),
                    None => dom.append_text(parent, &format!("&{entity};")),
                }
            }
            Event::Comment(e) => {
                let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                let comment = dom.create_comment(text);
                dom.append(parent, comment);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(dom)
}

fn create_element(dom: &mut ArenaDom, e: &BytesStart<'_>) -> ArenaNodeId {
    let attrs = e
        .attributes()
        .flatten()
        .map(|attr| {
            let raw = String::from_utf8_lossy(&attr.value);
            let value = quick_xml::escape::unescape(&raw)
                .map(Cow::into_owned)
                .unwrap_or_else(|_| raw.to_string());
            Attribute {
                name: qualify(attr.key.as_ref(), ns!()),
                value,
            }
        })
        .collect();

    dom.create_element(qualify(e.name().as_ref(), ns!(html)), attrs)
}

/// Prefixes are dropped: `epub:type` becomes `type`, `xml:id` becomes `id`.
fn qualify(name: &[u8], ns: Namespace) -> QualName {
    let local = String::from_utf8_lossy(local_name(name));
    QualName::new(None, ns, LocalName::from(local.as_ref()))
}

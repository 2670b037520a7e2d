//! Parsed content documents.
//!
//! Raw bytes go through [`decode_document`] and then into an [`ArenaDom`],
//! which offers the id lookup and sibling walks chapter slicing needs.
//! XHTML is built with quick-xml, everything else with html5ever.

mod arena;
mod encoding;
mod tree_sink;
mod xml_builder;

pub use arena::{ArenaDom, ArenaNode, ArenaNodeData, ArenaNodeId, Attribute, SiblingIter};
pub use encoding::{decode_document, detect_encoding};
pub use tree_sink::{ArenaSink, NodeHandle};
pub use xml_builder::parse_xhtml;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

const XHTML_NS: &[u8] = b"http://www.w3.org/1999/xhtml";

/// Parse an HTML string into an [`ArenaDom`].
pub fn parse_html(html: &str) -> ArenaDom {
    parse_document(ArenaSink::new(), ParseOpts::default())
        .one(html)
        .into_dom()
}

/// Parse a decoded content document.
///
/// Documents with an XML declaration or the XHTML namespace near the top are
/// built as XML. Anything else, and XHTML that is not well-formed, goes
/// through the HTML parser.
pub fn parse_content(text: &str) -> ArenaDom {
    if looks_like_xhtml(text) {
        match parse_xhtml(text) {
            Ok(dom) => return dom,
            Err(e) => log::debug!("not well-formed XHTML, parsing as HTML: {e}"),
        }
    }
    parse_html(text)
}

fn looks_like_xhtml(text: &str) -> bool {
    let head = text.trim_start_matches('\u{feff}').trim_start();
    if head.starts_with("<?xml") {
        return true;
    }
    let window = &head.as_bytes()[..head.len().min(1024)];
    window.windows(XHTML_NS.len()).any(|w| w == XHTML_NS)
}

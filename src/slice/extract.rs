//! Anchor-relative text extraction within one document.
//!
//! All three walks stay on the anchor's own sibling list. Table-of-contents
//! anchors in content documents mark top-level blocks, so the text between
//! two anchors is the run of siblings between them.

use crate::dom::{ArenaDom, ArenaNodeData, ArenaNodeId};

/// Text of a whole document: the children of `<body>` (or of the root when
/// there is no body) joined by newline, using the same per-sibling rule as
/// the anchor walks.
pub fn document_text(dom: &ArenaDom) -> String {
    dom.children(dom.body())
        .filter_map(|child| sibling_text(dom, child))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Text of the anchor element followed by every later sibling.
///
/// Returns an empty string when the anchor does not exist.
pub fn text_after_anchor(dom: &ArenaDom, anchor: &str) -> String {
    let Some(node) = dom.get_by_id(anchor) else {
        log::warn!("anchor #{anchor} not found in document");
        return String::new();
    };

    let mut parts = Vec::new();
    let own = dom.text(node);
    if !own.is_empty() {
        parts.push(own);
    }
    parts.extend(dom.next_siblings(node).filter_map(|s| sibling_text(dom, s)));

    parts.join("\n")
}

/// Text of every sibling before the anchor element, in document order.
pub fn text_before_anchor(dom: &ArenaDom, anchor: &str) -> String {
    let Some(node) = dom.get_by_id(anchor) else {
        log::warn!("anchor #{anchor} not found in document");
        return String::new();
    };

    let mut parts: Vec<String> = dom
        .prev_siblings(node)
        .filter_map(|s| sibling_text(dom, s))
        .collect();
    parts.reverse();

    parts.join("\n").trim().to_string()
}

/// Text from the `start` anchor up to, not including, the `end` anchor.
///
/// A missing start falls back to [`text_before_anchor`] on `end`; a missing
/// end falls back to [`text_after_anchor`] on `start`. `None` means the start
/// or the end of the document respectively.
pub fn text_between_anchors(dom: &ArenaDom, start: Option<&str>, end: Option<&str>) -> String {
    let (start, end) = match (start, end) {
        (None, None) => return document_text(dom),
        (None, Some(end)) => return text_before_anchor(dom, end),
        (Some(start), None) => return text_after_anchor(dom, start),
        (Some(start), Some(end)) => (start, end),
    };

    let Some(start_node) = dom.get_by_id(start) else {
        log::warn!("anchor #{start} not found in document; taking text before #{end}");
        return text_before_anchor(dom, end);
    };
    let Some(end_node) = dom.get_by_id(end) else {
        return text_after_anchor(dom, start);
    };

    let mut parts = Vec::new();
    let own = dom.text(start_node);
    if !own.is_empty() {
        parts.push(own);
    }
    if start_node != end_node {
        parts.extend(
            dom.next_siblings(start_node)
                .take_while(|&s| s != end_node)
                .filter_map(|s| sibling_text(dom, s)),
        );
    }

    parts.join("\n").trim().to_string()
}

/// What one sibling contributes: full text for elements, trimmed content for
/// non-blank text nodes, nothing for comments.
fn sibling_text(dom: &ArenaDom, id: ArenaNodeId) -> Option<String> {
    match &dom.get(id)?.data {
        ArenaNodeData::Element { .. } => Some(dom.text(id)),
        ArenaNodeData::Text(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        ArenaNodeData::Comment(_) | ArenaNodeData::Document => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    const CHAPTERS: &str = r#"<html><body>
<h2 id="c1">One</h2>
<p>First <em>para</em>.</p>
loose text
<!-- editor note -->
<h2 id="c2">Two</h2>
<p>Second para.</p>
</body></html>"#;

    #[test]
    fn test_between_siblings() {
        let dom = parse_html(r#"<body><div id="s">X</div><p>Y</p><div id="e">Z</div></body>"#);
        assert_eq!(text_between_anchors(&dom, Some("s"), Some("e")), "X\nY");
    }

    #[test]
    fn test_after_anchor() {
        let dom = parse_html(CHAPTERS);
        assert_eq!(text_after_anchor(&dom, "c2"), "Two\nSecond para.");
        assert_eq!(
            text_after_anchor(&dom, "c1"),
            "One\nFirst para.\nloose text\nTwo\nSecond para."
        );
    }

    #[test]
    fn test_before_anchor() {
        let dom = parse_html(CHAPTERS);
        assert_eq!(
            text_before_anchor(&dom, "c2"),
            "One\nFirst para.\nloose text"
        );
        assert_eq!(text_before_anchor(&dom, "c1"), "");
    }

    #[test]
    fn test_between_skips_comments_and_blank_text() {
        let dom = parse_html(CHAPTERS);
        assert_eq!(
            text_between_anchors(&dom, Some("c1"), Some("c2")),
            "One\nFirst para.\nloose text"
        );
    }

    #[test]
    fn test_same_anchor_is_zero_width() {
        let dom = parse_html(CHAPTERS);
        assert_eq!(text_between_anchors(&dom, Some("c1"), Some("c1")), "One");
    }

    #[test]
    fn test_missing_end_matches_after_anchor() {
        let dom = parse_html(CHAPTERS);
        assert_eq!(
            text_between_anchors(&dom, Some("c1"), Some("nope")),
            text_after_anchor(&dom, "c1")
        );
    }

    #[test]
    fn test_missing_start_matches_before_anchor() {
        let dom = parse_html(CHAPTERS);
        assert_eq!(
            text_between_anchors(&dom, Some("nope"), Some("c2")),
            text_before_anchor(&dom, "c2")
        );
    }

    #[test]
    fn test_missing_anchor_is_empty() {
        let dom = parse_html(CHAPTERS);
        assert_eq!(text_after_anchor(&dom, "nope"), "");
        assert_eq!(text_before_anchor(&dom, "nope"), "");
        assert_eq!(text_between_anchors(&dom, Some("x"), Some("y")), "");
    }

    #[test]
    fn test_open_ended_ranges() {
        let dom = parse_html(CHAPTERS);
        assert_eq!(
            text_between_anchors(&dom, None, Some("c2")),
            text_before_anchor(&dom, "c2")
        );
        assert_eq!(
            text_between_anchors(&dom, Some("c2"), None),
            text_after_anchor(&dom, "c2")
        );
        assert_eq!(
            text_between_anchors(&dom, None, None),
            "One\nFirst para.\nloose text\nTwo\nSecond para."
        );
    }

    #[test]
    fn test_document_text_separates_blocks() {
        let dom = parse_html(
            "<html><head><title>skip</title></head><body><p>a</p><p>b <i>c</i></p></body></html>",
        );
        assert_eq!(document_text(&dom), "a\nb c");
    }

    #[test]
    fn test_siblings_do_not_cross_parents() {
        let dom = parse_html(
            r#"<body><section><h2 id="a">A</h2><p>a1</p></section>
<section><p>b1</p></section></body>"#,
        );
        assert_eq!(text_after_anchor(&dom, "a"), "A\na1");
    }
}

//! Arena-based DOM for parsed content documents.
//!
//! html5ever parses into this tree through [`ArenaSink`](super::ArenaSink).
//! Nodes live in one vector and link to each other by index, which keeps
//! sibling walks cheap.

use std::collections::HashMap;

use html5ever::{LocalName, QualName};

/// Unique identifier for a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaNodeId(pub u32);

impl ArenaNodeId {
    /// Sentinel value for no node.
    pub const NONE: ArenaNodeId = ArenaNodeId(u32::MAX);

    /// Check if this is a valid node ID.
    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    /// Check if this is the sentinel value.
    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }
}

/// Node type in the arena DOM.
#[derive(Debug, Clone)]
pub enum ArenaNodeData {
    /// Document root.
    Document,
    /// Element with name and attributes.
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
        /// Pre-extracted id for anchor lookup.
        id: Option<String>,
    },
    /// Text content.
    Text(String),
    /// Comments and processing instructions; never part of extracted text.
    Comment(String),
}

/// HTML attribute.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

/// A node in the arena DOM.
#[derive(Debug)]
pub struct ArenaNode {
    pub data: ArenaNodeData,
    pub parent: ArenaNodeId,
    pub first_child: ArenaNodeId,
    pub last_child: ArenaNodeId,
    pub prev_sibling: ArenaNodeId,
    pub next_sibling: ArenaNodeId,
}

impl ArenaNode {
    fn new(data: ArenaNodeData) -> Self {
        Self {
            data,
            parent: ArenaNodeId::NONE,
            first_child: ArenaNodeId::NONE,
            last_child: ArenaNodeId::NONE,
            prev_sibling: ArenaNodeId::NONE,
            next_sibling: ArenaNodeId::NONE,
        }
    }
}

/// Arena-based DOM tree.
pub struct ArenaDom {
    nodes: Vec<ArenaNode>,
    document: ArenaNodeId,
    /// Map from id attribute to the first element carrying it.
    id_map: HashMap<String, ArenaNodeId>,
}

impl ArenaDom {
    /// Create a new empty DOM with a document root.
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            document: ArenaNodeId::NONE,
            id_map: HashMap::new(),
        };
        dom.document = dom.alloc(ArenaNode::new(ArenaNodeData::Document));
        dom
    }

    fn alloc(&mut self, node: ArenaNode) -> ArenaNodeId {
        let id = ArenaNodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Get the document root ID.
    pub fn document(&self) -> ArenaNodeId {
        self.document
    }

    /// Get a node by ID.
    pub fn get(&self, id: ArenaNodeId) -> Option<&ArenaNode> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    /// Get a mutable node by ID.
    pub fn get_mut(&mut self, id: ArenaNodeId) -> Option<&mut ArenaNode> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    /// Create a new element node.
    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> ArenaNodeId {
        let id = attrs
            .iter()
            .find(|attr| attr.name.local.as_ref() == "id")
            .map(|attr| attr.value.clone());

        let node_id = self.alloc(ArenaNode::new(ArenaNodeData::Element {
            name,
            attrs,
            id: id.clone(),
        }));

        // Elements are created in source order, so the first one wins
        if let Some(id_str) = id {
            self.id_map.entry(id_str).or_insert(node_id);
        }

        node_id
    }

    /// Create a new text node.
    pub fn create_text(&mut self, text: String) -> ArenaNodeId {
        self.alloc(ArenaNode::new(ArenaNodeData::Text(text)))
    }

    /// Create a new comment node.
    pub fn create_comment(&mut self, text: String) -> ArenaNodeId {
        self.alloc(ArenaNode::new(ArenaNodeData::Comment(text)))
    }

    /// Append a child to a parent node.
    pub fn append(&mut self, parent: ArenaNodeId, child: ArenaNodeId) {
        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(ArenaNodeId::NONE);

        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = parent;
            child_node.prev_sibling = last_child;
            child_node.next_sibling = ArenaNodeId::NONE;
        }

        if last_child.is_some()
            && let Some(last_node) = self.get_mut(last_child)
        {
            last_node.next_sibling = child;
        }

        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    /// Insert a node before a sibling.
    pub fn insert_before(&mut self, sibling: ArenaNodeId, new_node: ArenaNodeId) {
        let (parent, prev) = match self.get(sibling) {
            Some(n) => (n.parent, n.prev_sibling),
            None => return,
        };

        if let Some(new) = self.get_mut(new_node) {
            new.parent = parent;
            new.prev_sibling = prev;
            new.next_sibling = sibling;
        }

        if let Some(sib) = self.get_mut(sibling) {
            sib.prev_sibling = new_node;
        }

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = new_node;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = new_node;
        }
    }

    /// Append text to an existing text node, or create new if last child isn't text.
    pub fn append_text(&mut self, parent: ArenaNodeId, text: &str) {
        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(ArenaNodeId::NONE);

        if let Some(last) = self.get_mut(last_child)
            && let ArenaNodeData::Text(ref mut existing) = last.data
        {
            existing.push_str(text);
            return;
        }

        let text_node = self.create_text(text.to_string());
        self.append(parent, text_node);
    }

    /// Unlink a node from its parent and siblings.
    pub fn detach(&mut self, target: ArenaNodeId) {
        let (parent, prev, next) = match self.get(target) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return,
        };

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.first_child = next;
        }

        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.last_child = prev;
        }

        if let Some(node) = self.get_mut(target) {
            node.parent = ArenaNodeId::NONE;
            node.prev_sibling = ArenaNodeId::NONE;
            node.next_sibling = ArenaNodeId::NONE;
        }
    }

    /// Get the first element carrying the given id attribute.
    pub fn get_by_id(&self, id: &str) -> Option<ArenaNodeId> {
        self.id_map.get(id).copied()
    }

    /// Get the number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the DOM is empty (only has document root).
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Iterate over children of a node.
    pub fn children(&self, parent: ArenaNodeId) -> SiblingIter<'_> {
        let first = self
            .get(parent)
            .map(|n| n.first_child)
            .unwrap_or(ArenaNodeId::NONE);
        SiblingIter {
            dom: self,
            current: first,
            forward: true,
        }
    }

    /// Siblings after `id`, in document order.
    pub fn next_siblings(&self, id: ArenaNodeId) -> SiblingIter<'_> {
        let current = self
            .get(id)
            .map(|n| n.next_sibling)
            .unwrap_or(ArenaNodeId::NONE);
        SiblingIter {
            dom: self,
            current,
            forward: true,
        }
    }

    /// Siblings before `id`, nearest first.
    pub fn prev_siblings(&self, id: ArenaNodeId) -> SiblingIter<'_> {
        let current = self
            .get(id)
            .map(|n| n.prev_sibling)
            .unwrap_or(ArenaNodeId::NONE);
        SiblingIter {
            dom: self,
            current,
            forward: false,
        }
    }

    /// Find the first node matching a predicate (pre-order DFS).
    pub fn find<F>(&self, predicate: F) -> Option<ArenaNodeId>
    where
        F: Fn(&ArenaNode) -> bool,
    {
        let mut stack = vec![self.document];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.get(id) {
                if predicate(node) {
                    return Some(id);
                }
                // Push children in reverse order for left-to-right traversal
                let mut children: Vec<_> = self.children(id).collect();
                children.reverse();
                stack.extend(children);
            }
        }
        None
    }

    /// Find element by tag name (first match).
    pub fn find_by_tag(&self, tag: &str) -> Option<ArenaNodeId> {
        self.find(|node| match &node.data {
            ArenaNodeData::Element { name, .. } => name.local.as_ref() == tag,
            _ => false,
        })
    }

    /// Concatenated text of every text node under `id` (or `id` itself when
    /// it is a text node). Comments are skipped.
    pub fn text(&self, id: ArenaNodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: ArenaNodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        match &node.data {
            ArenaNodeData::Text(s) => out.push_str(s),
            ArenaNodeData::Comment(_) => {}
            ArenaNodeData::Document | ArenaNodeData::Element { .. } => {
                let mut stack: Vec<_> = self.children(id).collect();
                stack.reverse();
                while let Some(child) = stack.pop() {
                    match self.get(child).map(|n| &n.data) {
                        Some(ArenaNodeData::Text(s)) => out.push_str(s),
                        Some(ArenaNodeData::Element { .. }) => {
                            let mut grandchildren: Vec<_> = self.children(child).collect();
                            grandchildren.reverse();
                            stack.extend(grandchildren);
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    /// The `<body>` element, or the document root when there is none.
    pub fn body(&self) -> ArenaNodeId {
        self.find_by_tag("body").unwrap_or(self.document)
    }

    /// Text of the `<body>` element, or of the whole tree without one.
    pub fn body_text(&self) -> String {
        self.text(self.body())
    }
}

impl Default for ArenaDom {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over a run of siblings in either direction.
pub struct SiblingIter<'a> {
    dom: &'a ArenaDom,
    current: ArenaNodeId,
    forward: bool,
}

impl Iterator for SiblingIter<'_> {
    type Item = ArenaNodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        let forward = self.forward;
        self.current = self
            .dom
            .get(id)
            .map(|n| if forward { n.next_sibling } else { n.prev_sibling })
            .unwrap_or(ArenaNodeId::NONE);
        Some(id)
    }
}

/// Convenience methods for element nodes.
impl ArenaDom {
    /// Get element's local name (tag).
    pub fn element_name(&self, id: ArenaNodeId) -> Option<&LocalName> {
        self.get(id).and_then(|n| match &n.data {
            ArenaNodeData::Element { name, .. } => Some(&name.local),
            _ => None,
        })
    }

    /// Get text content of a text node.
    pub fn text_content(&self, id: ArenaNodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            ArenaNodeData::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }
}

//! A minimal in-memory XML document tree: the substrate XPath expressions
//! are evaluated against. Not a general-purpose XML parser (`spec.md`'s
//! Non-goals exclude document editing); just enough structure — elements,
//! attributes, text, and a parent/child/sibling arena — to drive axis
//! traversal.

use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

#[derive(Clone, Debug)]
pub enum NodeKind {
    Element { name: String },
    Attribute { name: String, value: String },
    Text(String),
    Document,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub attributes: Vec<NodeId>,
}

/// An arena-backed document: nodes are never freed individually, matching
/// the lifetime of a parsed document the way the original's node pool is
/// owned entirely by the containing `extXML` object.
#[derive(Default)]
pub struct Document {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self { nodes: Vec::new(), root: None };
        let root = doc.push(Node { kind: NodeKind::Document, parent: None, children: Vec::new(), attributes: Vec::new() });
        doc.root = Some(root);
        doc
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn root(&self) -> NodeId {
        self.root.expect("Document::new always creates a root")
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn create_element(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = self.push(Node {
            kind: NodeKind::Element { name: name.to_string() },
            parent: Some(parent),
            children: Vec::new(),
            attributes: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn create_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.push(Node { kind: NodeKind::Text(text.to_string()), parent: Some(parent), children: Vec::new(), attributes: Vec::new() });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> NodeId {
        if let Some(existing) = self.nodes[element.0].attributes.iter().find(|a| {
            matches!(&self.nodes[a.0].kind, NodeKind::Attribute { name: n, .. } if n == name)
        }) {
            let existing = *existing;
            self.nodes[existing.0].kind = NodeKind::Attribute { name: name.to_string(), value: value.to_string() };
            return existing;
        }
        let id = self.push(Node {
            kind: NodeKind::Attribute { name: name.to_string(), value: value.to_string() },
            parent: Some(element),
            children: Vec::new(),
            attributes: Vec::new(),
        });
        self.nodes[element.0].attributes.push(id);
        id
    }

    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { name } => Some(name),
            _ => None,
        }
    }

    pub fn attribute(&self, element: NodeId, name: &str) -> Option<&str> {
        self.node(element).attributes.iter().find_map(|a| match &self.node(*a).kind {
            NodeKind::Attribute { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn attributes(&self, element: NodeId) -> HashMap<&str, &str> {
        self.node(element)
            .attributes
            .iter()
            .filter_map(|a| match &self.node(*a).kind {
                NodeKind::Attribute { name, value } => Some((name.as_str(), value.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Concatenated text of every descendant text node, the `string-value`
    /// of an element per the XPath data model.
    pub fn string_value(&self, id: NodeId) -> String {
        match &self.node(id).kind {
            NodeKind::Text(s) => s.clone(),
            NodeKind::Attribute { value, .. } => value.clone(),
            NodeKind::Element { .. } | NodeKind::Document => {
                let mut out = String::new();
                self.collect_text(id, &mut out);
                out
            }
        }
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for &child in &self.node(id).children {
            match &self.node(child).kind {
                NodeKind::Text(s) => out.push_str(s),
                NodeKind::Element { .. } => self.collect_text(child, out),
                _ => {}
            }
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn following_siblings(&self, id: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.parent(id) else { return Vec::new() };
        let siblings = &self.node(parent).children;
        let pos = siblings.iter().position(|&n| n == id).unwrap_or(0);
        siblings[pos + 1..].to_vec()
    }

    pub fn preceding_siblings(&self, id: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.parent(id) else { return Vec::new() };
        let siblings = &self.node(parent).children;
        let pos = siblings.iter().position(|&n| n == id).unwrap_or(0);
        siblings[..pos].to_vec()
    }

    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &child in &self.node(id).children {
            out.push(child);
            out.extend(self.descendants(child));
        }
        out
    }

    /// Ancestors of `id`, nearest first, per the `ancestor` axis.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    /// Document-order nodes preceding `id` that are not ancestors, per the
    /// `preceding` axis.
    pub fn preceding(&self, id: NodeId) -> Vec<NodeId> {
        let ancestors: Vec<NodeId> = self.ancestors(id);
        let mut out = Vec::new();
        for n in 0..id.0 {
            let candidate = NodeId(n);
            if !ancestors.contains(&candidate) && !matches!(self.node(candidate).kind, NodeKind::Document) {
                out.push(candidate);
            }
        }
        out
    }

    /// Document-order nodes following `id` that are not descendants, per the
    /// `following` axis.
    pub fn following(&self, id: NodeId) -> Vec<NodeId> {
        let descendants = self.descendants(id);
        let mut out = Vec::new();
        for n in (id.0 + 1)..self.nodes.len() {
            let candidate = NodeId(n);
            if !descendants.contains(&candidate) {
                out.push(candidate);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_value_concatenates_descendant_text() {
        let mut doc = Document::new();
        let root = doc.root();
        let book = doc.create_element(root, "book");
        let title = doc.create_element(book, "title");
        doc.create_text(title, "Rust");
        doc.create_text(title, " in Action");
        assert_eq!(doc.string_value(title), "Rust in Action");
        assert_eq!(doc.string_value(book), "Rust in Action");
    }

    #[test]
    fn attributes_are_queryable_by_name() {
        let mut doc = Document::new();
        let root = doc.root();
        let book = doc.create_element(root, "book");
        doc.set_attribute(book, "isbn", "12345");
        assert_eq!(doc.attribute(book, "isbn"), Some("12345"));
        assert_eq!(doc.attribute(book, "missing"), None);
    }

    #[test]
    fn sibling_queries_reflect_document_order() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_element(root, "a");
        let b = doc.create_element(root, "b");
        let c = doc.create_element(root, "c");
        assert_eq!(doc.following_siblings(a), vec![b, c]);
        assert_eq!(doc.preceding_siblings(c), vec![a, b]);
    }
}

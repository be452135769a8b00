use std::collections::HashSet;
use std::ops::Deref;
use std::sync::atomic::Ordering;

use crate::builder::{DocumentBuilder, ParseOptions};
use crate::error::DocumentError;
use crate::node::{Node, NodeData, read, write};

/// Metadata of the `<?xml ...?>` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<bool>,
}

impl Default for XmlDeclaration {
    fn default() -> Self {
        Self { version: "1.0".to_string(), encoding: None, standalone: None }
    }
}

/// Root container of a tree. Derefs to its document [`Node`], which is the
/// XPath root node.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Document(Node);

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("declaration", &self.declaration())
            .field("root_element", &self.root_element())
            .finish()
    }
}

impl Deref for Document {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.0
    }
}

impl AsRef<Node> for Document {
    fn as_ref(&self) -> &Node {
        &self.0
    }
}

impl Document {
    /// Empty document without root element.
    pub fn new() -> Self {
        let node = Node::new_document(XmlDeclaration::default());
        node.set_order(0);
        if let NodeData::Document(d) = &node.0.data {
            d.next_order.store(1, Ordering::Relaxed);
        }
        Document(node)
    }

    /// Wraps a document node.
    pub fn from_node(node: Node) -> Option<Document> {
        node.is_document().then_some(Document(node))
    }

    /// Parses UTF-8 XML with default options.
    pub fn parse(source: impl AsRef<[u8]>) -> Result<Document, DocumentError> {
        Self::parse_with(source, &ParseOptions::default())
    }

    pub fn parse_str(source: &str) -> Result<Document, DocumentError> {
        Self::parse_with(source, &ParseOptions::default())
    }

    pub fn parse_with(source: impl AsRef<[u8]>, options: &ParseOptions) -> Result<Document, DocumentError> {
        let text = crate::reader::decode_source(source.as_ref())?;
        let mut builder = DocumentBuilder::new(options.clone());
        crate::reader::feed(&text, &mut builder)?;
        let doc = builder.finish()?;
        tracing::debug!(nodes = doc.next_order(), "parsed document");
        Ok(doc)
    }

    pub fn as_node(&self) -> &Node {
        &self.0
    }

    pub fn into_node(self) -> Node {
        self.0
    }

    pub fn declaration(&self) -> XmlDeclaration {
        match &self.0.0.data {
            NodeData::Document(d) => read(&d.declaration).clone(),
            _ => XmlDeclaration::default(),
        }
    }

    pub fn set_declaration(&self, declaration: XmlDeclaration) {
        if let NodeData::Document(d) = &self.0.0.data {
            *write(&d.declaration) = declaration;
        }
    }

    pub fn version(&self) -> String {
        self.declaration().version
    }

    pub fn encoding(&self) -> Option<String> {
        self.declaration().encoding
    }

    pub fn standalone(&self) -> Option<bool> {
        self.declaration().standalone
    }

    /// Next unassigned document-order index.
    pub(crate) fn next_order(&self) -> i64 {
        match &self.0.0.data {
            NodeData::Document(d) => d.next_order.load(Ordering::Relaxed),
            _ => 0,
        }
    }

    /// Assigns the next document-order index to `node` and, for elements, to
    /// its namespace and attribute nodes. Children are numbered when they
    /// attach.
    pub(crate) fn extend_order(&self, node: &Node) {
        let NodeData::Document(d) = &self.0.0.data else { return };
        let mut next = d.next_order.load(Ordering::Relaxed);
        node.set_order(next);
        next += 1;
        for extra in node.namespace_nodes().iter().chain(node.attribute_nodes().iter()) {
            extra.set_order(next);
            next += 1;
        }
        d.next_order.store(next, Ordering::Relaxed);
    }

    /// Renumbers the whole tree in document order: each element is followed
    /// by its namespace nodes, its attribute nodes, then its children.
    pub(crate) fn renumber(&self) {
        let NodeData::Document(d) = &self.0.0.data else { return };
        let mut next = 0_i64;
        let mut stack = vec![self.0.clone()];
        while let Some(node) = stack.pop() {
            node.set_order(next);
            next += 1;
            for extra in node.namespace_nodes().iter().chain(node.attribute_nodes().iter()) {
                extra.set_order(next);
                next += 1;
            }
            stack.extend(node.children().into_iter().rev());
        }
        d.next_order.store(next, Ordering::Relaxed);
        tracing::trace!(nodes = next, "renumbered document");
    }
}

/// Marks a detached subtree as unordered.
pub(crate) fn clear_order(node: &Node) {
    let mut stack = vec![node.clone()];
    while let Some(n) = stack.pop() {
        n.set_order(-1);
        for extra in n.namespace_nodes().iter().chain(n.attribute_nodes().iter()) {
            extra.set_order(-1);
        }
        stack.extend(n.children());
    }
}

/// Sorts nodes into document order and drops duplicates.
pub fn sort_document_order(nodes: &mut Vec<Node>) {
    nodes.sort_by_key(Node::document_order);
    let mut seen = HashSet::with_capacity(nodes.len());
    nodes.retain(|n| seen.insert(n.clone()));
}

/// Node that comes first in document order.
pub fn first_in_document_order(nodes: &[Node]) -> Option<Node> {
    nodes.iter().min_by_key(|n| n.document_order()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document() {
        let doc = Document::new();
        assert_eq!(doc.document_order(), 0);
        assert!(doc.root_element().is_none());
        assert_eq!(doc.node_type(), "root");
        assert_eq!(doc.version(), "1.0");
    }

    #[test]
    fn sorting_drops_duplicates() {
        let doc = Document::parse_str("<a><b/><c/></a>").unwrap();
        let a = doc.root_element().unwrap();
        let (b, c) = (a.child(0).unwrap(), a.child(1).unwrap());
        let mut nodes = vec![c.clone(), a.clone(), b.clone(), c.clone()];
        sort_document_order(&mut nodes);
        assert_eq!(nodes, vec![a.clone(), b.clone(), c.clone()]);
        assert_eq!(first_in_document_order(&[c, b.clone()]), Some(b));
    }
}

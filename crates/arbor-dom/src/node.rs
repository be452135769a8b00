//! Arc-backed node handle shared by every member of a tree.
//!
//! A [`Node`] is a cheap clonable handle; equality and hashing are by
//! identity. Children are owned by their parent's child list, parents are
//! reached through weak back-references. Attribute and namespace nodes hang
//! off their element outside the child list.
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use crate::consts::{XML_NAMESPACE, XML_PREFIX, XMLNS_NAMESPACE, XMLNS_PREFIX};
use crate::document::{Document, XmlDeclaration};
use crate::error::NamespaceError;
use crate::model::{ExpandedName, NodeKind, QName};
use crate::scope::{ElementState, NamespaceScope, collect_attributes, element_state};

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().expect("node lock poisoned")
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().expect("node lock poisoned")
}

pub(crate) struct Inner {
    pub(crate) data: NodeData,
    parent: RwLock<Weak<Inner>>,
    order: AtomicI64,
}

pub(crate) enum NodeData {
    Document(DocumentData),
    Element(ElementData),
    Attribute(AttributeData),
    Namespace { prefix: Option<String>, uri: String },
    Text { data: RwLock<String>, cdata: bool },
    Comment(RwLock<String>),
    ProcessingInstruction { target: String, data: RwLock<String> },
}

pub(crate) struct DocumentData {
    pub(crate) children: RwLock<Vec<Node>>,
    pub(crate) declaration: RwLock<XmlDeclaration>,
    pub(crate) next_order: AtomicI64,
}

pub(crate) struct ElementData {
    pub(crate) name: RwLock<QName>,
    pub(crate) scope: RwLock<NamespaceScope>,
    pub(crate) attributes: RwLock<BTreeMap<String, String>>,
    pub(crate) attribute_nodes: RwLock<Vec<Node>>,
    pub(crate) namespace_nodes: RwLock<Vec<Node>>,
    pub(crate) children: RwLock<Vec<Node>>,
}

pub(crate) struct AttributeData {
    pub(crate) key: String,
    pub(crate) name: RwLock<QName>,
    pub(crate) value: RwLock<String>,
}

/// Handle to a node of an XML tree.
#[derive(Clone)]
pub struct Node(pub(crate) Arc<Inner>);

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

/// Attribute and text nodes compare equal to their string value.
impl PartialEq<str> for Node {
    fn eq(&self, other: &str) -> bool {
        match &self.0.data {
            NodeData::Attribute(a) => *read(&a.value) == other,
            NodeData::Text { data, .. } => *read(data) == other,
            _ => false,
        }
    }
}

impl PartialEq<&str> for Node {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Node");
        s.field("kind", &self.kind());
        if let Some(name) = self.name() {
            s.field("name", &name);
        }
        if let Some(value) = self.value() {
            s.field("value", &value);
        }
        s.field("order", &self.document_order()).finish()
    }
}

impl Node {
    pub(crate) fn from_data(data: NodeData) -> Self {
        Node(Arc::new(Inner { data, parent: RwLock::new(Weak::new()), order: AtomicI64::new(-1) }))
    }

    pub(crate) fn new_document(declaration: XmlDeclaration) -> Self {
        Self::from_data(NodeData::Document(DocumentData {
            children: RwLock::new(Vec::new()),
            declaration: RwLock::new(declaration),
            next_order: AtomicI64::new(0),
        }))
    }

    /// Creates a detached element. Its namespace scope starts from the root
    /// scope and is recomputed when it is attached somewhere.
    pub fn new_element<I, K, V>(name: &str, attributes: I) -> Result<Node, NamespaceError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let state = element_state(name, collect_attributes(attributes)?, &NamespaceScope::root())?;
        Ok(Self::element_from_state(state))
    }

    /// Creates a detached element in `namespace`, declaring it on the element
    /// itself (as default namespace, or bound to `prefix`).
    pub fn new_element_ns(local: &str, namespace: &str, prefix: Option<&str>) -> Result<Node, NamespaceError> {
        match prefix {
            Some(p) => Self::new_element(&format!("{p}:{local}"), [(format!("xmlns:{p}"), namespace)]),
            None => Self::new_element(local, [(XMLNS_PREFIX.to_string(), namespace)]),
        }
    }

    pub(crate) fn element_from_state(state: ElementState) -> Node {
        let node = Self::from_data(NodeData::Element(ElementData {
            name: RwLock::new(state.name.clone()),
            scope: RwLock::new(NamespaceScope::root()),
            attributes: RwLock::new(BTreeMap::new()),
            attribute_nodes: RwLock::new(Vec::new()),
            namespace_nodes: RwLock::new(Vec::new()),
            children: RwLock::new(Vec::new()),
        }));
        node.install_state(state);
        node
    }

    pub fn new_text(data: impl Into<String>) -> Node {
        Self::from_data(NodeData::Text { data: RwLock::new(data.into()), cdata: false })
    }

    /// Text that serializes as a CDATA section.
    pub fn new_cdata(data: impl Into<String>) -> Node {
        Self::from_data(NodeData::Text { data: RwLock::new(data.into()), cdata: true })
    }

    pub fn new_comment(data: impl Into<String>) -> Node {
        Self::from_data(NodeData::Comment(RwLock::new(data.into())))
    }

    pub fn new_processing_instruction(target: impl Into<String>, data: impl Into<String>) -> Node {
        Self::from_data(NodeData::ProcessingInstruction { target: target.into(), data: RwLock::new(data.into()) })
    }

    /// Replaces scope, name, attribute and namespace nodes of an element.
    /// Attribute nodes whose raw name survives keep their identity.
    pub(crate) fn install_state(&self, state: ElementState) {
        let NodeData::Element(el) = &self.0.data else { return };
        let ElementState { scope, name, attributes, attribute_names } = state;

        let namespace_nodes: Vec<Node> = scope
            .iter()
            .map(|(prefix, uri)| {
                let ns = Self::from_data(NodeData::Namespace {
                    prefix: prefix.map(ToString::to_string),
                    uri: uri.to_string(),
                });
                ns.set_parent(Some(self));
                ns
            })
            .collect();

        let previous = std::mem::take(&mut *write(&el.attribute_nodes));
        let mut attribute_nodes = Vec::with_capacity(attributes.len());
        for ((key, value), qname) in attributes.iter().zip(attribute_names) {
            let existing = previous.iter().find(|n| matches!(&n.0.data, NodeData::Attribute(a) if &a.key == key));
            let node = match existing {
                Some(node) => {
                    if let NodeData::Attribute(a) = &node.0.data {
                        *write(&a.name) = qname;
                        write(&a.value).clone_from(value);
                    }
                    node.clone()
                }
                None => {
                    let node = Self::from_data(NodeData::Attribute(AttributeData {
                        key: key.clone(),
                        name: RwLock::new(qname),
                        value: RwLock::new(value.clone()),
                    }));
                    node.set_parent(Some(self));
                    node
                }
            };
            attribute_nodes.push(node);
        }
        for stale in previous.iter().filter(|n| !attribute_nodes.contains(n)) {
            stale.set_parent(None);
            stale.set_order(-1);
        }

        *write(&el.name) = name;
        *write(&el.scope) = scope;
        *write(&el.attributes) = attributes;
        *write(&el.attribute_nodes) = attribute_nodes;
        *write(&el.namespace_nodes) = namespace_nodes;
    }

    pub fn kind(&self) -> NodeKind {
        match &self.0.data {
            NodeData::Document(_) => NodeKind::Document,
            NodeData::Element(_) => NodeKind::Element,
            NodeData::Attribute(_) => NodeKind::Attribute,
            NodeData::Namespace { .. } => NodeKind::Namespace,
            NodeData::Text { .. } => NodeKind::Text,
            NodeData::Comment(_) => NodeKind::Comment,
            NodeData::ProcessingInstruction { .. } => NodeKind::ProcessingInstruction,
        }
    }

    /// XPath type name: `root`, `element`, `attribute`, `namespace`, `text`,
    /// `comment` or `processing-instruction`.
    pub fn node_type(&self) -> &'static str {
        self.kind().as_str()
    }

    pub fn is_element(&self) -> bool {
        matches!(self.0.data, NodeData::Element(_))
    }

    pub fn is_document(&self) -> bool {
        matches!(self.0.data, NodeData::Document(_))
    }

    pub(crate) fn element_data(&self) -> Option<&ElementData> {
        match &self.0.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub(crate) fn children_lock(&self) -> Option<&RwLock<Vec<Node>>> {
        match &self.0.data {
            NodeData::Document(d) => Some(&d.children),
            NodeData::Element(el) => Some(&el.children),
            _ => None,
        }
    }

    // ----- structure -----

    pub fn parent(&self) -> Option<Node> {
        read(&self.0.parent).upgrade().map(Node)
    }

    pub(crate) fn set_parent(&self, parent: Option<&Node>) {
        *write(&self.0.parent) = parent.map_or_else(Weak::new, |p| Arc::downgrade(&p.0));
    }

    /// Ancestors from the parent up to the topmost node.
    pub fn ancestors(&self) -> Vec<Node> {
        let mut out = Vec::new();
        let mut cur = self.parent();
        while let Some(node) = cur {
            cur = node.parent();
            out.push(node);
        }
        out
    }

    /// Topmost ancestor, or the node itself when detached.
    pub fn root(&self) -> Node {
        self.ancestors().pop().unwrap_or_else(|| self.clone())
    }

    /// Owning document, if the node is attached to one.
    pub fn document(&self) -> Option<Document> {
        Document::from_node(self.root())
    }

    /// Position in document order, `-1` while the node is not attached to a
    /// document.
    pub fn document_order(&self) -> i64 {
        self.0.order.load(Ordering::Relaxed)
    }

    pub(crate) fn set_order(&self, order: i64) {
        self.0.order.store(order, Ordering::Relaxed);
    }

    pub fn children(&self) -> Vec<Node> {
        self.children_lock().map(|c| read(c).clone()).unwrap_or_default()
    }

    pub fn child_count(&self) -> usize {
        self.children_lock().map_or(0, |c| read(c).len())
    }

    pub fn has_children(&self) -> bool {
        self.child_count() > 0
    }

    pub fn child(&self, index: usize) -> Option<Node> {
        self.children_lock().and_then(|c| read(c).get(index).cloned())
    }

    /// Children within `range`, clamped to the child count.
    pub fn children_range(&self, range: impl RangeBounds<usize>) -> Vec<Node> {
        let Some(lock) = self.children_lock() else { return Vec::new() };
        let children = read(lock);
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => children.len(),
        };
        let end = end.min(children.len());
        if start >= end { Vec::new() } else { children[start..end].to_vec() }
    }

    pub fn index_of(&self, child: &Node) -> Option<usize> {
        self.children_lock().and_then(|c| read(c).iter().position(|n| n == child))
    }

    /// Index within the parent's child list. Attribute and namespace nodes
    /// have none.
    pub fn index_in_parent(&self) -> Option<usize> {
        self.parent().and_then(|p| p.index_of(self))
    }

    pub fn next_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let idx = parent.index_of(self)?;
        parent.child(idx + 1)
    }

    pub fn previous_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let idx = parent.index_of(self)?;
        idx.checked_sub(1).and_then(|i| parent.child(i))
    }

    /// Descendants in document order, excluding the node itself.
    pub fn descendants(&self) -> Vec<Node> {
        let mut out = Vec::new();
        let mut stack: Vec<Node> = self.children().into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            stack.extend(node.children().into_iter().rev());
            out.push(node);
        }
        out
    }

    pub fn root_element(&self) -> Option<Node> {
        match &self.0.data {
            NodeData::Document(d) => read(&d.children).iter().find(|c| c.is_element()).cloned(),
            _ => self.document().and_then(|d| d.root_element()),
        }
    }

    // ----- names and values -----

    /// Resolved name of an element or attribute.
    pub fn qname(&self) -> Option<QName> {
        match &self.0.data {
            NodeData::Element(el) => Some(read(&el.name).clone()),
            NodeData::Attribute(a) => Some(read(&a.name).clone()),
            _ => None,
        }
    }

    /// Name as written: qualified name of elements and attributes, target of
    /// processing instructions, prefix of namespace nodes.
    pub fn name(&self) -> Option<String> {
        match &self.0.data {
            NodeData::Element(el) => Some(read(&el.name).qualified()),
            NodeData::Attribute(a) => Some(a.key.clone()),
            NodeData::Namespace { prefix, .. } => Some(prefix.clone().unwrap_or_default()),
            NodeData::ProcessingInstruction { target, .. } => Some(target.clone()),
            _ => None,
        }
    }

    pub fn local_name(&self) -> Option<String> {
        match &self.0.data {
            NodeData::Element(el) => Some(read(&el.name).local.clone()),
            NodeData::Attribute(a) => Some(read(&a.name).local.clone()),
            NodeData::Namespace { prefix, .. } => Some(prefix.clone().unwrap_or_default()),
            NodeData::ProcessingInstruction { target, .. } => Some(target.clone()),
            _ => None,
        }
    }

    pub fn prefix(&self) -> Option<String> {
        self.qname().and_then(|q| q.prefix)
    }

    pub fn namespace_uri(&self) -> Option<String> {
        self.qname().and_then(|q| q.ns_uri)
    }

    /// `(namespace, local-name)` used by name tests.
    pub fn expanded_name(&self) -> Option<ExpandedName> {
        match &self.0.data {
            NodeData::Element(el) => Some(read(&el.name).expanded()),
            NodeData::Attribute(a) => Some(read(&a.name).expanded()),
            NodeData::Namespace { prefix, .. } => Some(ExpandedName::new(None, prefix.as_deref().unwrap_or(""))),
            NodeData::ProcessingInstruction { target, .. } => Some(ExpandedName::new(None, target)),
            _ => None,
        }
    }

    /// Scalar content of leaf nodes: attribute value, character data,
    /// comment text, processing instruction data or namespace URI.
    pub fn value(&self) -> Option<String> {
        match &self.0.data {
            NodeData::Attribute(a) => Some(read(&a.value).clone()),
            NodeData::Namespace { uri, .. } => Some(uri.clone()),
            NodeData::Text { data, .. } | NodeData::Comment(data) | NodeData::ProcessingInstruction { data, .. } => {
                Some(read(data).clone())
            }
            NodeData::Document(_) | NodeData::Element(_) => None,
        }
    }

    pub fn is_cdata(&self) -> bool {
        matches!(self.0.data, NodeData::Text { cdata: true, .. })
    }

    /// XPath string-value.
    pub fn string_value(&self) -> String {
        match &self.0.data {
            NodeData::Document(_) | NodeData::Element(_) => {
                let mut out = String::new();
                let mut stack: Vec<Node> = self.children().into_iter().rev().collect();
                while let Some(node) = stack.pop() {
                    match &node.0.data {
                        NodeData::Text { data, .. } => out.push_str(&read(data)),
                        NodeData::Element(_) => stack.extend(node.children().into_iter().rev()),
                        _ => {}
                    }
                }
                out
            }
            _ => self.value().unwrap_or_default(),
        }
    }

    // ----- attributes and namespaces -----

    /// Raw attributes keyed by name as written.
    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.element_data().map(|el| read(&el.attributes).clone()).unwrap_or_default()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.element_data().and_then(|el| read(&el.attributes).get(name).cloned())
    }

    /// Attribute nodes in name order, including namespace declarations.
    pub fn attribute_nodes(&self) -> Vec<Node> {
        self.element_data().map(|el| read(&el.attribute_nodes).clone()).unwrap_or_default()
    }

    pub fn attribute_node(&self, name: &str) -> Option<Node> {
        let el = self.element_data()?;
        read(&el.attribute_nodes).iter().find(|n| n.name().as_deref() == Some(name)).cloned()
    }

    /// One namespace node per binding in scope, default namespace first.
    pub fn namespace_nodes(&self) -> Vec<Node> {
        self.element_data().map(|el| read(&el.namespace_nodes).clone()).unwrap_or_default()
    }

    pub fn namespace_node(&self, prefix: Option<&str>) -> Option<Node> {
        let el = self.element_data()?;
        read(&el.namespace_nodes)
            .iter()
            .find(|n| matches!(&n.0.data, NodeData::Namespace { prefix: p, .. } if p.as_deref() == prefix))
            .cloned()
    }

    /// In-scope bindings of an element.
    pub fn namespace_scope(&self) -> Option<NamespaceScope> {
        self.element_data().map(|el| read(&el.scope).clone())
    }

    /// Namespace bound to `prefix` (`None` asks for the default namespace,
    /// which may be unset). Non-element nodes delegate to their parent; a
    /// document answers only the reserved prefixes.
    pub fn resolve_prefix(&self, prefix: Option<&str>) -> Result<Option<String>, NamespaceError> {
        match &self.0.data {
            NodeData::Element(el) => {
                let scope = read(&el.scope);
                match scope.resolve(prefix) {
                    Some(uri) => Ok(Some(uri.to_string())),
                    None if prefix.is_none() => Ok(None),
                    None => Err(NamespaceError::unknown_prefix(prefix)),
                }
            }
            NodeData::Document(_) => match prefix {
                None => Ok(None),
                Some(XML_PREFIX) => Ok(Some(XML_NAMESPACE.to_string())),
                Some(XMLNS_PREFIX) => Ok(Some(XMLNS_NAMESPACE.to_string())),
                Some(p) => Err(NamespaceError::UnknownPrefix(p.to_string())),
            },
            _ => match self.parent() {
                Some(parent) => parent.resolve_prefix(prefix),
                None => Err(NamespaceError::unknown_prefix(prefix)),
            },
        }
    }

    /// Prefix bound to `ns_uri`; `Ok(None)` means it is the default
    /// namespace.
    pub fn namespace_prefix(&self, ns_uri: &str) -> Result<Option<String>, NamespaceError> {
        match &self.0.data {
            NodeData::Element(el) => read(&el.scope)
                .prefix_for(ns_uri)
                .map(|p| p.map(ToString::to_string))
                .ok_or_else(|| NamespaceError::UnknownNamespace(ns_uri.to_string())),
            NodeData::Document(_) => match ns_uri {
                XML_NAMESPACE => Ok(Some(XML_PREFIX.to_string())),
                XMLNS_NAMESPACE => Ok(Some(XMLNS_PREFIX.to_string())),
                _ => Err(NamespaceError::UnknownNamespace(ns_uri.to_string())),
            },
            _ => match self.parent() {
                Some(parent) => parent.namespace_prefix(ns_uri),
                None => Err(NamespaceError::UnknownNamespace(ns_uri.to_string())),
            },
        }
    }

    /// First element in document order, starting at this node, that carries
    /// an `id` or `*:id` attribute equal to `id`.
    pub fn find_by_id(&self, id: &str) -> Option<Node> {
        let is_id = |key: &str| key == "id" || key.ends_with(":id");
        std::iter::once(self.clone())
            .chain(self.descendants())
            .filter(Node::is_element)
            .find(|el| el.attributes().iter().any(|(k, v)| is_id(k) && v == id))
    }

    /// Structural equality: same kinds, names, attributes, values and
    /// children, recursively.
    pub fn is_equal_node(&self, other: &Node) -> bool {
        if self.kind() != other.kind()
            || self.expanded_name() != other.expanded_name()
            || self.name() != other.name()
            || self.value() != other.value()
            || self.is_cdata() != other.is_cdata()
            || self.attributes() != other.attributes()
        {
            return false;
        }
        let (a, b) = (self.children(), other.children());
        a.len() == b.len() && a.iter().zip(&b).all(|(x, y)| x.is_equal_node(y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_element_has_root_scope() {
        let el = Node::new_element("a", [("id", "1")]).unwrap();
        assert_eq!(el.document_order(), -1);
        assert_eq!(el.namespace_nodes().len(), 1);
        assert_eq!(el.resolve_prefix(Some("xml")).unwrap().as_deref(), Some(XML_NAMESPACE));
        assert_eq!(el.attribute_node("id").unwrap().parent(), Some(el.clone()));
        assert!(el.document().is_none());
    }

    #[test]
    fn leaf_nodes_compare_to_strings() {
        let el = Node::new_element("a", [("type", "warning")]).unwrap();
        assert!(el.attribute_node("type").unwrap() == "warning");
        assert!(Node::new_text("delta") == "delta");
        assert!(Node::new_comment("delta") != "delta");
    }

    #[test]
    fn leaf_without_parent_cannot_resolve() {
        let text = Node::new_text("x");
        assert_eq!(text.resolve_prefix(Some("p")), Err(NamespaceError::UnknownPrefix("p".into())));
        assert!(text.namespace_prefix("urn:x").is_err());
    }

    #[test]
    fn names_of_leaf_kinds() {
        let pi = Node::new_processing_instruction("xml-stylesheet", "href=\"a.css\"");
        assert_eq!(pi.name().as_deref(), Some("xml-stylesheet"));
        assert_eq!(pi.expanded_name(), Some(ExpandedName::new(None, "xml-stylesheet")));
        assert_eq!(pi.node_type(), "processing-instruction");
        assert_eq!(Node::new_comment("c").expanded_name(), None);
    }
}

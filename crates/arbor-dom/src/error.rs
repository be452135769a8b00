use thiserror::Error;

use crate::model::NodeKind;

/// Failures while building or resolving namespace scopes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamespaceError {
    #[error("unknown namespace prefix '{0}'")]
    UnknownPrefix(String),

    #[error("no prefix is bound to namespace '{0}'")]
    UnknownNamespace(String),

    #[error("namespace prefix '{0}' is already declared on this element")]
    PrefixRedefine(String),

    #[error("attributes '{first}' and '{second}' both expand to {{{ns_uri}}}{local}")]
    DuplicateNamespace { first: String, second: String, ns_uri: String, local: String },

    #[error("attribute '{0}' is specified more than once")]
    DuplicateAttribute(String),
}

impl NamespaceError {
    pub(crate) fn unknown_prefix(prefix: Option<&str>) -> Self {
        Self::UnknownPrefix(prefix.unwrap_or_default().to_string())
    }
}

/// Failures of the tree mutation API. A failed call leaves the tree unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error(transparent)]
    Namespace(#[from] NamespaceError),

    #[error("a {child} node cannot be a child of a {parent} node")]
    InvalidChild { parent: NodeKind, child: NodeKind },

    #[error("child index {index} is out of bounds for {len} children")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("a node cannot be inserted below itself or one of its descendants")]
    HierarchyRequest,

    #[error("a document can hold only one root element")]
    DuplicateRootElement,

    #[error("{0} nodes have no children")]
    NotAContainer(NodeKind),

    #[error("{0} nodes have no attributes or names to change")]
    NotAnElement(NodeKind),

    #[error("{0} nodes carry no value")]
    NoValue(NodeKind),

    #[error("node is not a child of this node")]
    NotAChild,
}

/// Failures of [`Document::parse`](crate::Document::parse).
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("cannot resolve reference: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("unsupported encoding '{0}'")]
    UnsupportedEncoding(String),

    #[error("document is not valid {0}")]
    Encoding(&'static str),

    #[error(transparent)]
    Namespace(#[from] NamespaceError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("invalid document structure: {0}")]
    Structure(String),
}

impl DocumentError {
    pub(crate) fn structure(msg: impl Into<String>) -> Self {
        Self::Structure(msg.into())
    }

    pub fn is_namespace_error(&self) -> bool {
        matches!(self, Self::Namespace(_) | Self::Tree(TreeError::Namespace(_)))
    }
}

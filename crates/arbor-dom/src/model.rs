use std::fmt;

/// Kind tag of a tree node. `as_str` yields the type names used by XPath
/// node-type tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Namespace,
    Text,
    Comment,
    ProcessingInstruction,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Document => "root",
            NodeKind::Element => "element",
            NodeKind::Attribute => "attribute",
            NodeKind::Namespace => "namespace",
            NodeKind::Text => "text",
            NodeKind::Comment => "comment",
            NodeKind::ProcessingInstruction => "processing-instruction",
        }
    }

    /// Kinds that may appear in an element's or document's child list.
    pub fn is_child_kind(self) -> bool {
        matches!(
            self,
            NodeKind::Element | NodeKind::Text | NodeKind::Comment | NodeKind::ProcessingInstruction
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qualified name as written in the source together with its resolved
/// namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub ns_uri: Option<String>,
}

impl QName {
    /// Splits `raw` at the first colon without resolving the prefix.
    pub fn split(raw: &str) -> (Option<&str>, &str) {
        match raw.split_once(':') {
            Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => (Some(prefix), local),
            _ => (None, raw),
        }
    }

    /// Name as written, `prefix:local` or `local`.
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:{}", self.local),
            None => self.local.clone(),
        }
    }

    pub fn expanded(&self) -> ExpandedName {
        ExpandedName { ns_uri: self.ns_uri.clone(), local: self.local.clone() }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(p) => write!(f, "{p}:{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// `(namespace, local-name)` pair used by name tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedName {
    pub ns_uri: Option<String>,
    pub local: String,
}

impl ExpandedName {
    pub fn new(ns_uri: Option<&str>, local: &str) -> Self {
        Self { ns_uri: ns_uri.map(ToString::to_string), local: local.to_string() }
    }
}

impl fmt::Display for ExpandedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns_uri {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

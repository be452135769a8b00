use arbor_dom::NamespaceError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XPathError {
    /// Malformed expression text.
    #[error("XPath syntax error: {0}")]
    XPathSyntax(String),
    /// The parser reached a structurally invalid state, e.g. a predicate
    /// with nothing to filter.
    #[error("invalid expression structure: {0}")]
    Syntax(String),
    #[error(transparent)]
    Namespace(#[from] NamespaceError),
    #[error("XPath version {0} is not implemented")]
    NotImplemented(String),
    #[error("type error: {0}")]
    Type(String),
    #[error("variable ${0} is not bound")]
    UnknownVariable(String),
    #[error("node is not attached to a document")]
    Detached,
}

impl XPathError {
    pub(crate) fn syntax(msg: impl Into<String>) -> Self {
        Self::XPathSyntax(msg.into())
    }

    pub(crate) fn parse_state(msg: impl Into<String>) -> Self {
        Self::Syntax(msg.into())
    }

    pub(crate) fn type_error(msg: impl Into<String>) -> Self {
        Self::Type(msg.into())
    }

    /// True for both malformed text and invalid parse structure.
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::XPathSyntax(_) | Self::Syntax(_))
    }
}

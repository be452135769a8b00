use std::sync::OnceLock;

use arbor_dom::{Document, Node};

use crate::error::XPathError;
use crate::runtime::XPathContext;
use crate::value::Value;

/// XPath evaluation on tree nodes.
pub trait XPathExt {
    /// Evaluates `expression` with this node as context node.
    fn xpath(&self, expression: &str) -> Result<Value, XPathError>;

    fn xpath_with(&self, expression: &str, context: &XPathContext) -> Result<Value, XPathError>;
}

fn default_context() -> &'static XPathContext {
    static CONTEXT: OnceLock<XPathContext> = OnceLock::new();
    CONTEXT.get_or_init(XPathContext::default)
}

impl XPathExt for Node {
    fn xpath(&self, expression: &str) -> Result<Value, XPathError> {
        default_context().evaluate(self, expression)
    }

    fn xpath_with(&self, expression: &str, context: &XPathContext) -> Result<Value, XPathError> {
        context.evaluate(self, expression)
    }
}

impl XPathExt for Document {
    fn xpath(&self, expression: &str) -> Result<Value, XPathError> {
        self.as_node().xpath(expression)
    }

    fn xpath_with(&self, expression: &str, context: &XPathContext) -> Result<Value, XPathError> {
        self.as_node().xpath_with(expression, context)
    }
}

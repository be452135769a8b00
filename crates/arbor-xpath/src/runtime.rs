//! Evaluation context: variables, extra functions, namespace bindings and
//! the requested XPath version.
use std::collections::{BTreeMap, HashMap};

use arbor_dom::Node;

use crate::ast::Expr;
use crate::error::XPathError;
use crate::eval::{Env, Focus};
use crate::functions::{CallContext, Function, FunctionRegistry, FunctionTable};
use crate::lexer::tokenize;
use crate::parser::parse;
use crate::value::Value;

pub const XPATH_VERSION: &str = "1.0";

#[derive(Debug, Clone)]
pub struct XPathContext {
    variables: HashMap<String, Value>,
    functions: FunctionRegistry,
    namespaces: BTreeMap<String, String>,
    version: String,
}

impl Default for XPathContext {
    fn default() -> Self {
        Self {
            variables: HashMap::new(),
            functions: FunctionRegistry::new(),
            namespaces: BTreeMap::new(),
            version: XPATH_VERSION.to_string(),
        }
    }
}

impl XPathContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> XPathContextBuilder {
        XPathContextBuilder::new()
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Functions added for this context; the core library is not listed.
    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.namespaces.get(prefix).map(String::as_str)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    fn check_version(&self) -> Result<(), XPathError> {
        match self.version.trim().parse::<f64>() {
            Ok(v) if v == 1.0 => Ok(()),
            _ => Err(XPathError::NotImplemented(self.version.clone())),
        }
    }

    /// Parses `expression`, resolving function names against this
    /// context's functions and the core library.
    pub fn compile(&self, expression: &str) -> Result<Expr, XPathError> {
        self.check_version()?;
        let tokens = tokenize(expression)?;
        let expr = parse(&tokens, FunctionTable::new(Some(&self.functions)))?;
        tracing::debug!(expression, tokens = tokens.len(), "compiled");
        Ok(expr)
    }

    pub fn evaluate(&self, node: &Node, expression: &str) -> Result<Value, XPathError> {
        let expr = self.compile(expression)?;
        self.evaluate_compiled(node, &expr)
    }

    /// Evaluates with `node` as context node at position 1 of 1.
    pub fn evaluate_compiled(&self, node: &Node, expr: &Expr) -> Result<Value, XPathError> {
        self.check_version()?;
        let env = Env {
            variables: &self.variables,
            functions: FunctionTable::new(Some(&self.functions)),
            namespaces: &self.namespaces,
            origin: node,
        };
        let value = env.evaluate(expr, Focus::single(node))?;
        tracing::debug!(expression = %expr, result = value.type_name(), "evaluated");
        Ok(value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct XPathContextBuilder {
    ctx: XPathContext,
}

impl XPathContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ctx.variables.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_variables<I, K, V>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.ctx.variables.extend(variables.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Adds or overrides a function for evaluations with this context.
    #[must_use]
    pub fn with_function<F>(mut self, name: &str, min_arity: usize, max_arity: Option<usize>, f: F) -> Self
    where
        F: Fn(&CallContext<'_>, Vec<Value>) -> Result<Value, XPathError> + Send + Sync + 'static,
    {
        self.ctx.functions.insert(name, Function::new(min_arity, max_arity, f));
        self
    }

    #[must_use]
    pub fn with_functions<I>(mut self, functions: I) -> Self
    where
        I: IntoIterator<Item = (String, Function)>,
    {
        for (name, function) in functions {
            self.ctx.functions.insert(name, function);
        }
        self
    }

    /// Binds `prefix` for qualified name tests. Caller bindings take
    /// precedence over the context node's scope.
    #[must_use]
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.ctx.namespaces.insert(prefix.into(), uri.into());
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.ctx.version = version.into();
        self
    }

    pub fn build(self) -> XPathContext {
        self.ctx
    }
}

/// Parses `expression` against the core function library.
pub fn compile(expression: &str) -> Result<Expr, XPathError> {
    XPathContext::default().compile(expression)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_settings() {
        let ctx = XPathContext::builder()
            .with_variable("a", 1.0)
            .with_variables([("b", "x"), ("c", "y")])
            .with_namespace("p", "urn:p")
            .with_function("twice", 1, Some(1), |_, args| Ok(Value::Number(args[0].to_number() * 2.0)))
            .build();
        assert_eq!(ctx.variable("a"), Some(&Value::Number(1.0)));
        assert_eq!(ctx.variable("c"), Some(&Value::String("y".into())));
        assert_eq!(ctx.namespace("p"), Some("urn:p"));
        assert!(ctx.functions().contains("twice"));
        assert_eq!(ctx.version(), "1.0");
    }

    #[test]
    fn other_versions_are_rejected() {
        let ctx = XPathContext::builder().with_version("2.0").build();
        assert_eq!(ctx.compile("1"), Err(XPathError::NotImplemented("2.0".into())));
        assert!(XPathContext::builder().with_version("1").build().compile("1").is_ok());
    }
}

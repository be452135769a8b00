//! XPath 1.0 core function library and the function registry.
//!
//! The default registry is built once per process and never mutated.
//! Callers add or override functions for a single evaluation through
//! [`XPathContextBuilder::with_function`](crate::XPathContextBuilder::with_function);
//! lookups consult those first.
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use arbor_dom::Node;

use crate::error::XPathError;
use crate::value::Value;

mod boolean;
mod nodeset;
mod numeric;
mod strings;

/// Evaluation state visible to a function call.
pub struct CallContext<'a> {
    pub node: &'a Node,
    pub position: usize,
    pub size: usize,
}

impl CallContext<'_> {
    /// Context node as a one-node set.
    pub fn context_value(&self) -> Value {
        Value::from(vec![self.node.clone()])
    }
}

pub type FunctionImpl = Arc<dyn Fn(&CallContext<'_>, Vec<Value>) -> Result<Value, XPathError> + Send + Sync>;

/// A callable with its accepted argument counts. `max_arity` is `None` for
/// variadic functions.
#[derive(Clone)]
pub struct Function {
    pub min_arity: usize,
    pub max_arity: Option<usize>,
    func: FunctionImpl,
}

impl Function {
    pub fn new<F>(min_arity: usize, max_arity: Option<usize>, f: F) -> Self
    where
        F: Fn(&CallContext<'_>, Vec<Value>) -> Result<Value, XPathError> + Send + Sync + 'static,
    {
        Self { min_arity, max_arity, func: Arc::new(f) }
    }

    pub fn accepts(&self, argc: usize) -> bool {
        argc >= self.min_arity && self.max_arity.is_none_or(|max| argc <= max)
    }

    pub fn call(&self, ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, XPathError> {
        (self.func)(ctx, args)
    }

    fn arity_description(&self) -> String {
        match self.max_arity {
            Some(max) if max == self.min_arity => format!("exactly {max}"),
            Some(max) => format!("{} to {max}", self.min_arity),
            None => format!("at least {}", self.min_arity),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").field("min_arity", &self.min_arity).field("max_arity", &self.max_arity).finish()
    }
}

/// Functions keyed by name.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    fns: HashMap<String, Function>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, function: Function) {
        self.fns.insert(name.into(), function);
    }

    /// Registers a function taking exactly `arity` arguments.
    pub fn register<F>(&mut self, name: &str, arity: usize, f: F)
    where
        F: Fn(&CallContext<'_>, Vec<Value>) -> Result<Value, XPathError> + Send + Sync + 'static,
    {
        self.insert(name, Function::new(arity, Some(arity), f));
    }

    pub fn register_range<F>(&mut self, name: &str, min_arity: usize, max_arity: Option<usize>, f: F)
    where
        F: Fn(&CallContext<'_>, Vec<Value>) -> Result<Value, XPathError> + Send + Sync + 'static,
    {
        self.insert(name, Function::new(min_arity, max_arity, f));
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.fns.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fns.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fns.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fns.is_empty()
    }
}

/// The XPath 1.0 core library.
pub fn default_function_registry() -> &'static FunctionRegistry {
    static REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut reg = FunctionRegistry::new();
        nodeset::register(&mut reg);
        strings::register(&mut reg);
        boolean::register(&mut reg);
        numeric::register(&mut reg);
        reg
    })
}

/// Caller overrides layered over the defaults.
#[derive(Clone, Copy)]
pub(crate) struct FunctionTable<'a> {
    defaults: &'a FunctionRegistry,
    overrides: Option<&'a FunctionRegistry>,
}

impl<'a> FunctionTable<'a> {
    pub(crate) fn new(overrides: Option<&'a FunctionRegistry>) -> Self {
        Self { defaults: default_function_registry(), overrides }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&'a Function> {
        self.overrides.and_then(|o| o.get(name)).or_else(|| self.defaults.get(name))
    }

    pub(crate) fn check_arity(&self, name: &str, argc: usize) -> Result<(), XPathError> {
        let function = self.get(name).ok_or_else(|| XPathError::syntax(format!("unknown function {name}()")))?;
        if function.accepts(argc) {
            Ok(())
        } else {
            Err(XPathError::syntax(format!(
                "{name}() takes {} argument(s), got {argc}",
                function.arity_description()
            )))
        }
    }
}

/// Fixed-arity argument unpacking; arity was checked at parse time.
pub(crate) fn take<const N: usize>(args: Vec<Value>) -> Result<[Value; N], XPathError> {
    let argc = args.len();
    args.try_into().map_err(|_| XPathError::parse_state(format!("expected {N} arguments, got {argc}")))
}

/// First argument as a string, or the context node's string-value.
pub(crate) fn string_or_context(ctx: &CallContext<'_>, args: Vec<Value>) -> String {
    match args.into_iter().next() {
        Some(v) => v.to_xpath_string(),
        None => ctx.node.string_value(),
    }
}

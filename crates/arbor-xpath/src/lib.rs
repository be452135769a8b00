//! XPath 1.0 over [`arbor_dom`] trees.
//!
//! ```
//! use arbor_dom::Document;
//! use arbor_xpath::{Value, XPathContext, XPathExt};
//!
//! let doc = Document::parse_str("<list><item n='1'/><item n='2'/><item n='3'/></list>").unwrap();
//! let items = doc.xpath("/list/item[@n > 1]").unwrap();
//! assert_eq!(items.nodes().len(), 2);
//! assert_eq!(doc.xpath("count(//item)").unwrap(), 3.0);
//!
//! let ctx = XPathContext::builder().with_variable("n", "2").build();
//! let hit = doc.xpath_with("string(//item[@n = $n]/@n)", &ctx).unwrap();
//! assert_eq!(hit, Value::String("2".into()));
//! ```
pub mod ast;
mod axes;
pub mod error;
mod eval;
mod ext;
pub mod functions;
pub mod lexer;
mod parser;
pub mod runtime;
pub mod value;

pub use ast::{AxisKind, Expr, NodeTest, OperatorKind};
pub use error::XPathError;
pub use ext::XPathExt;
pub use functions::{CallContext, Function, FunctionRegistry, default_function_registry};
pub use lexer::tokenize;
pub use runtime::{XPathContext, XPathContextBuilder, compile};
pub use value::{NodeSet, Value};

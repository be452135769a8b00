//! XML document tree with namespace scopes and document order.
//!
//! ```
//! use arbor_dom::Document;
//!
//! let doc = Document::parse_str(r#"<root xmlns:p="urn:p"><p:item id="1">text</p:item></root>"#).unwrap();
//! let root = doc.root_element().unwrap();
//! let item = root.child(0).unwrap();
//! assert_eq!(item.namespace_uri().as_deref(), Some("urn:p"));
//! assert_eq!(item.attribute("id").as_deref(), Some("1"));
//! assert_eq!(root.string_value(), "text");
//! assert!(root.document_order() < item.document_order());
//! ```
pub mod builder;
pub mod consts;
pub mod document;
pub mod error;
pub mod model;
mod mutate;
pub mod node;
mod produce;
mod reader;
pub mod scope;

pub use builder::{DocumentBuilder, ParseOptions};
pub use document::{Document, XmlDeclaration, first_in_document_order, sort_document_order};
pub use error::{DocumentError, NamespaceError, TreeError};
pub use model::{ExpandedName, NodeKind, QName};
pub use node::Node;
pub use scope::NamespaceScope;

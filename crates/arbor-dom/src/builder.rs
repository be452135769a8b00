//! Event-driven tree construction.
//!
//! [`DocumentBuilder`] receives start/end-element, character data, comment
//! and processing-instruction events in document order, builds the tree and
//! assigns document order as nodes attach. [`Document::parse`] feeds it from
//! `quick-xml`; other event sources may drive it directly.
use crate::document::{Document, XmlDeclaration};
use crate::error::DocumentError;
use crate::node::{Node, write};
use crate::scope::{NamespaceScope, collect_attributes, element_state};

/// Parser configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Trim character data and drop whitespace-only text, except below an
    /// `xml:space="preserve"` element.
    pub skip_whitespace: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { skip_whitespace: true }
    }
}

impl ParseOptions {
    pub fn with_skip_whitespace(mut self, skip: bool) -> Self {
        self.skip_whitespace = skip;
        self
    }
}

struct OpenElement {
    node: Node,
    preserve_space: bool,
}

pub struct DocumentBuilder {
    document: Document,
    options: ParseOptions,
    open: Vec<OpenElement>,
    pending_text: String,
}

impl DocumentBuilder {
    pub fn new(options: ParseOptions) -> Self {
        Self { document: Document::new(), options, open: Vec::new(), pending_text: String::new() }
    }

    pub fn xml_declaration(&mut self, version: &str, encoding: Option<&str>, standalone: Option<bool>) {
        self.document.set_declaration(XmlDeclaration {
            version: version.to_string(),
            encoding: encoding.map(ToString::to_string),
            standalone,
        });
    }

    /// Opens an element. Namespace declarations among `attributes` are
    /// applied before the element and attribute names are resolved.
    pub fn start_element<I, K, V>(&mut self, name: &str, attributes: I) -> Result<(), DocumentError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.flush_text()?;
        if self.open.is_empty() && self.document.root_element().is_some() {
            return Err(DocumentError::structure(format!("second root element <{name}>")));
        }

        let state = {
            let parent_scope = match self.open.last() {
                Some(open) => open.node.namespace_scope().unwrap_or_default(),
                None => NamespaceScope::root(),
            };
            element_state(name, collect_attributes(attributes)?, &parent_scope)?
        };
        let inherited = self.open.last().is_some_and(|o| o.preserve_space);
        let preserve_space = match state.attributes.get("xml:space").map(String::as_str) {
            Some("preserve") => true,
            Some("default") => false,
            _ => inherited,
        };

        let node = Node::element_from_state(state);
        self.attach(&node);
        tracing::trace!(element = name, depth = self.open.len(), "start element");
        self.open.push(OpenElement { node, preserve_space });
        Ok(())
    }

    pub fn end_element(&mut self) -> Result<(), DocumentError> {
        self.flush_text()?;
        self.open.pop().map(|_| ()).ok_or_else(|| DocumentError::structure("end tag without open element"))
    }

    /// Character data; adjacent calls merge into one text node.
    pub fn character_data(&mut self, text: &str) {
        self.pending_text.push_str(text);
    }

    /// CDATA section, kept verbatim as its own text node.
    pub fn cdata(&mut self, text: &str) -> Result<(), DocumentError> {
        self.flush_text()?;
        if self.open.is_empty() {
            return Err(DocumentError::structure("CDATA section outside the root element"));
        }
        self.attach(&Node::new_cdata(text));
        Ok(())
    }

    pub fn comment(&mut self, text: &str) -> Result<(), DocumentError> {
        self.flush_text()?;
        self.attach(&Node::new_comment(text));
        Ok(())
    }

    pub fn processing_instruction(&mut self, target: &str, data: &str) -> Result<(), DocumentError> {
        self.flush_text()?;
        self.attach(&Node::new_processing_instruction(target, data));
        Ok(())
    }

    /// Completes the document. Fails if elements are still open or no root
    /// element was seen.
    pub fn finish(mut self) -> Result<Document, DocumentError> {
        self.flush_text()?;
        if let Some(open) = self.open.last() {
            let name = open.node.name().unwrap_or_default();
            return Err(DocumentError::structure(format!("element <{name}> is not closed")));
        }
        if self.document.root_element().is_none() {
            return Err(DocumentError::structure("document has no root element"));
        }
        Ok(self.document)
    }

    fn attach(&mut self, node: &Node) {
        let parent = self.open.last().map_or_else(|| self.document.as_node().clone(), |o| o.node.clone());
        if let Some(children) = parent.children_lock() {
            write(children).push(node.clone());
        }
        node.set_parent(Some(&parent));
        self.document.extend_order(node);
    }

    fn flush_text(&mut self) -> Result<(), DocumentError> {
        if self.pending_text.is_empty() {
            return Ok(());
        }
        let raw = std::mem::take(&mut self.pending_text);
        let Some(open) = self.open.last() else {
            if raw.trim().is_empty() {
                return Ok(());
            }
            return Err(DocumentError::structure("text outside the root element"));
        };
        let text = if open.preserve_space || !self.options.skip_whitespace {
            raw
        } else {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(());
            }
            trimmed.to_string()
        };
        self.attach(&Node::new_text(text));
        Ok(())
    }
}

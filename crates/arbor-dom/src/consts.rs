/// Namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace of `xmlns` and `xmlns:*` declaration attributes.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

pub const XML_PREFIX: &str = "xml";
pub const XMLNS_PREFIX: &str = "xmlns";

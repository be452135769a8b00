//! Per-element namespace scopes.
//!
//! An element's scope is its parent's scope with the element's own `xmlns`
//! and `xmlns:*` declarations applied on top. Declarations are applied
//! before the element name and attribute names are resolved, so both may
//! use prefixes declared on the same element.
use std::collections::{BTreeMap, HashMap};

use crate::consts::{XML_NAMESPACE, XML_PREFIX, XMLNS_NAMESPACE, XMLNS_PREFIX};
use crate::error::NamespaceError;
use crate::model::{ExpandedName, QName};

/// Visible prefix bindings of an element. `None` is the default namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceScope {
    bindings: BTreeMap<Option<String>, String>,
}

impl Default for NamespaceScope {
    fn default() -> Self {
        Self::root()
    }
}

impl NamespaceScope {
    /// Scope of an element without element parent: only `xml` is bound.
    pub fn root() -> Self {
        let mut bindings = BTreeMap::new();
        bindings.insert(Some(XML_PREFIX.to_string()), XML_NAMESPACE.to_string());
        Self { bindings }
    }

    /// Namespace bound to `prefix`. `xmlns` always answers the reserved
    /// declaration namespace.
    pub fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some(XMLNS_PREFIX) {
            return Some(XMLNS_NAMESPACE);
        }
        self.bindings.get(&prefix.map(ToString::to_string)).map(String::as_str)
    }

    /// Prefix bound to `ns_uri`. The default namespace wins over prefixed
    /// bindings, otherwise the lexicographically first prefix is returned.
    pub fn prefix_for(&self, ns_uri: &str) -> Option<Option<&str>> {
        if ns_uri == XMLNS_NAMESPACE {
            return Some(Some(XMLNS_PREFIX));
        }
        self.bindings.iter().find(|(_, uri)| uri.as_str() == ns_uri).map(|(prefix, _)| prefix.as_deref())
    }

    pub fn default_namespace(&self) -> Option<&str> {
        self.resolve(None)
    }

    /// Bindings in prefix order, default namespace first.
    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, &str)> {
        self.bindings.iter().map(|(p, uri)| (p.as_deref(), uri.as_str()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn bind(&mut self, prefix: Option<&str>, ns_uri: &str) {
        self.bindings.insert(prefix.map(ToString::to_string), ns_uri.to_string());
    }

    fn unbind(&mut self, prefix: Option<&str>) {
        self.bindings.remove(&prefix.map(ToString::to_string));
    }

    /// Resolves a raw `prefix:local` element name.
    pub fn element_name(&self, raw: &str) -> Result<QName, NamespaceError> {
        let (prefix, local) = QName::split(raw);
        let ns_uri = match prefix {
            Some(p) => Some(self.resolve(Some(p)).ok_or_else(|| NamespaceError::UnknownPrefix(p.to_string()))?),
            None => self.default_namespace(),
        };
        Ok(QName {
            prefix: prefix.map(ToString::to_string),
            local: local.to_string(),
            ns_uri: ns_uri.map(ToString::to_string),
        })
    }

    /// Resolves a raw attribute name. Unprefixed attributes are in no
    /// namespace, except the bare `xmlns` declaration.
    pub fn attribute_name(&self, raw: &str) -> Result<QName, NamespaceError> {
        if raw == XMLNS_PREFIX {
            return Ok(QName { prefix: None, local: raw.to_string(), ns_uri: Some(XMLNS_NAMESPACE.to_string()) });
        }
        match QName::split(raw) {
            (Some(p), local) => {
                let ns_uri = self.resolve(Some(p)).ok_or_else(|| NamespaceError::UnknownPrefix(p.to_string()))?;
                Ok(QName { prefix: Some(p.to_string()), local: local.to_string(), ns_uri: Some(ns_uri.to_string()) })
            }
            (None, local) => Ok(QName { prefix: None, local: local.to_string(), ns_uri: None }),
        }
    }
}

/// Everything derived from an element's raw name and attributes.
#[derive(Debug, Clone)]
pub(crate) struct ElementState {
    pub scope: NamespaceScope,
    pub name: QName,
    pub attributes: BTreeMap<String, String>,
    pub attribute_names: Vec<QName>,
}

/// Collects raw attributes, rejecting repeated names.
pub(crate) fn collect_attributes<I, K, V>(raw: I) -> Result<BTreeMap<String, String>, NamespaceError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut attributes = BTreeMap::new();
    for (key, value) in raw {
        let key = key.into();
        if attributes.contains_key(&key) {
            return Err(match key.strip_prefix("xmlns:") {
                Some(prefix) => NamespaceError::PrefixRedefine(prefix.to_string()),
                None if key == XMLNS_PREFIX => NamespaceError::PrefixRedefine(String::new()),
                None => NamespaceError::DuplicateAttribute(key),
            });
        }
        attributes.insert(key, value.into());
    }
    Ok(attributes)
}

/// Computes scope, name and attribute names for an element below a parent
/// with scope `parent`.
pub(crate) fn element_state(
    raw_name: &str,
    attributes: BTreeMap<String, String>,
    parent: &NamespaceScope,
) -> Result<ElementState, NamespaceError> {
    let mut scope = parent.clone();

    if let Some(uri) = attributes.get(XMLNS_PREFIX) {
        if uri.is_empty() {
            scope.unbind(None);
        } else {
            scope.bind(None, uri);
        }
    }

    for (key, uri) in &attributes {
        let Some(prefix) = key.strip_prefix("xmlns:") else { continue };
        if prefix == XMLNS_PREFIX || (prefix == XML_PREFIX && uri != XML_NAMESPACE) {
            return Err(NamespaceError::PrefixRedefine(prefix.to_string()));
        }
        if uri.is_empty() {
            scope.unbind(Some(prefix));
        } else {
            scope.bind(Some(prefix), uri);
        }
    }

    let name = scope.element_name(raw_name)?;

    let mut seen: HashMap<ExpandedName, &str> = HashMap::new();
    let mut attribute_names = Vec::with_capacity(attributes.len());
    for key in attributes.keys() {
        let qname = scope.attribute_name(key)?;
        if qname.prefix.is_some() {
            if let Some(first) = seen.insert(qname.expanded(), key.as_str()) {
                return Err(NamespaceError::DuplicateNamespace {
                    first: first.to_string(),
                    second: key.clone(),
                    ns_uri: qname.ns_uri.clone().unwrap_or_default(),
                    local: qname.local.clone(),
                });
            }
        }
        attribute_names.push(qname);
    }

    Ok(ElementState { scope, name, attributes, attribute_names })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        collect_attributes(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn root_scope_binds_xml() {
        let scope = NamespaceScope::root();
        assert_eq!(scope.resolve(Some("xml")), Some(XML_NAMESPACE));
        assert_eq!(scope.resolve(Some("xmlns")), Some(XMLNS_NAMESPACE));
        assert_eq!(scope.resolve(None), None);
        assert_eq!(scope.len(), 1);
    }

    #[test]
    fn declarations_apply_before_name_resolution() {
        let st = element_state("t:Root", attrs(&[("xmlns:t", "urn:t"), ("t:a", "1")]), &NamespaceScope::root()).unwrap();
        assert_eq!(st.name.ns_uri.as_deref(), Some("urn:t"));
        assert_eq!(st.attribute_names[0].ns_uri.as_deref(), Some("urn:t"));
        assert_eq!(st.attribute_names[1].ns_uri.as_deref(), Some(XMLNS_NAMESPACE));
    }

    #[test]
    fn empty_default_declaration_unbinds() {
        let parent = element_state("a", attrs(&[("xmlns", "urn:d")]), &NamespaceScope::root()).unwrap();
        assert_eq!(parent.name.ns_uri.as_deref(), Some("urn:d"));
        let child = element_state("b", attrs(&[("xmlns", "")]), &parent.scope).unwrap();
        assert_eq!(child.name.ns_uri, None);
        assert_eq!(child.scope.default_namespace(), None);
    }

    #[test]
    fn child_may_override_inherited_prefix() {
        let parent = element_state("a", attrs(&[("xmlns:p", "urn:one")]), &NamespaceScope::root()).unwrap();
        let child = element_state("p:b", attrs(&[("xmlns:p", "urn:two")]), &parent.scope).unwrap();
        assert_eq!(child.name.ns_uri.as_deref(), Some("urn:two"));
    }

    #[rstest]
    #[case::repeated_prefix(&[("xmlns:p", "urn:a"), ("xmlns:p", "urn:b")], NamespaceError::PrefixRedefine("p".into()))]
    #[case::rebind_xml(&[("xmlns:xml", "urn:other")], NamespaceError::PrefixRedefine("xml".into()))]
    #[case::bind_xmlns(&[("xmlns:xmlns", "urn:other")], NamespaceError::PrefixRedefine("xmlns".into()))]
    #[case::repeated_attribute(&[("a", "1"), ("a", "2")], NamespaceError::DuplicateAttribute("a".into()))]
    #[case::unknown_attribute_prefix(&[("q:a", "1")], NamespaceError::UnknownPrefix("q".into()))]
    fn rejected_declarations(#[case] raw: &[(&str, &str)], #[case] expected: NamespaceError) {
        let result = collect_attributes(raw.iter().copied())
            .and_then(|a| element_state("e", a, &NamespaceScope::root()));
        assert_eq!(result.unwrap_err(), expected);
    }

    #[test]
    fn same_expanded_attribute_name_is_rejected() {
        let err = element_state(
            "e",
            attrs(&[("xmlns:a", "urn:x"), ("xmlns:b", "urn:x"), ("a:id", "1"), ("b:id", "2")]),
            &NamespaceScope::root(),
        )
        .unwrap_err();
        assert!(matches!(err, NamespaceError::DuplicateNamespace { .. }));
    }

    #[test]
    fn prefix_lookup_prefers_default() {
        let st = element_state("e", attrs(&[("xmlns", "urn:x"), ("xmlns:z", "urn:x")]), &NamespaceScope::root()).unwrap();
        assert_eq!(st.scope.prefix_for("urn:x"), Some(None));
        assert_eq!(st.scope.prefix_for(XML_NAMESPACE), Some(Some("xml")));
        assert_eq!(st.scope.prefix_for("urn:missing"), None);
    }
}

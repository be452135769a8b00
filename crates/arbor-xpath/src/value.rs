//! XPath 1.0 values and the conversions between them.
use std::fmt;

use arbor_dom::{Node, first_in_document_order, sort_document_order};

use crate::error::XPathError;

/// Duplicate-free sequence of nodes.
///
/// Sets built from a single location step keep the step's axis order;
/// everything else is kept in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet(Vec<Node>);

impl NodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorts `nodes` into document order and drops duplicates.
    pub fn from_nodes(mut nodes: Vec<Node>) -> Self {
        sort_document_order(&mut nodes);
        Self(nodes)
    }

    /// Takes `nodes` as they come. Callers guarantee there are no duplicates.
    pub(crate) fn in_axis_order(nodes: Vec<Node>) -> Self {
        Self(nodes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.0.iter()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.0
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.0
    }

    pub fn first_in_document_order(&self) -> Option<Node> {
        first_in_document_order(&self.0)
    }

    /// Union of both sets, in document order.
    #[must_use]
    pub fn union(self, other: NodeSet) -> NodeSet {
        let mut nodes = self.0;
        nodes.extend(other.0);
        Self::from_nodes(nodes)
    }

    /// String-value of the first node in document order, or "".
    pub fn string_value(&self) -> String {
        self.first_in_document_order().map(|n| n.string_value()).unwrap_or_default()
    }
}

impl IntoIterator for NodeSet {
    type Item = Node;
    type IntoIter = std::vec::IntoIter<Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a NodeSet {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<Node>> for NodeSet {
    fn from(nodes: Vec<Node>) -> Self {
        Self::from_nodes(nodes)
    }
}

/// Result of an XPath 1.0 expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    NodeSet(NodeSet),
    Boolean(bool),
    Number(f64),
    String(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::NodeSet(_) => "node-set",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        }
    }

    pub fn to_boolean(&self) -> bool {
        match self {
            Value::NodeSet(set) => !set.is_empty(),
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::NodeSet(set) => string_to_number(&set.string_value()),
            Value::Boolean(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
        }
    }

    pub fn to_xpath_string(&self) -> String {
        match self {
            Value::NodeSet(set) => set.string_value(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
        }
    }

    pub fn as_node_set(&self) -> Option<&NodeSet> {
        match self {
            Value::NodeSet(set) => Some(set),
            _ => None,
        }
    }

    /// Node-set payload; anything else is a type error naming `what`.
    pub fn into_node_set(self, what: &str) -> Result<NodeSet, XPathError> {
        match self {
            Value::NodeSet(set) => Ok(set),
            other => Err(XPathError::type_error(format!("{what} expects a node-set, got {}", other.type_name()))),
        }
    }

    /// Nodes of a node-set value; empty for the other types.
    pub fn nodes(&self) -> &[Node] {
        self.as_node_set().map(NodeSet::nodes).unwrap_or_default()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xpath_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<NodeSet> for Value {
    fn from(set: NodeSet) -> Self {
        Value::NodeSet(set)
    }
}

impl From<Vec<Node>> for Value {
    fn from(nodes: Vec<Node>) -> Self {
        Value::NodeSet(NodeSet::from_nodes(nodes))
    }
}

impl PartialEq<bool> for Value {
    fn eq(&self, other: &bool) -> bool {
        matches!(self, Value::Boolean(b) if b == other)
    }
}

impl PartialEq<f64> for Value {
    fn eq(&self, other: &f64) -> bool {
        matches!(self, Value::Number(n) if n == other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, Value::String(s) if s == other)
    }
}

/// Attribute and text nodes equal a string value holding their text.
impl PartialEq<Value> for Node {
    fn eq(&self, other: &Value) -> bool {
        matches!(other, Value::String(s) if self == s.as_str())
    }
}

/// XPath `string(number)`: integers print without a fraction, no exponent
/// notation, `-0` prints as `0`.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{n}")
    }
}

/// XPath `number(string)`: optional whitespace, an optional minus sign, a
/// `Number` production, optional whitespace. Anything else is NaN.
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(is_xml_space);
    let body = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let mut digits = 0;
    let mut dots = 0;
    for c in body.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return f64::NAN,
        }
    }
    if digits == 0 || dots > 1 {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

pub(crate) fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::integer(3.0, "3")]
    #[case::negative(-42.0, "-42")]
    #[case::fraction(0.5, "0.5")]
    #[case::negative_zero(-0.0, "0")]
    #[case::large(1e21, "1000000000000000000000")]
    #[case::nan(f64::NAN, "NaN")]
    #[case::infinity(f64::INFINITY, "Infinity")]
    #[case::negative_infinity(f64::NEG_INFINITY, "-Infinity")]
    fn formats_numbers(#[case] n: f64, #[case] expected: &str) {
        assert_eq!(number_to_string(n), expected);
    }

    #[rstest]
    #[case::plain("12", 12.0)]
    #[case::padded("  1.5\n", 1.5)]
    #[case::negative("-3", -3.0)]
    #[case::leading_dot(".5", 0.5)]
    #[case::trailing_dot("5.", 5.0)]
    fn parses_numbers(#[case] s: &str, #[case] expected: f64) {
        assert_eq!(string_to_number(s), expected);
    }

    #[rstest]
    #[case::empty("")]
    #[case::word("abc")]
    #[case::exponent("1e3")]
    #[case::plus("+1")]
    #[case::two_dots("1.2.3")]
    #[case::lone_minus("-")]
    #[case::infinity("Infinity")]
    fn rejects_non_numbers(#[case] s: &str) {
        assert!(string_to_number(s).is_nan());
    }

    #[test]
    fn boolean_conversion() {
        assert!(!Value::Number(f64::NAN).to_boolean());
        assert!(!Value::Number(-0.0).to_boolean());
        assert!(Value::String("false".into()).to_boolean());
        assert!(!Value::String(String::new()).to_boolean());
        assert!(!Value::NodeSet(NodeSet::new()).to_boolean());
        assert_eq!(Value::Boolean(true).to_number(), 1.0);
        assert_eq!(Value::Boolean(false).to_xpath_string(), "false");
    }

    #[test]
    fn attribute_equals_string_value() {
        let el = Node::new_element("a", [("k", "v")]).unwrap();
        let attr = el.attribute_node("k").unwrap();
        assert!(attr == Value::String("v".into()));
        assert!(attr != Value::String("w".into()));
        assert!(el != Value::String(String::new()));
    }
}

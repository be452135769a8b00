//! Axis traversal and node tests.
//!
//! [`axis_nodes`] yields the nodes of one axis from one context node in axis
//! order: document order for forward axes, nearest-first for reverse axes.
use arbor_dom::consts::XMLNS_NAMESPACE;
use arbor_dom::{Node, NodeKind};

use crate::ast::{AxisKind, NodeTest, NodeType};

pub(crate) fn axis_nodes(node: &Node, axis: AxisKind) -> Vec<Node> {
    match axis {
        AxisKind::Child => node.children(),
        AxisKind::Descendant => node.descendants(),
        AxisKind::DescendantOrSelf => with_self(node, node.descendants()),
        AxisKind::Parent => node.parent().into_iter().collect(),
        AxisKind::Ancestor => node.ancestors(),
        AxisKind::AncestorOrSelf => with_self(node, node.ancestors()),
        AxisKind::FollowingSibling => siblings(node).map(|(_, after)| after).unwrap_or_default(),
        AxisKind::PrecedingSibling => siblings(node)
            .map(|(mut before, _)| {
                before.reverse();
                before
            })
            .unwrap_or_default(),
        AxisKind::Following => following(node),
        AxisKind::Preceding => preceding(node),
        AxisKind::Attribute => node
            .attribute_nodes()
            .into_iter()
            .filter(|a| a.namespace_uri().as_deref() != Some(XMLNS_NAMESPACE))
            .collect(),
        AxisKind::Namespace => node.namespace_nodes(),
        AxisKind::SelfAxis => vec![node.clone()],
    }
}

fn with_self(node: &Node, rest: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(rest.len() + 1);
    out.push(node.clone());
    out.extend(rest);
    out
}

/// Siblings before and after `node`, both in document order. `None` for
/// attribute and namespace nodes, which are not children.
fn siblings(node: &Node) -> Option<(Vec<Node>, Vec<Node>)> {
    let parent = node.parent()?;
    let index = parent.index_of(node)?;
    Some((parent.children_range(..index), parent.children_range(index + 1..)))
}

/// Attribute and namespace nodes sort right after their element, so they
/// share its following and preceding nodes, except that the element's
/// descendants follow them.
fn tree_anchor(node: &Node) -> (Node, bool) {
    match node.kind() {
        NodeKind::Attribute | NodeKind::Namespace => match node.parent() {
            Some(owner) => (owner, true),
            None => (node.clone(), false),
        },
        _ => (node.clone(), false),
    }
}

fn following(node: &Node) -> Vec<Node> {
    let (anchor, owned) = tree_anchor(node);
    let mut out = if owned { anchor.descendants() } else { Vec::new() };
    let mut current = Some(anchor);
    while let Some(n) = current {
        if let Some((_, after)) = siblings(&n) {
            for sibling in after {
                out.push(sibling.clone());
                out.extend(sibling.descendants());
            }
        }
        current = n.parent();
    }
    out
}

fn preceding(node: &Node) -> Vec<Node> {
    let (anchor, _) = tree_anchor(node);
    let mut out = Vec::new();
    let mut current = Some(anchor);
    while let Some(n) = current {
        if let Some((before, _)) = siblings(&n) {
            for sibling in before.into_iter().rev() {
                let mut subtree = with_self(&sibling, sibling.descendants());
                subtree.reverse();
                out.extend(subtree);
            }
        }
        current = n.parent();
    }
    out
}

/// Applies a node test. `principal` is the axis' principal node kind;
/// `resolve` maps a prefix of a qualified name test to its namespace for a
/// candidate node.
pub(crate) fn matches_test(
    node: &Node,
    test: &NodeTest,
    principal: NodeKind,
    resolve: &dyn Fn(&str, &Node) -> Option<String>,
) -> bool {
    match test {
        NodeTest::Type { kind, target } => match kind {
            NodeType::Node => true,
            NodeType::Text => node.kind() == NodeKind::Text,
            NodeType::Comment => node.kind() == NodeKind::Comment,
            NodeType::ProcessingInstruction => {
                node.kind() == NodeKind::ProcessingInstruction
                    && target.as_ref().is_none_or(|t| node.name().as_deref() == Some(t.as_str()))
            }
        },
        _ if node.kind() != principal => false,
        NodeTest::Any => true,
        NodeTest::NCName(name) => node.local_name().as_deref() == Some(name.as_str()),
        NodeTest::QName { prefix, local } => {
            let Some(expanded) = node.expanded_name() else { return false };
            expanded.local == *local
                && resolve(prefix, node).is_some_and(|uri| expanded.ns_uri.as_deref() == Some(uri.as_str()))
        }
        NodeTest::PrefixWildcard(prefix) => {
            let Some(expanded) = node.expanded_name() else { return false };
            resolve(prefix, node).is_some_and(|uri| expanded.ns_uri.as_deref() == Some(uri.as_str()))
        }
    }
}

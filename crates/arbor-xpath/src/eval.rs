//! Expression evaluation.
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};

use arbor_dom::{NamespaceError, Node};

use crate::ast::{AxisStep, Expr, Literal, NodeTest, OperatorKind, Predicate};
use crate::axes::{axis_nodes, matches_test};
use crate::error::XPathError;
use crate::functions::{CallContext, FunctionTable};
use crate::value::{NodeSet, Value, string_to_number};

/// Everything an evaluation needs besides the focus.
pub(crate) struct Env<'a> {
    pub(crate) variables: &'a HashMap<String, Value>,
    pub(crate) functions: FunctionTable<'a>,
    pub(crate) namespaces: &'a BTreeMap<String, String>,
    /// Node the whole expression is evaluated against; its scope resolves
    /// prefixes of qualified name tests.
    pub(crate) origin: &'a Node,
}

/// Context node with its position and size, both 1-based.
#[derive(Clone, Copy)]
pub(crate) struct Focus<'n> {
    pub(crate) node: &'n Node,
    pub(crate) position: usize,
    pub(crate) size: usize,
}

impl<'n> Focus<'n> {
    pub(crate) fn single(node: &'n Node) -> Self {
        Self { node, position: 1, size: 1 }
    }
}

impl Env<'_> {
    pub(crate) fn evaluate(&self, expr: &Expr, focus: Focus<'_>) -> Result<Value, XPathError> {
        match expr {
            Expr::Literal(Literal::String(s)) => Ok(Value::String(s.clone())),
            Expr::Literal(Literal::Number(n)) => Ok(Value::Number(*n)),
            Expr::Literal(Literal::Boolean(b)) => Ok(Value::Boolean(*b)),
            Expr::Variable(name) => {
                self.variables.get(name).cloned().ok_or_else(|| XPathError::UnknownVariable(name.clone()))
            }
            Expr::Expression(inner) => self.evaluate(inner, focus),
            Expr::Operator { op, children } => self.operator(*op, children, focus),
            Expr::Function { name, args } => self.call(name, args, focus),
            Expr::Axis(step) => Ok(Value::NodeSet(NodeSet::in_axis_order(self.select(step, focus.node)?))),
            Expr::Step(parts) => self.path(parts, focus),
            Expr::RootStep(parts) => {
                let root = focus.node.root();
                if !root.is_document() {
                    return Err(XPathError::Detached);
                }
                if parts.is_empty() {
                    return Ok(Value::NodeSet(NodeSet::in_axis_order(vec![root])));
                }
                self.path(parts, Focus::single(&root))
            }
            Expr::Filter { primary, predicates } => {
                // Filter predicates count positions along the child axis.
                let set = self.evaluate(primary, focus)?.into_node_set("a predicate")?;
                let nodes = self.apply_predicates(predicates, NodeSet::from_nodes(set.into_nodes()).into_nodes())?;
                Ok(Value::NodeSet(NodeSet::in_axis_order(nodes)))
            }
        }
    }

    /// Evaluates each part against every node the previous part selected.
    /// The result is in document order.
    fn path(&self, parts: &[Expr], focus: Focus<'_>) -> Result<Value, XPathError> {
        let Some((first, rest)) = parts.split_first() else {
            return Err(XPathError::parse_state("empty location path"));
        };
        let mut current = self.evaluate(first, focus)?.into_node_set("a location path")?;
        for part in rest {
            let mut next = Vec::new();
            for node in &current {
                let selected = match part {
                    Expr::Axis(step) => self.select(step, node)?,
                    other => self.evaluate(other, Focus::single(node))?.into_node_set("a location step")?.into_nodes(),
                };
                next.extend(selected);
            }
            current = NodeSet::from_nodes(next);
        }
        if rest.is_empty() {
            current = NodeSet::from_nodes(current.into_nodes());
        }
        Ok(Value::NodeSet(current))
    }

    /// Nodes selected by one step from one context node, in axis order. A
    /// prefix no scope along the way resolves is an error only when no
    /// element of the tree declares it.
    fn select(&self, step: &AxisStep, node: &Node) -> Result<Vec<Node>, XPathError> {
        let principal = step.axis.principal_kind();
        let resolved = self.fixed_prefix(&step.test);
        let unresolved = Cell::new(false);
        let resolve = |prefix: &str, candidate: &Node| {
            let uri = resolved
                .clone()
                .or_else(|| candidate.resolve_prefix(Some(prefix)).ok().flatten());
            if uri.is_none() {
                unresolved.set(true);
            }
            uri
        };
        let candidates = axis_nodes(node, step.axis);
        let had_candidates = candidates.iter().any(|n| n.kind() == principal);
        let nodes: Vec<Node> =
            candidates.into_iter().filter(|n| matches_test(n, &step.test, principal, &resolve)).collect();
        if nodes.is_empty() && had_candidates && unresolved.get() {
            if let Some(prefix) = test_prefix(&step.test).filter(|p| !declared_in_tree(node, p)) {
                return Err(NamespaceError::UnknownPrefix(prefix.to_string()).into());
            }
        }
        self.apply_predicates(&step.predicates, nodes)
    }

    /// Namespace of a name test's prefix from the caller's bindings or the
    /// origin node's scope.
    fn fixed_prefix(&self, test: &NodeTest) -> Option<String> {
        let prefix = test_prefix(test)?;
        self.namespaces
            .get(prefix)
            .cloned()
            .or_else(|| self.origin.resolve_prefix(Some(prefix)).ok().flatten())
    }

    /// Filters `nodes` through each predicate in turn; positions count in the
    /// order `nodes` arrive.
    #[allow(clippy::cast_precision_loss)]
    fn apply_predicates(&self, predicates: &[Predicate], mut nodes: Vec<Node>) -> Result<Vec<Node>, XPathError> {
        for predicate in predicates {
            let size = nodes.len();
            let mut kept = Vec::with_capacity(size);
            for (i, node) in nodes.into_iter().enumerate() {
                let position = i + 1;
                let keep = match self.evaluate(&predicate.expr, Focus { node: &node, position, size })? {
                    Value::Number(n) => n == position as f64,
                    other => other.to_boolean(),
                };
                if keep {
                    kept.push(node);
                }
            }
            nodes = kept;
        }
        Ok(nodes)
    }

    fn call(&self, name: &str, args: &[Expr], focus: Focus<'_>) -> Result<Value, XPathError> {
        let function = self.functions.get(name).ok_or_else(|| XPathError::syntax(format!("unknown function {name}()")))?;
        let values = args.iter().map(|arg| self.evaluate(arg, focus)).collect::<Result<Vec<_>, _>>()?;
        let ctx = CallContext { node: focus.node, position: focus.position, size: focus.size };
        tracing::trace!(function = name, args = values.len(), "call");
        function.call(&ctx, values)
    }

    fn operator(&self, op: OperatorKind, children: &[Expr], focus: Focus<'_>) -> Result<Value, XPathError> {
        let operand = |i: usize| {
            children
                .get(i)
                .ok_or_else(|| XPathError::parse_state(format!("operator '{}' is missing an operand", op.symbol())))
                .and_then(|expr| self.evaluate(expr, focus))
        };
        match op {
            OperatorKind::Negate => Ok(Value::Number(-operand(0)?.to_number())),
            OperatorKind::Or => Ok(Value::Boolean(operand(0)?.to_boolean() || operand(1)?.to_boolean())),
            OperatorKind::And => Ok(Value::Boolean(operand(0)?.to_boolean() && operand(1)?.to_boolean())),
            OperatorKind::Union => {
                let left = operand(0)?.into_node_set("'|'")?;
                let right = operand(1)?.into_node_set("'|'")?;
                Ok(Value::NodeSet(left.union(right)))
            }
            OperatorKind::Equal
            | OperatorKind::NotEqual
            | OperatorKind::Less
            | OperatorKind::LessEqual
            | OperatorKind::Greater
            | OperatorKind::GreaterEqual => Ok(Value::Boolean(compare(op, &operand(0)?, &operand(1)?))),
            OperatorKind::Add
            | OperatorKind::Subtract
            | OperatorKind::Multiply
            | OperatorKind::Divide
            | OperatorKind::Modulo => {
                let (a, b) = (operand(0)?.to_number(), operand(1)?.to_number());
                Ok(Value::Number(match op {
                    OperatorKind::Add => a + b,
                    OperatorKind::Subtract => a - b,
                    OperatorKind::Multiply => a * b,
                    OperatorKind::Divide => a / b,
                    _ => a % b,
                }))
            }
        }
    }
}

/// Whether any element in `node`'s tree binds `prefix`.
fn declared_in_tree(node: &Node, prefix: &str) -> bool {
    let root = node.root();
    std::iter::once(root.clone())
        .chain(root.descendants())
        .filter(Node::is_element)
        .any(|el| el.resolve_prefix(Some(prefix)).ok().flatten().is_some())
}

fn test_prefix(test: &NodeTest) -> Option<&str> {
    match test {
        NodeTest::QName { prefix, .. } | NodeTest::PrefixWildcard(prefix) => Some(prefix),
        _ => None,
    }
}

/// Comparison per XPath 1.0 section 3.4: node-sets compare existentially,
/// booleans compare against the node-set's truth value.
pub(crate) fn compare(op: OperatorKind, left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::NodeSet(a), Value::NodeSet(b)) => {
            let rights: Vec<Value> = b.iter().map(|n| Value::String(n.string_value())).collect();
            a.iter().any(|x| {
                let x = Value::String(x.string_value());
                rights.iter().any(|y| compare_scalars(op, &x, y))
            })
        }
        (Value::NodeSet(set), Value::Boolean(_)) => compare_scalars(op, &Value::Boolean(!set.is_empty()), right),
        (Value::Boolean(_), Value::NodeSet(set)) => compare_scalars(op, left, &Value::Boolean(!set.is_empty())),
        (Value::NodeSet(set), other) => set.iter().any(|n| compare_scalars(op, &node_scalar(n, other), other)),
        (other, Value::NodeSet(set)) => set.iter().any(|n| compare_scalars(op, other, &node_scalar(n, other))),
        _ => compare_scalars(op, left, right),
    }
}

fn node_scalar(node: &Node, other: &Value) -> Value {
    let text = node.string_value();
    match other {
        Value::Number(_) => Value::Number(string_to_number(&text)),
        _ => Value::String(text),
    }
}

fn compare_scalars(op: OperatorKind, left: &Value, right: &Value) -> bool {
    let is = |pred: fn(&Value) -> bool| pred(left) || pred(right);
    match op {
        OperatorKind::Equal | OperatorKind::NotEqual => {
            let equal = if is(|v| matches!(v, Value::Boolean(_))) {
                left.to_boolean() == right.to_boolean()
            } else if is(|v| matches!(v, Value::Number(_))) {
                left.to_number() == right.to_number()
            } else {
                left.to_xpath_string() == right.to_xpath_string()
            };
            equal == (op == OperatorKind::Equal)
        }
        OperatorKind::Less => left.to_number() < right.to_number(),
        OperatorKind::LessEqual => left.to_number() <= right.to_number(),
        OperatorKind::Greater => left.to_number() > right.to_number(),
        OperatorKind::GreaterEqual => left.to_number() >= right.to_number(),
        _ => false,
    }
}

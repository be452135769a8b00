use arbor_dom::Node;

use super::{CallContext, FunctionRegistry, take};
use crate::error::XPathError;
use crate::value::{NodeSet, Value, is_xml_space};

pub(super) fn register(reg: &mut FunctionRegistry) {
    reg.register("last", 0, |ctx, _| Ok(Value::Number(count(ctx.size))));
    reg.register("position", 0, |ctx, _| Ok(Value::Number(count(ctx.position))));
    reg.register("count", 1, fn_count);
    reg.register("id", 1, fn_id);
    reg.register_range("local-name", 0, Some(1), |ctx, args| {
        Ok(Value::String(name_of(ctx, args, "local-name()", Node::local_name)?))
    });
    reg.register_range("namespace-uri", 0, Some(1), |ctx, args| {
        Ok(Value::String(name_of(ctx, args, "namespace-uri()", Node::namespace_uri)?))
    });
    reg.register_range("name", 0, Some(1), |ctx, args| Ok(Value::String(name_of(ctx, args, "name()", Node::name)?)));
}

#[allow(clippy::cast_precision_loss)]
fn count(n: usize) -> f64 {
    n as f64
}

fn fn_count(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, XPathError> {
    let [value] = take(args)?;
    Ok(Value::Number(count(value.into_node_set("count()")?.len())))
}

/// Elements whose id matches any whitespace-separated token of the
/// argument; a node-set contributes the tokens of each node's
/// string-value.
fn fn_id(ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, XPathError> {
    let [value] = take(args)?;
    let texts: Vec<String> = match value {
        Value::NodeSet(set) => set.iter().map(Node::string_value).collect(),
        other => vec![other.to_xpath_string()],
    };
    let root = ctx.node.root();
    let found = texts
        .iter()
        .flat_map(|text| text.split(is_xml_space).filter(|t| !t.is_empty()))
        .filter_map(|token| root.find_by_id(token))
        .collect();
    Ok(Value::NodeSet(NodeSet::from_nodes(found)))
}

/// Applies `get` to the first node of the argument in document order, or
/// to the context node. An empty node-set yields "".
fn name_of(
    ctx: &CallContext<'_>,
    args: Vec<Value>,
    what: &str,
    get: fn(&Node) -> Option<String>,
) -> Result<String, XPathError> {
    let node = match args.into_iter().next() {
        Some(value) => value.into_node_set(what)?.first_in_document_order(),
        None => Some(ctx.node.clone()),
    };
    Ok(node.and_then(|n| get(&n)).unwrap_or_default())
}

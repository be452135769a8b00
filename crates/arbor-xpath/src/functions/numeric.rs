use super::{CallContext, FunctionRegistry, take};
use crate::error::XPathError;
use crate::value::{Value, string_to_number};

pub(super) fn register(reg: &mut FunctionRegistry) {
    reg.register_range("number", 0, Some(1), fn_number);
    reg.register("sum", 1, fn_sum);
    reg.register("floor", 1, |_, args| unary(args, f64::floor));
    reg.register("ceiling", 1, |_, args| unary(args, f64::ceil));
    reg.register("round", 1, |_, args| unary(args, xpath_round));
}

/// Nearest integer, halves rounding towards positive infinity. Values in
/// `[-0.5, 0)` round to negative zero.
pub(crate) fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        n
    } else if (-0.5..0.0).contains(&n) {
        -0.0
    } else {
        // `n + 0.5` can round up before flooring.
        let r = n.floor();
        if n - r >= 0.5 { r + 1.0 } else { r }
    }
}

fn unary(args: Vec<Value>, f: fn(f64) -> f64) -> Result<Value, XPathError> {
    let [value] = take(args)?;
    Ok(Value::Number(f(value.to_number())))
}

fn fn_number(ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, XPathError> {
    Ok(Value::Number(match args.into_iter().next() {
        Some(value) => value.to_number(),
        None => string_to_number(&ctx.node.string_value()),
    }))
}

fn fn_sum(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, XPathError> {
    let [value] = take(args)?;
    let set = value.into_node_set("sum()")?;
    Ok(Value::Number(set.iter().map(|n| string_to_number(&n.string_value())).sum()))
}

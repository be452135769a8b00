use super::{CallContext, FunctionRegistry, take};
use crate::error::XPathError;
use crate::value::Value;

pub(super) fn register(reg: &mut FunctionRegistry) {
    reg.register("boolean", 1, fn_boolean);
    reg.register("not", 1, fn_not);
    reg.register("true", 0, fn_true);
    reg.register("false", 0, fn_false);
    reg.register("lang", 1, fn_lang);
}

fn fn_boolean(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, XPathError> {
    let [value] = take(args)?;
    Ok(Value::Boolean(value.to_boolean()))
}

fn fn_not(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, XPathError> {
    let [value] = take(args)?;
    Ok(Value::Boolean(!value.to_boolean()))
}

fn fn_true(_ctx: &CallContext<'_>, _args: Vec<Value>) -> Result<Value, XPathError> {
    Ok(Value::Boolean(true))
}

fn fn_false(_ctx: &CallContext<'_>, _args: Vec<Value>) -> Result<Value, XPathError> {
    Ok(Value::Boolean(false))
}

/// True when the nearest `xml:lang` in scope equals the argument or is a
/// sublanguage of it, ignoring case.
fn fn_lang(ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, XPathError> {
    let [wanted] = take(args)?;
    let wanted = wanted.to_xpath_string().to_ascii_lowercase();
    let declared = std::iter::once(ctx.node.clone())
        .chain(ctx.node.ancestors())
        .find_map(|n| n.attribute("xml:lang"));
    let matches = declared.is_some_and(|lang| {
        let lang = lang.to_ascii_lowercase();
        lang == wanted || lang.strip_prefix(&wanted).is_some_and(|rest| rest.starts_with('-'))
    });
    Ok(Value::Boolean(matches))
}

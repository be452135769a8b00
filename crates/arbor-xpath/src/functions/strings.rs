use super::{CallContext, FunctionRegistry, string_or_context, take};
use crate::error::XPathError;
use crate::functions::numeric::xpath_round;
use crate::value::{Value, is_xml_space};

pub(super) fn register(reg: &mut FunctionRegistry) {
    reg.register_range("string", 0, Some(1), |ctx, args| Ok(Value::String(string_or_context(ctx, args))));
    reg.register_range("concat", 2, None, fn_concat);
    reg.register("starts-with", 2, |_, args| {
        let [s, prefix] = strings(args)?;
        Ok(Value::Boolean(s.starts_with(&prefix)))
    });
    reg.register("contains", 2, |_, args| {
        let [s, needle] = strings(args)?;
        Ok(Value::Boolean(s.contains(&needle)))
    });
    reg.register("substring-before", 2, |_, args| {
        let [s, sep] = strings(args)?;
        Ok(Value::String(s.split_once(&sep).map(|(before, _)| before.to_string()).unwrap_or_default()))
    });
    reg.register("substring-after", 2, |_, args| {
        let [s, sep] = strings(args)?;
        Ok(Value::String(s.split_once(&sep).map(|(_, after)| after.to_string()).unwrap_or_default()))
    });
    reg.register_range("substring", 2, Some(3), fn_substring);
    reg.register_range("string-length", 0, Some(1), fn_string_length);
    reg.register_range("normalize-space", 0, Some(1), |ctx, args| {
        Ok(Value::String(normalize_space(&string_or_context(ctx, args))))
    });
    reg.register("translate", 3, fn_translate);
}

fn strings<const N: usize>(args: Vec<Value>) -> Result<[String; N], XPathError> {
    Ok(take::<N>(args)?.map(|v| v.to_xpath_string()))
}

fn fn_concat(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, XPathError> {
    Ok(Value::String(args.iter().map(Value::to_xpath_string).collect()))
}

/// Characters at 1-based positions `p` with `round(start) <= p <
/// round(start) + round(length)`. NaN bounds select nothing.
#[allow(clippy::cast_precision_loss)]
fn fn_substring(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, XPathError> {
    let mut args = args.into_iter();
    let s = args.next().map(|v| v.to_xpath_string()).unwrap_or_default();
    let start = xpath_round(args.next().map_or(f64::NAN, |v| v.to_number()));
    let end = args.next().map_or(f64::INFINITY, |len| start + xpath_round(len.to_number()));
    let out = s
        .chars()
        .enumerate()
        .filter(|(i, _)| {
            let p = (i + 1) as f64;
            p >= start && p < end
        })
        .map(|(_, c)| c)
        .collect();
    Ok(Value::String(out))
}

#[allow(clippy::cast_precision_loss)]
fn fn_string_length(ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, XPathError> {
    let s = match args.into_iter().next() {
        None => ctx.node.string_value(),
        Some(Value::String(s)) => s,
        Some(other) => {
            return Err(XPathError::type_error(format!("string-length() expects a string, got {}", other.type_name())));
        }
    };
    Ok(Value::Number(s.chars().count() as f64))
}

fn normalize_space(s: &str) -> String {
    s.split(is_xml_space).filter(|part| !part.is_empty()).collect::<Vec<_>>().join(" ")
}

/// Replaces each character found in `from` by the character at the same
/// index in `to`, or drops it when `to` is shorter.
fn fn_translate(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, XPathError> {
    let [s, from, to] = strings(args)?;
    let from: Vec<char> = from.chars().collect();
    let to: Vec<char> = to.chars().collect();
    let out = s
        .chars()
        .filter_map(|c| match from.iter().position(|f| *f == c) {
            Some(idx) => to.get(idx).copied(),
            None => Some(c),
        })
        .collect();
    Ok(Value::String(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::leading("  12345", "12345")]
    #[case::inner("123  45", "123 45")]
    #[case::newlines("123\n\n45", "123 45")]
    #[case::tabs("\t123\t\t45 ", "123 45")]
    #[case::blank(" \r\n ", "")]
    fn normalizes_space(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_space(input), expected);
    }
}

use arbor_dom::Document;
use arbor_xpath::{Value, XPathContext, XPathError, XPathExt};
use rstest::{fixture, rstest};

#[fixture]
fn doc() -> Document {
    Document::parse_str("<r><a>1</a><b>2</b><a>3</a></r>").unwrap()
}

fn number(doc: &Document, expr: &str) -> f64 {
    match doc.xpath(expr).unwrap() {
        Value::Number(n) => n,
        other => panic!("{expr}: expected a number, got {other:?}"),
    }
}

fn boolean(doc: &Document, expr: &str) -> bool {
    match doc.xpath(expr).unwrap() {
        Value::Boolean(b) => b,
        other => panic!("{expr}: expected a boolean, got {other:?}"),
    }
}

#[rstest]
#[case::multiply("2*4", 8.0)]
#[case::precedence("1 + 2 * 3", 7.0)]
#[case::grouping("(1 + 2) * 3", 9.0)]
#[case::left_to_right("10 - 2 - 3", 5.0)]
#[case::division("5 div 2", 2.5)]
#[case::division_chain("8 div 2 div 2", 2.0)]
#[case::modulo("5 mod 2", 1.0)]
#[case::modulo_negative_divisor("5 mod -2", 1.0)]
#[case::modulo_negative_dividend("-5 mod 2", -1.0)]
#[case::modulo_both_negative("-5 mod -2", -1.0)]
#[case::modulo_fraction("5.5 mod 2", 1.5)]
#[case::negative_literal("-42", -42.0)]
#[case::double_negation("- -1", 1.0)]
#[case::negation_binds_tighter("-2 * 3", -6.0)]
#[case::minus_without_spaces("3-1", 2.0)]
#[case::decimal(".5 + 0.25", 0.75)]
#[case::string_operand("'4' * '2'", 8.0)]
#[case::boolean_operand("true() + true()", 2.0)]
#[case::node_operands("//a + //b", 3.0)]
#[case::infinity_literal("Infinity - 1", f64::INFINITY)]
#[case::division_by_zero("1 div 0", f64::INFINITY)]
#[case::negative_division_by_zero("-1 div 0", f64::NEG_INFINITY)]
fn arithmetic(doc: Document, #[case] expr: &str, #[case] expected: f64) {
    assert_eq!(number(&doc, expr), expected, "{expr}");
}

#[rstest]
#[case::zero_by_zero("0 div 0")]
#[case::literal("NaN")]
#[case::non_numeric_string("'abc' + 1")]
#[case::modulo_by_zero("1 mod 0")]
fn arithmetic_not_a_number(doc: Document, #[case] expr: &str) {
    assert!(number(&doc, expr).is_nan(), "{expr}");
}

#[rstest]
#[case::chained_relational("3 > 2 > 1", false)]
#[case::numbers_equal("1 = 1.0", true)]
#[case::strings_equal("'abc' = \"abc\"", true)]
#[case::string_number("'1' = 1", true)]
#[case::boolean_string("true() = 'x'", true)]
#[case::boolean_empty_string("false() = ''", true)]
#[case::not_equal("1 != 2", true)]
#[case::greater_equal("2 >= 2", true)]
#[case::less_equal("2 <= 1", false)]
#[case::string_relational("'10' > '9'", true)]
#[case::and_binds_tighter("1 = 1 or 1 = 2 and 1 = 2", true)]
#[case::or_short_circuit("1 = 1 or $unbound", true)]
#[case::and_short_circuit("1 = 2 and $unbound", false)]
#[case::and_false("1 < 2 and 2 > 3", false)]
#[case::nan_never_equal("0 div 0 = 0 div 0", false)]
#[case::nan_unequal("0 div 0 != 0 div 0", true)]
#[case::literal_words("true and not(false)", true)]
fn comparisons_and_logic(doc: Document, #[case] expr: &str, #[case] expected: bool) {
    assert_eq!(boolean(&doc, expr), expected, "{expr}");
}

#[rstest]
#[case::any_matches_number("//a = 3", true)]
#[case::none_matches_number("//a = 2", false)]
#[case::any_differs("//a != 1", true)]
#[case::sets_relational("//a > //b", true)]
#[case::sets_equal("//a = //b", false)]
#[case::string_against_set("'2' = //b", true)]
#[case::number_left("4 > //a", true)]
#[case::empty_set_equal("//missing = ''", false)]
#[case::empty_set_unequal("//missing != ''", false)]
#[case::set_against_true("//a = true()", true)]
#[case::empty_set_against_false("//missing = false()", true)]
fn node_set_comparisons(doc: Document, #[case] expr: &str, #[case] expected: bool) {
    assert_eq!(boolean(&doc, expr), expected, "{expr}");
}

#[rstest]
#[case::single_quotes("'single'", "single")]
#[case::double_quotes("\"double\"", "double")]
#[case::other_quote_inside("\"it's\"", "it's")]
#[case::backslash_is_text(r"concat('a\', 'b')", r"a\b")]
#[case::infinity("string(Infinity)", "Infinity")]
#[case::negative_infinity("string(-1 div 0)", "-Infinity")]
#[case::nan("string(0 div 0)", "NaN")]
#[case::integer("string(2.0)", "2")]
#[case::negative_zero("string(-0)", "0")]
#[case::fraction("string(2.50)", "2.5")]
#[case::boolean("string(1 = 1)", "true")]
fn literals_and_string_conversion(doc: Document, #[case] expr: &str, #[case] expected: &str) {
    assert_eq!(doc.xpath(expr).unwrap(), Value::String(expected.to_string()), "{expr}");
}

#[rstest]
fn whitespace_is_insignificant(doc: Document) {
    assert_eq!(number(&doc, "  1   +\n2\t"), 3.0);
    assert_eq!(number(&doc, "count( //a )"), 2.0);
}

#[rstest]
fn union_is_in_document_order(doc: Document) {
    let result = doc.xpath("//b | //a").unwrap();
    let texts: Vec<String> = result.nodes().iter().map(|n| n.string_value()).collect();
    assert_eq!(texts, ["1", "2", "3"]);
    assert_eq!(number(&doc, "count(//a | //a | //b)"), 3.0);
}

#[rstest]
fn union_of_non_node_sets_is_a_type_error(doc: Document) {
    assert!(matches!(doc.xpath("1 | 2"), Err(XPathError::Type(_))));
    assert!(matches!(doc.xpath("//a | 'x'"), Err(XPathError::Type(_))));
}

#[rstest]
fn variables_are_resolved_from_the_context(doc: Document) {
    let bs = doc.xpath("//b").unwrap();
    let ctx = XPathContext::builder()
        .with_variable("x", 3.0)
        .with_variable("name", "a")
        .with_variable("flag", true)
        .with_variable("bs", bs)
        .build();
    assert_eq!(doc.xpath_with("$x * 2", &ctx).unwrap(), 6.0);
    assert_eq!(doc.xpath_with("count(//*[name() = $name])", &ctx).unwrap(), 2.0);
    assert_eq!(doc.xpath_with("$flag and $x > 2", &ctx).unwrap(), true);
    assert_eq!(doc.xpath_with("string($bs)", &ctx).unwrap(), "2");
    assert_eq!(doc.xpath_with("//a[. > $x - 1]", &ctx).unwrap().nodes().len(), 1);
}

#[rstest]
fn unbound_variable_is_reported(doc: Document) {
    assert_eq!(doc.xpath("$missing + 1"), Err(XPathError::UnknownVariable("missing".into())));
}

#[rstest]
fn added_functions_are_callable(doc: Document) {
    let ctx = XPathContext::builder()
        .with_function("twice", 1, Some(1), |_, args| Ok(Value::Number(args[0].to_number() * 2.0)))
        .with_function("join", 1, None, |_, args| {
            Ok(Value::String(args.iter().map(Value::to_xpath_string).collect::<Vec<_>>().join("-")))
        })
        .with_function("here", 0, Some(0), |ctx, _| Ok(Value::String(ctx.node.name().unwrap_or_default())))
        .build();
    assert_eq!(doc.xpath_with("twice(21)", &ctx).unwrap(), 42.0);
    assert_eq!(doc.xpath_with("join('a', 1, true())", &ctx).unwrap(), "a-1-true");
    assert_eq!(doc.xpath_with("string(//*[here() = 'b'])", &ctx).unwrap(), "2");
    assert!(matches!(doc.xpath_with("twice()", &ctx), Err(XPathError::XPathSyntax(_))));
    assert!(matches!(doc.xpath("twice(1)"), Err(XPathError::XPathSyntax(_))));
}

#[rstest]
fn added_functions_override_the_core_library(doc: Document) {
    let ctx = XPathContext::builder().with_function("true", 0, Some(0), |_, _| Ok(Value::Boolean(false))).build();
    assert_eq!(doc.xpath_with("true()", &ctx).unwrap(), false);
    assert_eq!(doc.xpath("true()").unwrap(), true);
}

#[rstest]
fn function_errors_propagate(doc: Document) {
    let ctx = XPathContext::builder()
        .with_function("fail", 0, Some(0), |_, _| Err(XPathError::Type("nope".into())))
        .build();
    assert_eq!(doc.xpath_with("1 + fail()", &ctx), Err(XPathError::Type("nope".into())));
}

#[rstest]
#[case::one_point_zero("1.0")]
#[case::one("1")]
fn supported_versions(doc: Document, #[case] version: &str) {
    let ctx = XPathContext::builder().with_version(version).build();
    assert_eq!(doc.xpath_with("1 + 1", &ctx).unwrap(), 2.0);
}

#[rstest]
#[case::two("2.0")]
#[case::three("3.1")]
#[case::garbage("one")]
fn unsupported_versions(doc: Document, #[case] version: &str) {
    let ctx = XPathContext::builder().with_version(version).build();
    assert_eq!(doc.xpath_with("1", &ctx), Err(XPathError::NotImplemented(version.to_string())));
}

#[rstest]
#[case::dangling_operator("1 +")]
#[case::unknown_function("unknown()")]
#[case::wrong_arity("concat('a')")]
#[case::unknown_axis("up::a")]
#[case::unclosed_group("(1 + 2")]
#[case::empty("")]
fn malformed_expressions(doc: Document, #[case] expr: &str) {
    let err = doc.xpath(expr).unwrap_err();
    assert!(matches!(err, XPathError::XPathSyntax(_)), "{expr}: {err:?}");
}

#[rstest]
fn predicate_without_target_is_a_structure_error(doc: Document) {
    let err = doc.xpath("[1]").unwrap_err();
    assert!(matches!(err, XPathError::Syntax(_)));
    assert!(err.is_syntax());
}

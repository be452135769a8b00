use arbor_dom::Document;
use arbor_xpath::{Value, XPathContext, XPathError, XPathExt};
use rstest::{fixture, rstest};

#[fixture]
fn doc() -> Document {
    Document::parse_str(
        r#"<list><item n="1" tag="x">one</item><item n="2">two<sub>s</sub></item><item n="3" tag="y">three</item><other n="4"/></list>"#,
    )
    .unwrap()
}

/// `n` attributes of elements; everything else by string-value.
fn labels(value: &Value) -> Vec<String> {
    value.nodes().iter().map(|n| n.attribute("n").unwrap_or_else(|| n.string_value())).collect()
}

#[rstest]
#[case::position("/list/item[2]", &["2"])]
#[case::last("/list/item[last()]", &["3"])]
#[case::has_attribute("/list/*[@tag]", &["1", "3"])]
#[case::negated("/list/item[not(@tag)]", &["2"])]
#[case::positions_after_filtering("/list/item[@n > 1][1]", &["2"])]
#[case::position_range("/list/item[position() > 1 and position() < 3]", &["2"])]
#[case::child_exists("/list/item[sub]", &["2"])]
#[case::nested_predicate("/list/item[sub[. = 's']]", &["2"])]
#[case::empty_string_is_false("/list/item['']", &[])]
#[case::string_is_true("/list/item['x']", &["1", "2", "3"])]
#[case::zero_position("/list/item[0]", &[])]
#[case::fractional_position("/list/item[1.5]", &[])]
#[case::boolean_true("/list/item[true()]", &["1", "2", "3"])]
#[case::absolute_inside_predicate("/list/item[@n = /list/other/@n - 2]", &["2"])]
#[case::string_value_comparison("//item[. = 'three']", &["3"])]
#[case::mixed_content("//item[contains(., 'two')]", &["2"])]
#[case::empty_predicate("/list/item[]", &["1", "2", "3"])]
#[case::per_parent_position("//*[@n][position() = 2]", &["2"])]
fn predicates(doc: Document, #[case] expr: &str, #[case] expected: &[&str]) {
    assert_eq!(labels(&doc.xpath(expr).unwrap()), expected, "{expr}");
}

#[rstest]
#[case::reverse_axis_nearest("/list/item[3]/preceding-sibling::item[1]", &["2"])]
#[case::reverse_axis_last("/list/item[3]/preceding-sibling::item[last()]", &["1"])]
#[case::from_last("/list/*[last()]/preceding-sibling::*[1]", &["3"])]
#[case::ancestor_position("//sub/ancestor::*[1]", &["2"])]
#[case::parent_abbreviation("//sub/..", &["2"])]
#[case::parent_then_siblings("//sub/../following-sibling::*", &["3", "4"])]
#[case::following_skips_descendants("/list/item[position() = last() - 1]/following::*", &["3", "4"])]
#[case::text_nodes("/list/item/text()", &["one", "two", "three"])]
#[case::self_node("/list/item[2]/sub/self::node()", &["s"])]
#[case::attribute_step("/list/item[@n = 2]/sub", &["s"])]
fn location_paths(doc: Document, #[case] expr: &str, #[case] expected: &[&str]) {
    assert_eq!(labels(&doc.xpath(expr).unwrap()), expected, "{expr}");
}

#[rstest]
#[case::filtered_group("(/list/item)[2]", &["2"])]
#[case::filtered_attribute("(/list/item)[last()]/@n", &["3"])]
#[case::union("/list/item | /list/other", &["1", "2", "3", "4"])]
#[case::union_in_document_order("(/list/other | /list/item)[1]", &["1"])]
#[case::step_after_filter("(//item)[2]/sub", &["s"])]
#[case::chained_filters("(//item)[@tag][2]", &["3"])]
fn filter_expressions(doc: Document, #[case] expr: &str, #[case] expected: &[&str]) {
    assert_eq!(labels(&doc.xpath(expr).unwrap()), expected, "{expr}");
}

#[rstest]
#[rstest]
fn filter_positions_follow_document_order(doc: Document) {
    let sub = doc.xpath("//sub").unwrap().nodes()[0].clone();
    let names = |expr: &str| -> Vec<String> {
        sub.xpath(expr).unwrap().nodes().iter().filter_map(arbor_dom::Node::name).collect()
    };
    assert_eq!(names("(ancestor::*)[1]"), ["list"]);
    assert_eq!(names("ancestor::*[1]"), ["item"]);
    assert_eq!(names("(ancestor::*)[last()]"), ["item"]);
    assert_eq!(labels(&sub.xpath("(preceding::*)[1]").unwrap()), ["1"]);
    assert_eq!(labels(&sub.xpath("preceding::*[1]").unwrap()), ["1"]);
    assert_eq!(labels(&doc.xpath("(//item[3]/preceding-sibling::item)[1]").unwrap()), ["1"]);
}

#[rstest]
fn relative_paths_from_an_element(doc: Document) {
    let second = doc.xpath("/list/item[2]").unwrap().nodes()[0].clone();
    assert_eq!(labels(&second.xpath("following-sibling::*[1]/@n").unwrap()), ["3"]);
    assert_eq!(labels(&second.xpath("../item[3]").unwrap()), ["3"]);
    assert_eq!(labels(&second.xpath("./sub").unwrap()), ["s"]);
    assert_eq!(labels(&second.xpath(".").unwrap()), ["2"]);
    assert_eq!(second.xpath("count(../*)").unwrap(), 4.0);
}

#[rstest]
fn node_set_variables_take_predicates_and_steps(doc: Document) {
    let items = doc.xpath("//item").unwrap();
    let ctx = XPathContext::builder().with_variable("items", items).build();
    assert_eq!(labels(&doc.xpath_with("$items[2]", &ctx).unwrap()), ["2"]);
    assert_eq!(labels(&doc.xpath_with("$items/sub", &ctx).unwrap()), ["s"]);
    assert_eq!(doc.xpath_with("count($items[@tag])", &ctx).unwrap(), 2.0);
}

#[rstest]
#[case::literal_path("'abc'/x")]
#[case::number_filter("(1)[1]")]
#[case::variable_path("$n/x")]
fn paths_over_non_node_sets_are_type_errors(doc: Document, #[case] expr: &str) {
    let ctx = XPathContext::builder().with_variable("n", 1.0).build();
    let err = doc.xpath_with(expr, &ctx).unwrap_err();
    assert!(matches!(err, XPathError::Type(_)), "{expr}: {err:?}");
}

#[rstest]
fn compiled_expressions_are_reusable(doc: Document) {
    let ctx = XPathContext::new();
    let expr = ctx.compile("count(*)").unwrap();
    let list = doc.root_element().unwrap();
    assert_eq!(ctx.evaluate_compiled(doc.as_node(), &expr).unwrap(), 1.0);
    assert_eq!(ctx.evaluate_compiled(&list, &expr).unwrap(), 4.0);
}

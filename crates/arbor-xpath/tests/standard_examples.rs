//! Location path examples of the XPath 1.0 recommendation, section 2.5
//! (unabbreviated) and section 2.5's abbreviated forms.
use arbor_dom::{Document, Node};
use arbor_xpath::{Value, XPathExt};
use rstest::{fixture, rstest};

#[fixture]
#[once]
fn doc() -> Document {
    Document::parse_str(include_str!("fixtures/chapters.xml")).unwrap()
}

fn context(doc: &Document, id: &str) -> Node {
    if id == "doc" {
        return doc.root_element().unwrap();
    }
    doc.find_by_id(id).unwrap_or_else(|| panic!("no element with id {id}"))
}

/// `id` attributes of selected elements; other nodes contribute their
/// value.
fn ids(value: &Value) -> Vec<String> {
    value.nodes().iter().map(|n| n.attribute("id").or_else(|| n.value()).unwrap_or_default()).collect()
}

const ALL_PARAS: &[&str] = &["p1", "p2", "p3", "p4", "p5", "p6", "p7", "p8", "p9", "p10", "p11", "p12", "p13"];

#[rstest]
#[case::child_para("c1", "child::para", &["p6", "p7"])]
#[case::child_any("c1", "child::*", &["t1", "d1", "p6", "p7"])]
#[case::child_text("c1", "child::text()", &["loose text"])]
#[case::child_node("c1", "child::node()", &["t1", "loose text", "d1", "p6", "p7"])]
#[case::attribute_name("c1", "attribute::id", &["c1"])]
#[case::attribute_any("c1", "attribute::*", &["c1", "information"])]
#[case::descendant("c1", "descendant::para", &["p1", "p2", "p3", "p4", "p5", "p6", "p7"])]
#[case::ancestor("p1", "ancestor::div", &["d2", "d1"])]
#[case::ancestor_or_self("d2", "ancestor-or-self::div", &["d2", "d1"])]
#[case::ancestor_or_self_top("d1", "ancestor-or-self::div", &["d1"])]
#[case::descendant_or_self("p3", "descendant-or-self::para", &["p3", "p4"])]
#[case::self_match("p3", "self::para", &["p3"])]
#[case::self_miss("c1", "self::para", &[])]
#[case::chapter_descendants("doc", "child::chapter/descendant::para", ALL_PARAS)]
#[case::grandchildren("doc", "child::*/child::para", &["p6", "p7", "p8", "p9", "p10", "p11", "p12", "p13"])]
#[case::absolute_descendants("c2", "/descendant::para", ALL_PARAS)]
#[case::absolute_items("c2", "/descendant::olist/child::item", &["i1", "i2"])]
#[case::first("c2", "child::para[position()=1]", &["p8"])]
#[case::last("c2", "child::para[position()=last()]", &["p13"])]
#[case::last_but_one("c2", "child::para[position()=last()-1]", &["p12"])]
#[case::not_first("c2", "child::para[position()>1]", &["p9", "p10", "p11", "p12", "p13"])]
#[case::next_chapter("c0", "following-sibling::chapter[position()=1]", &["c1"])]
#[case::previous_chapter("c2", "preceding-sibling::chapter[position()=1]", &["c1"])]
#[case::sixth_figure("doc", "/descendant::figure[position()=6]", &["f6"])]
#[case::nested_positions("doc", "/child::doc/child::chapter[position()=4]/child::section[position()=2]", &["s2"])]
#[case::warnings("c2", "child::para[attribute::type=\"warning\"]", &["p8", "p9", "p10", "p11", "p13"])]
#[case::fifth_warning("c2", "child::para[attribute::type='warning'][position()=5]", &["p13"])]
#[case::fifth_if_warning("c2", "child::para[position()=5][attribute::type=\"warning\"]", &[])]
#[case::fourth_if_warning("c2", "child::para[position()=4][attribute::type=\"warning\"]", &["p11"])]
#[case::titled("doc", "child::chapter[child::title='Introduction']", &["c1"])]
#[case::with_title("doc", "child::chapter[child::title]", &["c0", "c1", "c2", "c3"])]
#[case::either("doc", "child::*[self::chapter or self::appendix]", &["c0", "c1", "c2", "c3", "a1", "a2"])]
#[case::last_of_either("doc", "child::*[self::chapter or self::appendix][position()=last()]", &["a2"])]
fn unabbreviated(doc: &Document, #[case] at: &str, #[case] expr: &str, #[case] expected: &[&str]) {
    let result = context(doc, at).xpath(expr).unwrap();
    assert_eq!(ids(&result), expected, "{expr}");
}

#[rstest]
#[case::para("c1", "para", &["p6", "p7"])]
#[case::any("doc", "*", &["c0", "c1", "c2", "c3", "a1", "a2"])]
#[case::text("c1", "text()", &["loose text"])]
#[case::attribute("c1", "@id", &["c1"])]
#[case::attributes("c1", "@*", &["c1", "information"])]
#[case::first("c1", "para[1]", &["p6"])]
#[case::last("c1", "para[last()]", &["p7"])]
#[case::grandchild("c1", "*/para", &["p5"])]
#[case::absolute("c3", "/doc/chapter[4]/section[2]", &["s2"])]
#[case::descendant_shorthand("doc", "chapter//para", ALL_PARAS)]
#[case::anywhere("p2", "//para", ALL_PARAS)]
#[case::anywhere_items("p2", "//olist/item", &["i1", "i2"])]
#[case::relative_descendants("c1", ".//para", &["p1", "p2", "p3", "p4", "p5", "p6", "p7"])]
#[case::parent_attribute("t4", "../@xml:lang", &["en"])]
#[case::warnings("c2", "para[@type=\"warning\"]", &["p8", "p9", "p10", "p11", "p13"])]
#[case::fifth_warning("c2", "para[@type=\"warning\"][5]", &["p13"])]
#[case::fifth_if_warning("c2", "para[5][@type=\"warning\"]", &[])]
#[case::titled("doc", "chapter[title=\"Introduction\"]", &["c1"])]
#[case::with_title("doc", "chapter[title]", &["c0", "c1", "c2", "c3"])]
#[case::both_helpers("a1", "employee[@secretary and @assistant]", &["e3"])]
#[case::first_per_parent("doc", "//para[1]", &["p1", "p4", "p5", "p6", "p8"])]
#[case::first_overall("doc", "(//para)[1]", &["p1"])]
fn abbreviated(doc: &Document, #[case] at: &str, #[case] expr: &str, #[case] expected: &[&str]) {
    let result = context(doc, at).xpath(expr).unwrap();
    assert_eq!(ids(&result), expected, "{expr}");
}

#[rstest]
fn self_and_parent(doc: &Document) {
    let root = doc.root_element().unwrap();
    let c1 = context(doc, "c1");
    assert_eq!(root.xpath(".").unwrap().nodes(), &[root.clone()]);
    assert_eq!(c1.xpath("..").unwrap().nodes(), &[root.clone()]);
    assert_eq!(c1.xpath("/").unwrap().nodes(), &[doc.as_node().clone()]);
}

#[rstest]
fn positional_shorthand_matches_position_test(doc: &Document) {
    let root = doc.root_element().unwrap();
    assert_eq!(root.xpath("child::*[2]").unwrap(), root.xpath("child::*[position()=2]").unwrap());
}

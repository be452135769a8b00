//! XML text output.
use quick_xml::escape::partial_escape;

use crate::document::Document;
use crate::node::{Node, NodeData, read};

impl Node {
    /// XML text of this node and its subtree. Content escapes `&`, `<` and
    /// `>`; attribute values additionally escape `"`.
    pub fn produce(&self) -> String {
        let mut out = String::new();
        write_node(self, &mut out);
        out
    }
}

impl Document {
    /// Serialized document, optionally preceded by an XML declaration.
    pub fn produce(&self, xml_decl: bool) -> Vec<u8> {
        let mut out = String::new();
        if xml_decl {
            let decl = self.declaration();
            out.push_str(&format!("<?xml version=\"{}\" encoding=\"UTF-8\"", decl.version));
            if let Some(standalone) = decl.standalone {
                out.push_str(if standalone { " standalone=\"yes\"" } else { " standalone=\"no\"" });
            }
            out.push_str("?>");
        }
        write_node(self.as_node(), &mut out);
        out.into_bytes()
    }
}

fn escape_attribute(value: &str) -> String {
    partial_escape(value).replace('"', "&quot;")
}

fn write_node(node: &Node, out: &mut String) {
    match &node.0.data {
        NodeData::Document(d) => {
            for child in read(&d.children).iter() {
                write_node(child, out);
            }
        }
        NodeData::Element(el) => {
            let name = read(&el.name).qualified();
            out.push('<');
            out.push_str(&name);
            for (key, value) in read(&el.attributes).iter() {
                out.push_str(&format!(" {key}=\"{}\"", escape_attribute(value)));
            }
            let children = read(&el.children).clone();
            if children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in &children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(&name);
            out.push('>');
        }
        NodeData::Attribute(a) => {
            out.push_str(&format!("{}=\"{}\"", a.key, escape_attribute(&read(&a.value))));
        }
        NodeData::Namespace { prefix, uri } => match prefix {
            Some(p) => out.push_str(&format!("xmlns:{p}=\"{}\"", escape_attribute(uri))),
            None => out.push_str(&format!("xmlns=\"{}\"", escape_attribute(uri))),
        },
        NodeData::Text { data, cdata: true } => {
            out.push_str("<![CDATA[");
            out.push_str(&read(data).replace("]]>", "]]]]><![CDATA[>"));
            out.push_str("]]>");
        }
        NodeData::Text { data, cdata: false } => out.push_str(&partial_escape(read(data).as_str())),
        NodeData::Comment(data) => {
            out.push_str("<!--");
            out.push_str(&read(data));
            out.push_str("-->");
        }
        NodeData::ProcessingInstruction { target, data } => {
            let data = read(data);
            out.push_str("<?");
            out.push_str(target);
            if !data.is_empty() {
                out.push(' ');
                out.push_str(&data);
            }
            out.push_str("?>");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::text(Node::new_text("a < b & c > d"), "a &lt; b &amp; c &gt; d")]
    #[case::quote_in_text(Node::new_text("\"q\""), "\"q\"")]
    #[case::cdata(Node::new_cdata("<raw>"), "<![CDATA[<raw>]]>")]
    #[case::cdata_terminator(Node::new_cdata("a]]>b"), "<![CDATA[a]]]]><![CDATA[>b]]>")]
    #[case::comment(Node::new_comment(" c "), "<!-- c -->")]
    #[case::pi(Node::new_processing_instruction("t", "d"), "<?t d?>")]
    #[case::pi_without_data(Node::new_processing_instruction("t", ""), "<?t?>")]
    fn leaf_output(#[case] node: Node, #[case] expected: &str) {
        assert_eq!(node.produce(), expected);
    }

    #[test]
    fn attribute_values_escape_quotes() {
        let el = Node::new_element("a", [("t", "say \"hi\" & <go>")]).unwrap();
        assert_eq!(el.produce(), "<a t=\"say &quot;hi&quot; &amp; &lt;go&gt;\"/>");
        assert_eq!(el.attribute_node("t").unwrap().produce(), "t=\"say &quot;hi&quot; &amp; &lt;go&gt;\"");
    }
}

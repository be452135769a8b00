//! Evaluates an XPath expression against an XML file.
//!
//! ```text
//! cargo run -p arbor-xpath --example query -- book.xml "//chapter[@id='c1']/title" --ns b=urn:books
//! ```
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use arbor_dom::{Document, NodeKind};
use arbor_xpath::{Value, XPathContext, XPathExt};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "query", version, about = "Evaluate an XPath 1.0 expression against an XML document")]
struct Args {
    /// XML document to query
    file: PathBuf,

    /// Expression to evaluate with the document node as context
    expression: String,

    /// Variable binding, `name=value`; the value is bound as a string
    #[arg(long = "var", value_name = "NAME=VALUE")]
    variables: Vec<String>,

    /// Namespace binding for qualified name tests, `prefix=uri`
    #[arg(long = "ns", value_name = "PREFIX=URI")]
    namespaces: Vec<String>,

    /// Print only the string-value of selected nodes
    #[arg(short, long)]
    text: bool,
}

fn split_binding(raw: &str) -> Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name, value)),
        _ => bail!("expected NAME=VALUE, got '{raw}'"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let source = std::fs::read(&args.file).with_context(|| format!("reading {}", args.file.display()))?;
    let doc = Document::parse(&source).with_context(|| format!("parsing {}", args.file.display()))?;

    let mut builder = XPathContext::builder();
    for raw in &args.variables {
        let (name, value) = split_binding(raw)?;
        builder = builder.with_variable(name, value);
    }
    for raw in &args.namespaces {
        let (prefix, uri) = split_binding(raw)?;
        builder = builder.with_namespace(prefix, uri);
    }
    let ctx = builder.build();

    let value = doc.xpath_with(&args.expression, &ctx).context("evaluating expression")?;
    tracing::info!(kind = value.type_name(), "evaluated");
    match value {
        Value::NodeSet(set) => {
            for node in &set {
                match node.kind() {
                    _ if args.text => println!("{}", node.string_value()),
                    NodeKind::Attribute | NodeKind::Namespace => {
                        println!("{}=\"{}\"", node.name().unwrap_or_default(), node.value().unwrap_or_default());
                    }
                    _ => println!("{}", node.produce()),
                }
            }
        }
        other => println!("{other}"),
    }
    Ok(())
}

use std::fmt::Write as _;
use std::hint::black_box;

use arbor_dom::Document;
use arbor_xpath::{XPathContext, compile, tokenize};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

fn sample_queries() -> Vec<&'static str> {
    vec![
        "1 + 2 * 3",
        "string-length('Lorem ipsum dolor sit amet, consectetur adipiscing elit.')",
        "/root/section/item[@type='a'][position() < 5]/@id",
        "count(//item[contains(., 'Two')])",
        "//section[@name='beta']/item[last()]/preceding-sibling::item[1]",
        "sum(//item/@rank) div count(//item)",
    ]
}

fn build_sample_xml(sections: usize, items: usize) -> String {
    let mut xml = String::from("<root xml:lang='en'>");
    for s in 0..sections {
        let _ = write!(xml, "<section name='{}'>", if s % 2 == 0 { "alpha" } else { "beta" });
        for i in 0..items {
            let kind = if i % 3 == 0 { "a" } else { "b" };
            let _ = write!(xml, "<item id='item-{s}-{i}' type='{kind}' rank='{i}'>Item {i} Two</item>");
        }
        xml.push_str("</section>");
    }
    xml.push_str("</root>");
    xml
}

fn benchmark_tokenizer(c: &mut Criterion) {
    let queries = sample_queries();
    c.bench_function("lexer/tokenize", |b| {
        b.iter(|| {
            for q in &queries {
                let tokens = tokenize(black_box(q)).expect("tokenize failure");
                black_box(tokens);
            }
        });
    });
}

fn benchmark_compiler(c: &mut Criterion) {
    let queries = sample_queries();
    c.bench_function("parser/compile", |b| {
        b.iter(|| {
            for q in &queries {
                let expr = compile(black_box(q)).expect("compile failure");
                black_box(expr);
            }
        });
    });
}

fn benchmark_parse_document(c: &mut Criterion) {
    let xml = build_sample_xml(20, 50);
    c.bench_function("dom/parse", |b| {
        b.iter(|| {
            let doc = Document::parse_str(black_box(&xml)).expect("parse failure");
            black_box(doc);
        });
    });
}

fn benchmark_evaluator(c: &mut Criterion) {
    let document = Document::parse_str(&build_sample_xml(20, 50)).expect("parse failure");
    let ctx = XPathContext::new();
    let compiled: Vec<_> =
        sample_queries().into_iter().map(|q| (q, ctx.compile(q).expect("compile failure"))).collect();

    let mut group = c.benchmark_group("evaluator/evaluate");
    for (name, expr) in &compiled {
        group.bench_with_input(BenchmarkId::from_parameter(name), expr, |b, expr| {
            b.iter(|| {
                let result = ctx.evaluate_compiled(black_box(document.as_node()), expr).expect("eval failure");
                black_box(result);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_tokenizer, benchmark_compiler, benchmark_parse_document, benchmark_evaluator);
criterion_main!(benches);

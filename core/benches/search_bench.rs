use criterion::{criterion_group, criterion_main, Criterion};
use docsearch_core::persist::from_js_str;
use docsearch_core::tokenizer::tokenize;
use docsearch_core::{SearchEngine, SearchOptions};
use std::sync::Arc;

const FIXTURE: &str = include_str!("../tests/fixtures/search_index.js");

fn bench_tokenize(c: &mut Criterion) {
    c.bench_function("tokenize_fixture", |b| b.iter(|| tokenize(FIXTURE)));
}

fn bench_search(c: &mut Criterion) {
    let index = Arc::new(from_js_str(FIXTURE).unwrap());
    c.bench_function("build_engine", |b| b.iter(|| SearchEngine::new(index.clone())));
    let engine = SearchEngine::new(index);
    let opts = SearchOptions::default();
    c.bench_function("search_prefix", |b| b.iter(|| engine.search("quokka bur", &opts)));
}

criterion_group!(benches, bench_tokenize, bench_search);
criterion_main!(benches);

//! Benchmarks for text chunking and voice formula parsing.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bookvoice::engine::VoiceFormula;
use bookvoice::text::chunk_text;

fn book_text(sentences: usize) -> String {
    (0..sentences)
        .map(|i| format!("This is sentence number {} of the benchmark corpus.", i))
        .collect::<Vec<_>>()
        .join(" ")
}

fn bench_chunking(c: &mut Criterion) {
    let short = book_text(50);
    let long = book_text(5000);

    c.bench_function("chunk_text/50_sentences", |b| {
        b.iter(|| chunk_text(black_box(&short), None))
    });
    c.bench_function("chunk_text/5000_sentences", |b| {
        b.iter(|| chunk_text(black_box(&long), None))
    });
    c.bench_function("chunk_text/custom_rule", |b| {
        b.iter(|| chunk_text(black_box(&long), Some(".")))
    });
}

fn bench_formula_parsing(c: &mut Criterion) {
    c.bench_function("voice_formula/single", |b| {
        b.iter(|| VoiceFormula::parse(black_box("af_heart")))
    });
    c.bench_function("voice_formula/blend", |b| {
        b.iter(|| {
            VoiceFormula::parse(black_box(
                "af_heart*0.4 + af_bella*0.3 + af_nicole*0.2 + am_michael*0.1",
            ))
        })
    });
}

criterion_group!(benches, bench_chunking, bench_formula_parsing);
criterion_main!(benches);

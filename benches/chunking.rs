use criterion::{Criterion, criterion_group, criterion_main};
use doc_chat::chunking::{ChunkingConfig, chunk_documents, split_text};
use doc_chat::loader::Document;
use std::hint::black_box;
use std::path::PathBuf;

fn sample_text() -> String {
    let paragraph = "Ownership is a set of rules that govern how a Rust program manages memory. \
        Some languages have garbage collection that regularly looks for no-longer-used memory \
        as the program runs! In other languages, the programmer must explicitly allocate and \
        free the memory. Rust uses a third approach: memory is managed through a system of \
        ownership with rules that the compiler checks?\n";
    let mut text = String::new();
    for i in 0..200 {
        text.push_str(paragraph);
        if i % 5 == 4 {
            text.push('\n');
        }
    }
    text
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let text = sample_text();
    let config = ChunkingConfig::default();
    c.bench_function("split_text", |b| {
        b.iter(|| split_text(black_box(&text), black_box(&config)))
    });

    let documents: Vec<Document> = (1..=10)
        .map(|page| Document {
            text: text.clone(),
            source: PathBuf::from("book.pdf"),
            page: Some(page),
        })
        .collect();
    c.bench_function("chunk_documents", |b| {
        b.iter(|| chunk_documents(black_box(&documents), black_box(&config)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

use chrono::Utc;
use criterion::{Criterion, criterion_group, criterion_main};
use docs_rag::cache::Document;
use docs_rag::retrieval::{cosine_similarity, rank_documents};
use std::hint::black_box;
use std::sync::Arc;

const DIMENSIONS: usize = 1536;
const CORPUS_SIZE: usize = 2000;

/// Deterministic pseudo-random vector so runs are comparable
fn vector(seed: usize) -> Vec<f32> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..DIMENSIONS)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 2000) as f32 / 1000.0 - 1.0
        })
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let documents: Vec<Arc<Document>> = (0..CORPUS_SIZE)
        .map(|i| {
            Arc::new(
                Document::new(format!("docs/page-{i:04}.md"), "content", Utc::now())
                    .with_embedding(vector(i)),
            )
        })
        .collect();
    let query = vector(CORPUS_SIZE + 1);

    c.bench_function("cosine_similarity", |b| {
        b.iter(|| cosine_similarity(black_box(&query), black_box(&documents[0].embedding)))
    });
    c.bench_function("rank_documents", |b| {
        b.iter(|| {
            rank_documents(
                black_box(&query),
                documents.iter().map(Arc::clone),
                black_box(3),
            )
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

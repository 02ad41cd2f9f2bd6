use std::time::Instant;

use querysmith_core::api::VectorIndex;

fn env_usize(name: &str, default_value: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
}

/// Brute-force similarity search throughput.
///
/// Ignored by default and never asserts on timing. Run with
/// `cargo test -p querysmith-core --test perf_vector_search -- --ignored --nocapture`,
/// optionally setting `QUERYSMITH_PERF_VECTORS` and `QUERYSMITH_PERF_DIM`.
#[test]
#[ignore]
fn perf_similarity_search() {
    let count = env_usize("QUERYSMITH_PERF_VECTORS", 20_000);
    let dim = env_usize("QUERYSMITH_PERF_DIM", 768);
    let queries = 100usize;

    // Deterministic pseudo-random fill so runs are comparable.
    let mut seed = 0x2545_f491_u32;
    let mut next = move || {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        (seed as f32 / u32::MAX as f32) - 0.5
    };
    let vectors: Vec<Vec<f32>> = (0..count)
        .map(|_| (0..dim).map(|_| next()).collect())
        .collect();
    let samples: Vec<Vec<f32>> = vectors.iter().step_by((count / queries).max(1)).cloned().collect();

    let mut index = VectorIndex::new();
    let start = Instant::now();
    index.add_vectors(vectors, None, None).unwrap();
    let insert = start.elapsed();

    let start = Instant::now();
    for sample in &samples {
        let hits = index.similarity_search(sample, 10).unwrap();
        assert_eq!(hits.len(), 10);
        // Every sample is itself in the index.
        assert!(hits[0].score > 0.999);
    }
    let search = start.elapsed();

    let per_query_ms = search.as_secs_f64() * 1000.0 / samples.len() as f64;
    println!(
        "vectors={count} dim={dim} insert={:.3}s search={:.3}s per_query={per_query_ms:.3}ms",
        insert.as_secs_f64(),
        search.as_secs_f64()
    );
}

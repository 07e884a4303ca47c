//! Benchmarks for the derivation pipeline.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use patent_radar::dataset::Dataset;
use patent_radar::engine::{EngineConfig, Generation};
use patent_radar::metrics;
use patent_radar::scoring::OpportunityScorer;
use patent_radar::similarity::{DEFAULT_EPSILON, SimilarityMatrix};
use patent_radar::source::SyntheticSource;

fn dataset() -> Dataset {
    let (patents, market, investors) = SyntheticSource::new(0, 2010, 2024, 500).initial_tables();
    Dataset::new(patents, market, investors).unwrap()
}

fn bench_aggregate(c: &mut Criterion) {
    let ds = dataset();
    c.bench_function("aggregate_10x500", |bench| {
        bench.iter(|| black_box(metrics::aggregate(&ds, 2024)))
    });
}

fn bench_rank(c: &mut Criterion) {
    let ds = dataset();
    let metrics = metrics::aggregate(&ds, 2024);
    let scorer = OpportunityScorer::default();
    c.bench_function("rank_10", |bench| bench.iter(|| black_box(scorer.rank(&metrics))));
}

fn bench_similarity(c: &mut Criterion) {
    let ds = dataset();
    c.bench_function("similarity_10x500", |bench| {
        bench.iter(|| black_box(SimilarityMatrix::build(&ds, DEFAULT_EPSILON)))
    });
}

fn bench_generation(c: &mut Criterion) {
    let ds = dataset();
    let config = EngineConfig::default();
    c.bench_function("generation_10x500", |bench| {
        bench.iter(|| black_box(Generation::build(ds.clone(), &config, 1)))
    });
}

criterion_group!(benches, bench_aggregate, bench_rank, bench_similarity, bench_generation);
criterion_main!(benches);

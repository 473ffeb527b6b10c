//! Benchmarks for the text metrics and bootstrap resampling.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ocrbench::eval::stats::{bootstrap_ci, BootstrapConfig};
use ocrbench::normalize::normalize_default;
use ocrbench::similarity::{cer, char_precision_recall, wer};

fn transcription(words: usize, noise: bool) -> String {
    (0..words)
        .map(|i| match (i % 5, noise) {
            (0, true) => "pressurc".to_string(),
            (0, false) => "pressure".to_string(),
            (1, _) => "高血压".to_string(),
            (2, _) => format!("{}", 100 + i),
            _ => "blood".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn bench_edit_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("edit_distance");
    for &words in &[20, 100, 400] {
        let gt = transcription(words, false);
        let pred = transcription(words, true);
        group.bench_with_input(BenchmarkId::new("cer", words), &(&pred, &gt), |b, (p, g)| {
            b.iter(|| cer(black_box(p), black_box(g)))
        });
        group.bench_with_input(BenchmarkId::new("wer", words), &(&pred, &gt), |b, (p, g)| {
            b.iter(|| wer(black_box(p), black_box(g)))
        });
        group.bench_with_input(
            BenchmarkId::new("matching_blocks", words),
            &(&pred, &gt),
            |b, (p, g)| b.iter(|| char_precision_recall(black_box(p), black_box(g))),
        );
    }
    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    let text = format!("Recognized text: {}\n(✓) Smoker", transcription(100, true));
    c.bench_function("normalize_default", |b| {
        b.iter(|| normalize_default(black_box(&text)))
    });
}

fn bench_bootstrap(c: &mut Criterion) {
    let mut group = c.benchmark_group("bootstrap");
    group.sample_size(20);
    let scores: Vec<f64> = (0..200).map(|i| (i % 17) as f64 / 17.0).collect();
    for &resamples in &[1_000, 10_000] {
        let config = BootstrapConfig::default()
            .with_resamples(resamples)
            .with_seed(42);
        group.bench_with_input(BenchmarkId::from_parameter(resamples), &config, |b, config| {
            b.iter(|| bootstrap_ci(black_box(&scores), config))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_edit_distance, bench_normalize, bench_bootstrap);
criterion_main!(benches);

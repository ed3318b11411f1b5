//! Criterion benchmarks for the analytics hot paths.
//!
//! 1. Feature extraction
//! 2. Regime classification (mixture fit with restarts)
//! 3. Pattern detection over a full series
//! 4. Full one-ticker analysis

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use regimelab_core::features::FeatureExtractor;
use regimelab_core::kelly::SizingRequest;
use regimelab_core::patterns::PatternDetector;
use regimelab_core::regime::RegimeClassifier;
use regimelab_core::{Analyzer, Bar};

fn make_bars(n: usize) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0 + (i as f64 * 0.013).cos() * 4.0;
            let open = close - 0.3 * (i as f64 * 0.7).sin();
            Bar::new(
                base_date + chrono::Duration::days(i as i64),
                open,
                open.max(close) + 1.5,
                open.min(close) - 1.5,
                close,
                1_000_000 + (i as u64 * 7919 % 500_000),
            )
        })
        .collect()
}

fn bench_features(c: &mut Criterion) {
    let extractor = FeatureExtractor::default();
    let mut group = c.benchmark_group("features");
    for n in [270, 1000] {
        let bars = make_bars(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &bars, |b, bars| {
            b.iter(|| extractor.extract(black_box(bars)))
        });
    }
    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let classifier = RegimeClassifier::default();
    let mut group = c.benchmark_group("classify");
    for n in [270, 1000] {
        let bars = make_bars(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &bars, |b, bars| {
            b.iter(|| classifier.classify(black_box(bars)))
        });
    }
    group.finish();
}

fn bench_patterns(c: &mut Criterion) {
    let detector = PatternDetector::default();
    let bars = make_bars(1000);
    c.bench_function("patterns/detect_1000", |b| {
        b.iter(|| detector.detect(black_box(&bars)))
    });
}

fn bench_analyze(c: &mut Criterion) {
    let analyzer = Analyzer::default();
    let bars = make_bars(270);
    let request = SizingRequest::default();
    c.bench_function("analyze/270", |b| {
        b.iter(|| analyzer.analyze("BENCH", black_box(&bars), &request))
    });
}

criterion_group!(benches, bench_features, bench_classify, bench_patterns, bench_analyze);
criterion_main!(benches);

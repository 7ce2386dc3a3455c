use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use jpatch_benches::available_corpora;
use jpatch_core::{extract_added, Diff};

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff");
    for corpus in available_corpora() {
        let dataset = corpus.load().expect("failed to load dataset");
        group.throughput(Throughput::Bytes(dataset.fixture_bytes() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(corpus.name()), &dataset, |b, dataset| {
            b.iter(|| {
                let patch = dataset.before().diff(dataset.after());
                black_box(patch);
            });
        });
    }
    group.finish();
}

fn bench_patch_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("patch-apply");
    for corpus in available_corpora() {
        let dataset = corpus.load().expect("failed to load dataset");
        group.throughput(Throughput::Elements(dataset.patch().len() as u64));
        group.bench_function(corpus.name(), {
            let dataset = dataset.clone();
            move |b| {
                b.iter(|| {
                    let result =
                        dataset.before().apply_patch(dataset.patch()).expect("patch success");
                    black_box(result);
                });
            }
        });
    }
    group.finish();
}

fn bench_prepare(c: &mut Criterion) {
    let mut group = c.benchmark_group("prepare");
    for corpus in available_corpora() {
        let dataset = corpus.load().expect("failed to load dataset");
        group.throughput(Throughput::Elements(dataset.patch().len() as u64));
        group.bench_function(corpus.name(), {
            let dataset = dataset.clone();
            move |b| {
                b.iter(|| {
                    let record = Diff::prepare(dataset.before(), dataset.patch())
                        .expect("prepare success");
                    black_box(record);
                });
            }
        });
    }
    group.finish();

    let mut revert = c.benchmark_group("revert");
    for corpus in available_corpora() {
        let dataset = corpus.load().expect("failed to load dataset");
        let record = Diff::prepare(dataset.before(), dataset.patch()).expect("prepare success");
        revert.throughput(Throughput::Elements(record.deltas().len() as u64));
        revert.bench_function(corpus.name(), move |b| {
            b.iter(|| {
                let original = record.revert(dataset.after()).expect("revert success");
                black_box(original);
            });
        });
    }
    revert.finish();
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");
    for corpus in available_corpora() {
        let dataset = corpus.load().expect("failed to load dataset");
        group.throughput(Throughput::Bytes(dataset.fixture_bytes() as u64));
        group.bench_function(corpus.name(), move |b| {
            b.iter(|| {
                let split = extract_added(dataset.extended(), dataset.additions())
                    .expect("extract success");
                black_box(split);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_diff, bench_patch_apply, bench_prepare, bench_extract);
criterion_main!(benches);

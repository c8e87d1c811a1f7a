use criterion::black_box;
use criterion::{criterion_group, criterion_main, Criterion};
use pkmodel::*;

fn one_compartment() {
    let model = Model::intravenous(10.0, 2.0).unwrap();
    let protocol = Protocol::bolus(100.0).unwrap();
    black_box(simulate(
        &model,
        &protocol,
        &TimeGrid::uniform(24.0, 241),
        &SolverSettings::default(),
    ))
    .unwrap();
}

fn three_compartment() {
    let model = Model::subcutaneous(10.0, 2.0, 1.2)
        .and_then(|m| m.with_compartment(20.0, 5.0))
        .and_then(|m| m.with_compartment(200.0, 0.1))
        .unwrap();
    let protocol = Protocol::infusion(100.0, 10.0, 6.0, 4.0).unwrap();
    black_box(simulate(
        &model,
        &protocol,
        &TimeGrid::uniform(24.0, 241),
        &SolverSettings::default(),
    ))
    .unwrap();
}

fn batch() {
    let protocol = std::sync::Arc::new(Protocol::bolus(100.0).unwrap());
    let pairs: Vec<_> = (1..=16)
        .map(|i| {
            let model = Model::intravenous(i as f64, 1.0)
                .and_then(|m| m.with_compartment(2.0 * i as f64, 0.5))
                .unwrap();
            (std::sync::Arc::new(model), protocol.clone())
        })
        .collect();
    let mut solution = Solution::new().with_grid(TimeGrid::uniform(24.0, 241));
    black_box(solution.add_all(pairs)).unwrap();
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("one_compartment", |b| b.iter(|| one_compartment()));
    c.bench_function("three_compartment", |b| b.iter(|| three_compartment()));
    c.bench_function("batch", |b| b.iter(|| batch()));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

use aiyagari::{AiyagariModel, HouseholdConfig, ModelOptions};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn capital_supply(c: &mut Criterion) {
    let options = ModelOptions::default()
        .with_household(HouseholdConfig::default().with_grid(1e-10, 20.0, 100));
    let model = AiyagariModel::from_options(&options).expect("valid calibration");

    c.bench_function("capital_supply_200_states", |b| {
        b.iter(|| {
            model
                .capital_supply(black_box(0.02), &options)
                .expect("steady state")
                .capital
        })
    });
}

criterion_group!(benches, capital_supply);
criterion_main!(benches);

use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkId, Criterion,
};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::SeedableRng;

use krige::prelude::*;

fn fitted_gp(n_samples: usize) -> GaussianProcess<SquaredExp> {
    let mut rng = StdRng::seed_from_u64(0xBE);
    let xs: Vec<f64> = (0..20).map(|i| 0.25 * i as f64).collect();
    let x = DMatrix::from_column_slice(xs.len(), 1, &xs);
    let y = DVector::from_iterator(xs.len(), xs.iter().map(|v| v.sin()));

    let mut gp = GaussianProcess::new(SquaredExp, 1);
    let options = SamplerOptions::default()
        .with_warmup(300)
        .with_draws(n_samples);
    gp.fit(x, y, &RandomWalkMetropolis::default(), &options, &mut rng)
        .unwrap();
    gp
}

fn bench_predict(c: &mut Criterion) {
    let mut group = c.benchmark_group("gp_predict");
    let candidates = DMatrix::from_column_slice(10, 1, &[
        0.1, 0.6, 1.1, 1.6, 2.1, 2.6, 3.1, 3.6, 4.1, 4.6,
    ]);

    for n_samples in [10, 100] {
        let gp = fitted_gp(n_samples);
        group.bench_with_input(
            BenchmarkId::from_parameter(n_samples),
            &gp,
            |b, gp| {
                let mut rng = StdRng::seed_from_u64(77);
                b.iter(|| {
                    black_box(
                        gp.predict(black_box(&candidates), 1, &mut rng)
                            .unwrap(),
                    )
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_predict);
criterion_main!(benches);

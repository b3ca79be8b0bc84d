use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::{criterion_group, criterion_main};
use rand::{rngs::StdRng, SeedableRng};

use phylo2vec::sample_with_rng;
use phylo2vec::tree::{to_newick, to_newick_no_parents, to_vector, to_vector_no_parents};

fn conversions(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);

    for n_leaves in [10, 100, 1000, 10000] {
        let v = sample_with_rng(n_leaves, false, &mut rng);
        let newick = to_newick(&v);
        let newick_no_parents = to_newick_no_parents(&v);

        c.bench_with_input(BenchmarkId::new("to_newick", n_leaves), &v, |b, v| {
            b.iter(|| to_newick(v));
        });

        c.bench_with_input(BenchmarkId::new("to_vector", n_leaves), &newick, |b, s| {
            b.iter(|| to_vector(s).unwrap());
        });

        c.bench_with_input(
            BenchmarkId::new("to_vector_no_parents", n_leaves),
            &newick_no_parents,
            |b, s| {
                b.iter(|| to_vector_no_parents(s).unwrap());
            },
        );
    }
}

criterion_group!(benches, conversions);
criterion_main!(benches);

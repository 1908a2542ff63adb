use boosted_trees_rust::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{arr0, Array2};
use rand::prelude::*;

fn random_features(num_samples: usize, num_features: usize, seed: u64) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((num_samples, num_features), |_| rng.gen_range(-1.0..1.0))
}

/// Complete tree of the given depth over random dense dimensions.
fn random_tree(depth: usize, num_features: usize, rng: &mut StdRng) -> DecisionTree {
    let num_splits = (1 << depth) - 1;
    let num_nodes = (1 << (depth + 1)) - 1;
    let nodes = (0..num_nodes)
        .map(|index| {
            if index < num_splits {
                TreeNode::dense_split(
                    0,
                    rng.gen_range(0..num_features),
                    rng.gen_range(-0.5..0.5),
                    2 * index + 1,
                    2 * index + 2,
                )
            } else {
                TreeNode::leaf(vec![rng.gen_range(-0.1..0.1)])
            }
        })
        .collect();
    DecisionTree::new(nodes)
}

fn random_ensemble(num_trees: usize, depth: usize, num_features: usize) -> DecisionTreeEnsemble {
    let mut rng = StdRng::seed_from_u64(7);
    (0..num_trees).fold(DecisionTreeEnsemble::new(), |ensemble, _| {
        let tree = random_tree(depth, num_features, &mut rng);
        ensemble.with_tree(tree, 0.1, TreeMetadata::finalized())
    })
}

fn bench_predict(c: &mut Criterion) {
    let mut group = c.benchmark_group("predict");
    let pool = WorkerPool::new(0).unwrap();
    let resource = DecisionTreeEnsembleResource::new(random_ensemble(200, 6, 20)).unwrap();
    let op = GradientTreesPrediction::new(&LearnerConfig::default(), PredictionOptions::new()).unwrap();

    for num_samples in [100, 10_000] {
        let inputs = FeatureInputs::new().with_dense_float(random_features(num_samples, 20, 42));
        group.bench_with_input(BenchmarkId::new("200_trees", num_samples), &inputs, |b, inputs| {
            b.iter(|| op.compute(&resource, black_box(inputs), None, &pool))
        });
    }

    group.finish();
}

fn bench_predict_dropout(c: &mut Criterion) {
    let mut group = c.benchmark_group("predict_dropout");
    let pool = WorkerPool::new(0).unwrap();
    let resource = DecisionTreeEnsembleResource::new(random_ensemble(200, 6, 20)).unwrap();
    let config = LearnerConfig {
        learning_rate_tuner: Some(LearningRateConfig::Dropout(LearningRateDropoutDrivenConfig {
            dropout_probability: 0.1,
            probability_of_skipping_dropout: 0.0,
            learning_rate: 1.0,
        })),
        ..LearnerConfig::default()
    };
    let op = GradientTreesPrediction::new(&config, PredictionOptions::new().with_dropout(true)).unwrap();
    let inputs = FeatureInputs::new().with_dense_float(random_features(10_000, 20, 42));
    let seed = arr0(1234i64).into_dyn();

    group.bench_function("200_trees_10k", |b| {
        b.iter(|| op.compute(&resource, black_box(&inputs), Some(&seed), &pool))
    });

    group.finish();
}

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition");
    let pool = WorkerPool::new(0).unwrap();
    let mut rng = StdRng::seed_from_u64(11);
    let ensemble = random_ensemble(10, 6, 20)
        .with_tree(random_tree(8, 20, &mut rng), 0.1, TreeMetadata::growing())
        .with_growing_metadata(GrowingMetadata::default());
    let resource = DecisionTreeEnsembleResource::new(ensemble).unwrap();
    let op = GradientTreesPartitionExamples::default();
    let inputs = FeatureInputs::new().with_dense_float(random_features(100_000, 20, 42));

    group.bench_function("depth_8_100k", |b| {
        b.iter(|| op.compute(&resource, black_box(&inputs), &pool))
    });

    group.finish();
}

criterion_group!(benches, bench_predict, bench_predict_dropout, bench_partition);
criterion_main!(benches);

//! Search benchmarks for performance profiling.
//!
//! Run with: `cargo bench -p mcts`
//!
//! Oracles here answer instantly, so these measure the engine's own
//! overhead (tree bookkeeping, selection, async plumbing), not model latency.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mcts::{
    AppendCritiqueExpander, EpisodeController, FixedScoreEvaluator, SearchConfig, SearchContext,
    SearchEngine, SearchTree,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("failed to build tokio runtime")
}

/// Build a complete tree of the given branching factor and depth, with
/// every leaf visited once.
fn build_tree(branching: usize, depth: usize) -> SearchTree<String> {
    let mut tree = SearchTree::new("root".to_string(), branching, 1.414);
    let mut frontier = vec![tree.root()];

    for _ in 0..depth {
        let mut next = Vec::new();
        for parent in frontier {
            for i in 0..branching {
                let content = format!("{}+{i}", tree.content(parent));
                next.push(tree.add_child(parent, content, 1.414));
            }
        }
        frontier = next;
    }

    for (i, leaf) in frontier.into_iter().enumerate() {
        tree.backpropagate(leaf, (i % 10) as f64 + 1.0);
    }
    tree
}

// =============================================================================
// Full Search Benchmarks
// =============================================================================

fn bench_search_simulations(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_simulations");
    let rt = runtime();
    let expander = AppendCritiqueExpander::new(["a", "b", "c"]);
    let evaluator = FixedScoreEvaluator::new(7.0);

    for sims in [10u32, 50, 200, 800] {
        group.throughput(Throughput::Elements(sims as u64));
        group.bench_with_input(BenchmarkId::new("branching_3", sims), &sims, |b, &sims| {
            let config = SearchConfig::default().with_max_children(3);
            b.iter(|| {
                rt.block_on(async {
                    let mut engine = SearchEngine::new(
                        &expander,
                        &evaluator,
                        SearchContext::new("bench"),
                        &config,
                        "X".to_string(),
                    )
                    .expect("valid config");
                    let mut rng = ChaCha20Rng::seed_from_u64(42);
                    engine
                        .run_episode(sims, &mut rng)
                        .await
                        .expect("search failed");
                    black_box(engine.tree().len())
                })
            });
        });
    }

    group.finish();
}

fn bench_episode_controller(c: &mut Criterion) {
    let mut group = c.benchmark_group("episode_controller");
    let rt = runtime();
    let expander = AppendCritiqueExpander::new(["a", "b"]);
    let evaluator = FixedScoreEvaluator::new(5.0);

    for reuse in [true, false] {
        let name = if reuse { "reuse_tree" } else { "fresh_tree" };
        group.bench_function(name, |b| {
            let config = SearchConfig::default()
                .with_simulations(50)
                .with_episodes(4)
                .with_reuse_tree(reuse);
            let controller = EpisodeController::new(
                &expander,
                &evaluator,
                SearchContext::new("bench"),
                config,
            )
            .expect("valid config");

            b.iter(|| {
                rt.block_on(async {
                    let mut rng = ChaCha20Rng::seed_from_u64(7);
                    let result = controller
                        .run("X".to_string(), &mut rng)
                        .await
                        .expect("refinement failed");
                    black_box(result.score)
                })
            });
        });
    }

    group.finish();
}

// =============================================================================
// Tree Operation Benchmarks
// =============================================================================

fn bench_tree_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_ops");

    group.bench_function("add_child_100", |b| {
        b.iter(|| {
            let mut tree = SearchTree::new("root".to_string(), 100, 1.414);
            for i in 0..100 {
                tree.add_child(tree.root(), format!("child {i}"), 1.414);
            }
            black_box(tree.len())
        });
    });

    group.bench_function("select_child_branching_8", |b| {
        let tree = build_tree(8, 2);
        b.iter(|| black_box(tree.select_child(tree.root())));
    });

    group.bench_function("best_leaf_branching_3_depth_6", |b| {
        let tree = build_tree(3, 6);
        b.iter(|| black_box(tree.best_leaf(tree.root())));
    });

    group.bench_function("backpropagate_depth_8", |b| {
        b.iter_batched(
            || {
                let tree = build_tree(2, 8);
                let leaf = tree.best_leaf(tree.root());
                (tree, leaf)
            },
            |(mut tree, leaf)| {
                tree.backpropagate(leaf, 1.0);
                black_box(tree)
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.bench_function("render_mermaid_branching_3_depth_4", |b| {
        let tree = build_tree(3, 4);
        b.iter(|| black_box(mcts::render_mermaid(&tree, Some(tree.root()))));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_search_simulations,
    bench_episode_controller,
    bench_tree_operations,
);
criterion_main!(benches);

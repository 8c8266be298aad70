//! Performance benchmarks for the river solver.
//!
//! Run with: cargo bench
//!
//! These track tree construction, training and evaluation speed on a fixed
//! spot to detect performance regressions early.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use river_solver::cards::{parse_board, parse_hand};
use river_solver::{
    CfrTrainer, CfrVariant, MccfrTrainer, PlayerRange, RiverConfig, RiverGame, Tree,
    VectorEvaluator,
};

/// A narrow-range river spot used by all benchmarks.
fn make_game() -> RiverGame {
    let range = || {
        let hands = [
            "AhAd", "QcQd", "JcJd", "9c9d", "8c8d", "6c6d", "5c5d", "3c3d", "AcKc", "QhJh",
        ];
        PlayerRange {
            hands: hands.iter().map(|h| parse_hand(h).unwrap()).collect(),
            weights: vec![1.0; hands.len()],
        }
    };
    let config = RiverConfig {
        board_cards: parse_board("KsTh7s4d2s").unwrap(),
        stack: 2000,
        ranges: [Some(range()), Some(range())],
        ..RiverConfig::default()
    };
    RiverGame::new(config).unwrap()
}

fn bench_tree_build(c: &mut Criterion) {
    let game = make_game();
    c.bench_function("tree_build", |b| {
        b.iter(|| black_box(Tree::build(&game)));
    });
}

fn bench_cfr_plus_iterations(c: &mut Criterion) {
    let game = make_game();
    let tree = Tree::build(&game);
    let evaluator = VectorEvaluator::new(&game.hands);
    c.bench_function("cfr_plus_10_iters", |b| {
        b.iter(|| {
            let mut trainer = CfrTrainer::new(&game, &tree, &evaluator, CfrVariant::CfrPlus);
            trainer.run(10);
            black_box(trainer.iterations())
        });
    });
}

fn bench_mccfr_iterations(c: &mut Criterion) {
    let game = make_game();
    let tree = Tree::build(&game);
    let evaluator = VectorEvaluator::new(&game.hands);
    c.bench_function("mccfr_1000_iters", |b| {
        b.iter(|| {
            let mut trainer = MccfrTrainer::new(&game, &tree, &evaluator, 7, false);
            trainer.run(1000);
            black_box(trainer.iterations())
        });
    });
}

fn bench_exploitability(c: &mut Criterion) {
    let game = make_game();
    let tree = Tree::build(&game);
    let evaluator = VectorEvaluator::new(&game.hands);
    let mut trainer = CfrTrainer::new(&game, &tree, &evaluator, CfrVariant::CfrPlus);
    trainer.run(100);
    c.bench_function("exploitability", |b| {
        b.iter(|| black_box(trainer.exploitability()));
    });
}

criterion_group!(
    benches,
    bench_tree_build,
    bench_cfr_plus_iterations,
    bench_mccfr_iterations,
    bench_exploitability
);
criterion_main!(benches);

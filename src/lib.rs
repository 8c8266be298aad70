//! A heads-up river subgame solver based on counterfactual regret
//! minimization.
//!
//! This library provides:
//! - [`RiverGame`]: a river spot (board, pot, stacks, weighted ranges)
//! - [`Tree`]: the betting tree over check/bet/call/raise/fold sequences
//! - [`VectorEvaluator`]: O(hands) showdown and fold utility vectors
//! - [`CfrTrainer`]: vanilla CFR, CFR+, Linear CFR and Discounted CFR
//! - [`MccfrTrainer`]: external-sampling Monte Carlo CFR
//! - [`BestResponse`]: best-response values and exploitability
//!
//! # Example
//!
//! ```no_run
//! use river_solver::{CfrTrainer, CfrVariant, RiverConfig, RiverGame, Tree, VectorEvaluator};
//!
//! let config = RiverConfig {
//!     board_cards: river_solver::cards::parse_board("KsTh7s4d2s").unwrap(),
//!     ..RiverConfig::default()
//! };
//! let game = RiverGame::new(config).unwrap();
//! let tree = Tree::build(&game);
//! let evaluator = VectorEvaluator::new(&game.hands);
//! let mut trainer = CfrTrainer::new(&game, &tree, &evaluator, CfrVariant::CfrPlus);
//! trainer.run(1000);
//! println!("exploitability: {:.2} chips", trainer.exploitability());
//! ```

pub mod best_response;
pub mod cards;
pub mod cfr;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod game;
pub mod mccfr;
pub mod strategy;
pub mod strength;
pub mod tree;

pub use best_response::{BestResponse, StrategySource};
pub use cfr::{CfrTrainer, CfrVariant, DiscountParams};
pub use error::{SolverError, SolverResult};
pub use evaluator::VectorEvaluator;
pub use game::{PlayerRange, RiverConfig, RiverGame};
pub use mccfr::MccfrTrainer;
pub use strength::Strength;
pub use tree::{Action, Tree, TreeNode};

//! External-sampling Monte Carlo CFR.
//!
//! Each iteration samples one (player 0 hand, player 1 hand) pair from the
//! joint prior (respecting blockers) and runs two traversals, one per
//! target player. The target player expands every action; the opponent
//! samples a single action from their current strategy. Terminals therefore
//! see a concrete matchup and return a scalar chip delta straight from the
//! precomputed strengths.
//!
//! Optional linear weighting keeps per-(hand, infoset) rows on the linear
//! averaging schedule by lazily rescaling a row the first time it is
//! touched in an iteration, avoiding any growth in the stored magnitudes.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::best_response::{BestResponse, StrategySource};
use crate::evaluator::VectorEvaluator;
use crate::game::RiverGame;
use crate::tree::Tree;

/// Seed substituted when a zero seed is supplied.
pub const DEFAULT_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

const WEIGHT_EPSILON: f64 = 1e-12;

/// Flat-table bookkeeping for one (player, node) infoset block.
#[derive(Debug, Clone, Copy)]
struct NodeInfo {
    action_count: usize,
    /// Start of this node's `hand_count x action_count` block.
    offset: usize,
    /// Start of this node's per-hand bookkeeping block.
    hand_offset: usize,
}

struct SampleFrame {
    strategy: Vec<f64>,
    util: Vec<f64>,
}

/// External-sampling MCCFR trainer over a fixed (game, tree, evaluator).
pub struct MccfrTrainer<'a> {
    game: &'a RiverGame,
    tree: &'a Tree,
    evaluator: &'a VectorEvaluator,
    rng: SmallRng,
    linear_weighting: bool,
    iteration: u64,
    node_info: [Vec<Option<NodeInfo>>; 2],
    regret: [Vec<f64>; 2],
    strategy_sum: [Vec<f64>; 2],
    /// Iteration at which each (infoset, hand) row was last rescaled.
    hand_last_update: [Vec<u64>; 2],
    frames: Vec<SampleFrame>,
    /// Per player-0 hand: compatible player-1 indices and their cumulative
    /// weights.
    p1_indices: Vec<Vec<usize>>,
    p1_prefix: Vec<Vec<f64>>,
    p1_total: Vec<f64>,
    /// Global player-0 cumulative weights, each scaled by the compatible
    /// player-1 mass.
    p0_prefix: Vec<f64>,
    p0_total: f64,
}

impl<'a> MccfrTrainer<'a> {
    pub fn new(
        game: &'a RiverGame,
        tree: &'a Tree,
        evaluator: &'a VectorEvaluator,
        seed: u64,
        linear_weighting: bool,
    ) -> Self {
        let seed = if seed == 0 { DEFAULT_SEED } else { seed };

        let mut node_info: [Vec<Option<NodeInfo>>; 2] = [Vec::new(), Vec::new()];
        let mut regret: [Vec<f64>; 2] = [Vec::new(), Vec::new()];
        let mut strategy_sum: [Vec<f64>; 2] = [Vec::new(), Vec::new()];
        let mut hand_last_update: [Vec<u64>; 2] = [Vec::new(), Vec::new()];

        for player in 0..2 {
            let hand_count = game.hand_count(player);
            let mut total = 0usize;
            let mut hand_total = 0usize;
            node_info[player] = tree
                .nodes
                .iter()
                .map(|node| {
                    if node.player != player as i8 {
                        return None;
                    }
                    let info = NodeInfo {
                        action_count: node.action_count(),
                        offset: total,
                        hand_offset: hand_total,
                    };
                    total += node.action_count() * hand_count;
                    hand_total += hand_count;
                    Some(info)
                })
                .collect();
            regret[player] = vec![0.0; total];
            strategy_sum[player] = vec![0.0; total];
            hand_last_update[player] = vec![0; hand_total];
        }

        let max_actions = tree.max_actions.max(1);
        let frames = (0..tree.max_depth + 2)
            .map(|_| SampleFrame {
                strategy: vec![0.0; max_actions],
                util: vec![0.0; max_actions],
            })
            .collect();

        let mut trainer = MccfrTrainer {
            game,
            tree,
            evaluator,
            rng: SmallRng::seed_from_u64(seed),
            linear_weighting,
            iteration: 0,
            node_info,
            regret,
            strategy_sum,
            hand_last_update,
            frames,
            p1_indices: Vec::new(),
            p1_prefix: Vec::new(),
            p1_total: Vec::new(),
            p0_prefix: Vec::new(),
            p0_total: 0.0,
        };
        trainer.build_sampling_cache();
        trainer
    }

    /// Precompute the two-level inverse-CDF tables: per player-0 hand a
    /// cumulative distribution over compatible player-1 hands, and a global
    /// player-0 distribution weighted by that compatible mass.
    fn build_sampling_cache(&mut self) {
        let p0_hands = &self.game.hands[0];
        let p1_hands = &self.game.hands[1];
        let p0_weights = &self.game.hand_weights[0];
        let p1_weights = &self.game.hand_weights[1];

        self.p1_indices = Vec::with_capacity(p0_hands.len());
        self.p1_prefix = Vec::with_capacity(p0_hands.len());
        self.p1_total = Vec::with_capacity(p0_hands.len());

        let mut p0_adjusted = Vec::with_capacity(p0_hands.len());
        for (i, p0_hand) in p0_hands.iter().enumerate() {
            let mut indices = Vec::new();
            let mut prefix = Vec::new();
            let mut total = 0.0;
            for (j, p1_hand) in p1_hands.iter().enumerate() {
                if p1_hand.cards[0] == p0_hand.cards[0]
                    || p1_hand.cards[0] == p0_hand.cards[1]
                    || p1_hand.cards[1] == p0_hand.cards[0]
                    || p1_hand.cards[1] == p0_hand.cards[1]
                {
                    continue;
                }
                let w = p1_weights[j];
                if w <= 0.0 {
                    continue;
                }
                total += w;
                indices.push(j);
                prefix.push(total);
            }
            self.p1_indices.push(indices);
            self.p1_prefix.push(prefix);
            self.p1_total.push(total);
            p0_adjusted.push(p0_weights[i] * total);
        }

        let mut running = 0.0;
        self.p0_prefix = p0_adjusted
            .iter()
            .map(|&w| {
                running += w;
                running
            })
            .collect();
        self.p0_total = running;
    }

    fn sample_prefix(rng: &mut SmallRng, prefix: &[f64], total: f64) -> usize {
        if total <= WEIGHT_EPSILON || prefix.is_empty() {
            return 0;
        }
        let r = rng.gen::<f64>() * total;
        let idx = prefix.partition_point(|&p| p < r);
        idx.min(prefix.len() - 1)
    }

    /// Sample a blocker-compatible hand pair from the joint prior.
    fn sample_hands(&mut self) -> (usize, usize) {
        let p0_index = Self::sample_prefix(&mut self.rng, &self.p0_prefix, self.p0_total);
        let p1_total = self.p1_total[p0_index];
        let p1_choice = Self::sample_prefix(&mut self.rng, &self.p1_prefix[p0_index], p1_total);
        let p1_index = if self.p1_indices[p0_index].is_empty() {
            0
        } else {
            self.p1_indices[p0_index][p1_choice]
        };
        (p0_index, p1_index)
    }

    /// Run `iterations` sampled iterations (two traversals each).
    pub fn run(&mut self, iterations: u64) {
        for _ in 0..iterations {
            self.iteration += 1;
            let (p0_index, p1_index) = self.sample_hands();
            for target in 0..2 {
                let mut frames = std::mem::take(&mut self.frames);
                self.traverse(self.tree.root, target, p0_index, p1_index, 1.0, &mut frames);
                self.frames = frames;
            }
        }
    }

    /// Iterations completed so far.
    pub fn iterations(&self) -> u64 {
        self.iteration
    }

    /// Whether a (player, node) pair holds a trained infoset.
    pub fn has_infoset(&self, player: usize, node_id: usize) -> bool {
        self.node_info[player]
            .get(node_id)
            .map(|info| info.is_some())
            .unwrap_or(false)
    }

    /// The average strategy for `player` at a node, row-major
    /// `hand x action`. Empty when the node is not the player's.
    pub fn average_strategy(&self, player: usize, node_id: usize) -> Vec<f64> {
        let Some(info) = self.node_info[player][node_id] else {
            return Vec::new();
        };
        let hand_count = self.game.hand_count(player);
        let mut out = vec![0.0; hand_count * info.action_count];
        self.average_strategy_block(player, info, &mut out);
        out
    }

    /// Exploitability of the current average strategy, in chips.
    pub fn exploitability(&self) -> f64 {
        BestResponse::new(self.game, self.tree, self.evaluator).exploitability(self)
    }

    fn average_strategy_block(&self, player: usize, info: NodeInfo, out: &mut [f64]) {
        let hand_count = self.game.hand_count(player);
        let actions = info.action_count;
        for h in 0..hand_count {
            let offset = info.offset + h * actions;
            let mut norm = 0.0;
            for a in 0..actions {
                norm += self.strategy_sum[player][offset + a];
            }
            let row = &mut out[h * actions..(h + 1) * actions];
            if norm > 0.0 {
                for a in 0..actions {
                    row[a] = self.strategy_sum[player][offset + a] / norm;
                }
            } else {
                row.fill(1.0 / actions as f64);
            }
        }
    }

    /// Regret-matching for one hand row.
    fn strategy_for_hand(&self, player: usize, info: NodeInfo, hand_index: usize, out: &mut [f64]) {
        let actions = info.action_count;
        let offset = info.offset + hand_index * actions;
        let mut normalizing = 0.0;
        for a in 0..actions {
            let r = self.regret[player][offset + a];
            if r > 0.0 {
                normalizing += r;
            }
        }
        if normalizing > 0.0 {
            for a in 0..actions {
                let r = self.regret[player][offset + a];
                out[a] = if r > 0.0 { r / normalizing } else { 0.0 };
            }
        } else {
            out.fill(1.0 / actions as f64);
        }
    }

    /// Rescale a row from its last-touched iteration `k` to the current
    /// iteration `t` by `k(k+1) / t(t+1)`, which realises linear weighting
    /// without ever multiplying the accumulators up.
    fn apply_linear_decay(&mut self, player: usize, info: NodeInfo, hand_index: usize) {
        if !self.linear_weighting {
            return;
        }
        let slot = info.hand_offset + hand_index;
        let last = self.hand_last_update[player][slot];
        if last == self.iteration {
            return;
        }
        if last > 0 {
            let last_scale = last as f64 * (last + 1) as f64;
            let current_scale = self.iteration as f64 * (self.iteration + 1) as f64;
            let factor = last_scale / current_scale;
            let offset = info.offset + hand_index * info.action_count;
            for a in 0..info.action_count {
                self.regret[player][offset + a] *= factor;
                self.strategy_sum[player][offset + a] *= factor;
            }
        }
        self.hand_last_update[player][slot] = self.iteration;
    }

    fn traverse(
        &mut self,
        node_id: usize,
        target: usize,
        p0_index: usize,
        p1_index: usize,
        reach: f64,
        frames: &mut [SampleFrame],
    ) -> f64 {
        let game = self.game;
        let tree = self.tree;
        let node = &tree.nodes[node_id];

        if node.player < 0 {
            let pot = game.base_pot + node.contrib0 + node.contrib1;
            let contrib = node.contrib(target);
            if node.terminal_winner >= 0 {
                return if node.terminal_winner as usize == target {
                    (pot - contrib) as f64
                } else {
                    -contrib as f64
                };
            }
            let p0_strength = game.hands[0][p0_index].strength;
            let p1_strength = game.hands[1][p1_index].strength;
            if p0_strength == p1_strength {
                return pot as f64 / 2.0 - contrib as f64;
            }
            let p0_wins = p0_strength > p1_strength;
            return if (target == 0) == p0_wins {
                (pot - contrib) as f64
            } else {
                -contrib as f64
            };
        }

        let player = node.player as usize;
        let hand_index = if player == 0 { p0_index } else { p1_index };
        let info = self.node_info[player][node_id].expect("player node without infoset");
        let action_count = info.action_count;
        let (frame, rest) = frames.split_first_mut().expect("sample depth exceeded");

        self.strategy_for_hand(player, info, hand_index, &mut frame.strategy[..action_count]);

        if player == target {
            self.apply_linear_decay(player, info, hand_index);
            let update_weight = if self.linear_weighting {
                2.0 / (self.iteration as f64 + 1.0)
            } else {
                1.0
            };

            let mut node_util = 0.0;
            for a in 0..action_count {
                let util = self.traverse(
                    node.next[a],
                    target,
                    p0_index,
                    p1_index,
                    reach * frame.strategy[a],
                    rest,
                );
                frame.util[a] = util;
                node_util += frame.strategy[a] * util;
            }

            let offset = info.offset + hand_index * action_count;
            for a in 0..action_count {
                let delta = frame.util[a] - node_util;
                self.regret[player][offset + a] += update_weight * delta;
                self.strategy_sum[player][offset + a] +=
                    update_weight * reach * frame.strategy[a];
            }
            node_util
        } else {
            // External sampling: follow a single opponent action.
            let r = self.rng.gen::<f64>();
            let mut cumulative = 0.0;
            let mut chosen = action_count - 1;
            for a in 0..action_count {
                cumulative += frame.strategy[a];
                if r <= cumulative {
                    chosen = a;
                    break;
                }
            }
            self.traverse(node.next[chosen], target, p0_index, p1_index, reach, rest)
        }
    }
}

impl StrategySource for MccfrTrainer<'_> {
    fn average_strategy_into(&self, player: usize, node_id: usize, out: &mut [f64]) {
        if let Some(info) = self.node_info[player][node_id] {
            self.average_strategy_block(player, info, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{parse_board, parse_hand};
    use crate::game::{PlayerRange, RiverConfig, RiverGame};

    fn small_range() -> PlayerRange {
        let hands = [
            "AhAd", "QcQd", "JcJd", "9c9d", "8c8d", "6c6d", "5c5d", "3c3d", "AcKc", "QhJh",
        ];
        PlayerRange {
            hands: hands.iter().map(|h| parse_hand(h).unwrap()).collect(),
            weights: vec![1.0; hands.len()],
        }
    }

    fn small_game() -> RiverGame {
        let config = RiverConfig {
            board_cards: parse_board("KsTh7s4d2s").unwrap(),
            stack: 2000,
            ranges: [Some(small_range()), Some(small_range())],
            ..RiverConfig::default()
        };
        RiverGame::new(config).unwrap()
    }

    #[test]
    fn test_sampling_respects_blockers() {
        let config = RiverConfig {
            board_cards: parse_board("KsTh7s4d2s").unwrap(),
            stack: 2000,
            ranges: [
                Some(PlayerRange {
                    hands: vec![parse_hand("AhAd").unwrap(), parse_hand("QcQd").unwrap()],
                    weights: vec![1.0, 1.0],
                }),
                Some(PlayerRange {
                    hands: vec![parse_hand("AhKc").unwrap(), parse_hand("JcJd").unwrap()],
                    weights: vec![1.0, 1.0],
                }),
            ],
            ..RiverConfig::default()
        };
        let game = RiverGame::new(config).unwrap();
        let tree = Tree::build(&game);
        let evaluator = VectorEvaluator::new(&game.hands);
        let mut trainer = MccfrTrainer::new(&game, &tree, &evaluator, 1, false);

        for _ in 0..200 {
            let (i, j) = trainer.sample_hands();
            let p0 = game.hands[0][i].cards;
            let p1 = game.hands[1][j].cards;
            assert!(
                p0[0] != p1[0] && p0[0] != p1[1] && p0[1] != p1[0] && p0[1] != p1[1],
                "sampled a blocked pair"
            );
        }
    }

    #[test]
    fn test_seeded_runs_are_deterministic() {
        let game = small_game();
        let tree = Tree::build(&game);
        let evaluator = VectorEvaluator::new(&game.hands);

        let mut a = MccfrTrainer::new(&game, &tree, &evaluator, 42, false);
        let mut b = MccfrTrainer::new(&game, &tree, &evaluator, 42, false);
        a.run(500);
        b.run(500);
        assert_eq!(a.regret[0], b.regret[0]);
        assert_eq!(a.strategy_sum[1], b.strategy_sum[1]);
        assert_eq!(a.exploitability(), b.exploitability());

        let mut c = MccfrTrainer::new(&game, &tree, &evaluator, 43, false);
        c.run(500);
        assert_ne!(a.regret[0], c.regret[0]);
    }

    #[test]
    fn test_zero_seed_uses_default() {
        let game = small_game();
        let tree = Tree::build(&game);
        let evaluator = VectorEvaluator::new(&game.hands);
        let mut zero = MccfrTrainer::new(&game, &tree, &evaluator, 0, false);
        let mut default = MccfrTrainer::new(&game, &tree, &evaluator, DEFAULT_SEED, false);
        zero.run(100);
        default.run(100);
        assert_eq!(zero.regret[0], default.regret[0]);
    }

    #[test]
    fn test_average_strategy_rows_normalised() {
        let game = small_game();
        let tree = Tree::build(&game);
        let evaluator = VectorEvaluator::new(&game.hands);
        let mut trainer = MccfrTrainer::new(&game, &tree, &evaluator, 7, true);
        trainer.run(2000);

        for (node_id, node) in tree.nodes.iter().enumerate() {
            if node.player < 0 {
                continue;
            }
            let player = node.player as usize;
            let avg = trainer.average_strategy(player, node_id);
            for row in avg.chunks(node.action_count()) {
                let sum: f64 = row.iter().sum();
                assert!((sum - 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_lazy_decay_bookkeeping() {
        let game = small_game();
        let tree = Tree::build(&game);
        let evaluator = VectorEvaluator::new(&game.hands);
        let mut trainer = MccfrTrainer::new(&game, &tree, &evaluator, 7, true);
        trainer.run(50);

        // Every touched row carries the iteration it was last rescaled at,
        // never a future one.
        for player in 0..2 {
            for &last in &trainer.hand_last_update[player] {
                assert!(last <= trainer.iterations());
            }
        }
        // The root belongs to player 0 and is visited every iteration, so
        // the sampled hand rows there must have been touched.
        assert!(trainer.hand_last_update[0]
            .iter()
            .any(|&last| last == trainer.iterations()));
    }

    #[test]
    fn test_converges_on_small_tree() {
        let game = small_game();
        let tree = Tree::build(&game);
        let evaluator = VectorEvaluator::new(&game.hands);
        let mut trainer = MccfrTrainer::new(&game, &tree, &evaluator, 7, false);
        trainer.run(16384);
        let exploitability = trainer.exploitability();
        let fraction = exploitability / game.base_pot as f64;
        // Sampling noise keeps this looser than the deterministic bound.
        assert!(
            fraction < 0.1,
            "MCCFR exploitability {:.4} chips ({:.3}% of pot)",
            exploitability,
            fraction * 100.0
        );
    }

    #[test]
    fn test_linear_weighting_converges() {
        let game = small_game();
        let tree = Tree::build(&game);
        let evaluator = VectorEvaluator::new(&game.hands);
        let mut trainer = MccfrTrainer::new(&game, &tree, &evaluator, 7, true);
        trainer.run(16384);
        let exploitability = trainer.exploitability();
        assert!(exploitability.is_finite() && exploitability >= 0.0);
        assert!(exploitability / (game.base_pot as f64) < 0.1);
    }
}

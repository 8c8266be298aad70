//! Best-response oracle shared by both trainers.
//!
//! Walks the tree against a profile's average strategy: at the target
//! player's nodes the per-hand child utilities are combined by elementwise
//! max (a pure per-hand best response), at opponent nodes the reach vector
//! is scaled by the average strategy and the children summed.

use crate::evaluator::VectorEvaluator;
use crate::game::RiverGame;
use crate::tree::Tree;

/// Read access to a trained profile's average strategy.
pub trait StrategySource {
    /// Write the average strategy at `node_id` for the acting `player` into
    /// `out`, row-major `hand x action`. Zero-mass rows are uniform.
    fn average_strategy_into(&self, player: usize, node_id: usize, out: &mut [f64]);
}

struct WalkFrame {
    values: Vec<f64>,
    strategy: Vec<f64>,
    next_reach: Vec<f64>,
    action_values: Vec<f64>,
    prefix: Vec<f64>,
}

/// Best-response values and exploitability for a strategy profile.
pub struct BestResponse<'a> {
    game: &'a RiverGame,
    tree: &'a Tree,
    evaluator: &'a VectorEvaluator,
}

impl<'a> BestResponse<'a> {
    pub fn new(game: &'a RiverGame, tree: &'a Tree, evaluator: &'a VectorEvaluator) -> Self {
        BestResponse {
            game,
            tree,
            evaluator,
        }
    }

    /// Best expected chip value the target player can obtain against the
    /// opponent's average strategy, taken over the target's own prior.
    pub fn best_response_value<S: StrategySource>(&self, source: &S, target: usize) -> f64 {
        let target_hands = self.game.hand_count(target);
        let opp = 1 - target;
        let reach_opp = &self.game.hand_weights[opp];

        let mut frames = self.frames();
        self.walk(source, self.tree.root, target, reach_opp, &mut frames);
        let values = &frames[0].values;

        let mut valid = vec![0.0; target_hands];
        self.evaluator.valid_opp_weights(target, reach_opp, &mut valid);

        let weights = &self.game.hand_weights[target];
        let mut total = 0.0;
        let mut total_weight = 0.0;
        for h in 0..target_hands {
            let joint = weights[h] * valid[h];
            if valid[h] > 0.0 {
                // Per-hand expected value given the opponent actually holds
                // an unblocked hand.
                total += joint * (values[h] / valid[h]);
            }
            total_weight += joint;
        }
        if total_weight <= 0.0 {
            return 0.0;
        }
        total / total_weight
    }

    /// Exploitability of the profile, in chips. Zero at a Nash equilibrium.
    pub fn exploitability<S: StrategySource>(&self, source: &S) -> f64 {
        let br0 = self.best_response_value(source, 0);
        let br1 = self.best_response_value(source, 1);
        (br0 + br1 - self.game.base_pot as f64) / 2.0
    }

    fn frames(&self) -> Vec<WalkFrame> {
        let max_hands = self.game.hand_count(0).max(self.game.hand_count(1));
        let max_actions = self.tree.max_actions.max(1);
        (0..self.tree.max_depth + 2)
            .map(|_| WalkFrame {
                values: vec![0.0; max_hands],
                strategy: vec![0.0; max_hands * max_actions],
                next_reach: vec![0.0; max_hands],
                action_values: vec![0.0; max_hands * max_actions],
                prefix: Vec::with_capacity(max_hands + 1),
            })
            .collect()
    }

    fn walk<S: StrategySource>(
        &self,
        source: &S,
        node_id: usize,
        target: usize,
        reach_opp: &[f64],
        frames: &mut [WalkFrame],
    ) {
        let node = &self.tree.nodes[node_id];
        let target_hands = self.game.hand_count(target);
        let (frame, rest) = frames.split_first_mut().expect("walk depth exceeded");

        if node.player < 0 {
            let pot = (self.game.base_pot + node.contrib0 + node.contrib1) as f64;
            let contrib = node.contrib(target) as f64;
            if node.terminal_winner >= 0 {
                let value = if node.terminal_winner as usize == target {
                    pot - contrib
                } else {
                    -contrib
                };
                self.evaluator.fold_values(
                    target,
                    reach_opp,
                    value,
                    &mut frame.values[..target_hands],
                );
            } else {
                self.evaluator.showdown_values(
                    target,
                    reach_opp,
                    pot,
                    contrib,
                    &mut frame.values[..target_hands],
                    &mut frame.prefix,
                );
            }
            return;
        }

        let player = node.player as usize;
        let action_count = node.action_count();

        if player != target {
            let opp_hands = self.game.hand_count(player);
            source.average_strategy_into(
                player,
                node_id,
                &mut frame.strategy[..opp_hands * action_count],
            );
            frame.values[..target_hands].fill(0.0);
            for a in 0..action_count {
                for h in 0..opp_hands {
                    frame.next_reach[h] = reach_opp[h] * frame.strategy[h * action_count + a];
                }
                self.walk(
                    source,
                    node.next[a],
                    target,
                    &frame.next_reach[..opp_hands],
                    rest,
                );
                let child_values = &rest[0].values;
                for h in 0..target_hands {
                    frame.values[h] += child_values[h];
                }
            }
            return;
        }

        for a in 0..action_count {
            self.walk(source, node.next[a], target, reach_opp, rest);
            frame.action_values[a * target_hands..(a + 1) * target_hands]
                .copy_from_slice(&rest[0].values[..target_hands]);
        }

        for h in 0..target_hands {
            let mut best = frame.action_values[h];
            for a in 1..action_count {
                let value = frame.action_values[a * target_hands + h];
                if value > best {
                    best = value;
                }
            }
            frame.values[h] = best;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{parse_board, parse_hand};
    use crate::game::{PlayerRange, RiverConfig, RiverGame};

    /// A profile that plays uniformly at every node.
    struct PerNodeUniform<'a> {
        tree: &'a crate::tree::Tree,
    }

    impl StrategySource for PerNodeUniform<'_> {
        fn average_strategy_into(&self, _player: usize, node_id: usize, out: &mut [f64]) {
            let actions = self.tree.nodes[node_id].action_count();
            out.fill(1.0 / actions as f64);
        }
    }

    fn range(hands: &[&str], weights: Vec<f64>) -> PlayerRange {
        PlayerRange {
            hands: hands.iter().map(|h| parse_hand(h).unwrap()).collect(),
            weights,
        }
    }

    #[test]
    fn test_exploitability_non_negative_for_uniform() {
        let config = RiverConfig {
            board_cards: parse_board("KsTh7s4d2s").unwrap(),
            stack: 2000,
            ranges: [
                Some(range(&["AhAd", "QcQd", "8c8d"], vec![1.0, 1.0, 1.0])),
                Some(range(&["JcJd", "9c9d", "6c6d"], vec![1.0, 1.0, 1.0])),
            ],
            ..RiverConfig::default()
        };
        let game = RiverGame::new(config).unwrap();
        let tree = crate::tree::Tree::build(&game);
        let evaluator = VectorEvaluator::new(&game.hands);
        let oracle = BestResponse::new(&game, &tree, &evaluator);

        let exploitability = oracle.exploitability(&PerNodeUniform { tree: &tree });
        assert!(exploitability.is_finite());
        assert!(exploitability >= 0.0);
    }

    #[test]
    fn test_fully_blocked_hand_contributes_nothing() {
        // P0 holds only AsAh; P1's single hand shares the As, so every P0
        // matchup is blocked and the best-response value collapses to zero.
        let config = RiverConfig {
            board_cards: parse_board("KsTh7s4d2s").unwrap(),
            stack: 2000,
            ranges: [
                Some(range(&["AsAh"], vec![1.0])),
                Some(range(&["AsAd"], vec![1.0])),
            ],
            ..RiverConfig::default()
        };
        let game = RiverGame::new(config).unwrap();
        let tree = crate::tree::Tree::build(&game);
        let evaluator = VectorEvaluator::new(&game.hands);
        let oracle = BestResponse::new(&game, &tree, &evaluator);

        let br0 = oracle.best_response_value(&PerNodeUniform { tree: &tree }, 0);
        assert_eq!(br0, 0.0);
    }
}

//! Deterministic CFR trainer: vanilla CFR, CFR+, Linear CFR and
//! Discounted CFR.
//!
//! Each iteration runs one vectorised tree walk per player. The update
//! player's reach and the opponent's reach flow down as per-hand vectors;
//! per-hand counterfactual values flow back up. Terminal values come from
//! the [`VectorEvaluator`], so a walk costs O(nodes x hands).

use crate::best_response::{BestResponse, StrategySource};
use crate::evaluator::VectorEvaluator;
use crate::game::RiverGame;
use crate::tree::Tree;

/// Accumulator scalar for regrets and strategy sums. Intermediate
/// arithmetic is always f64.
#[cfg(feature = "regret-f32")]
pub type CfrScalar = f32;
#[cfg(not(feature = "regret-f32"))]
pub type CfrScalar = f64;

/// Discount parameters for Discounted CFR.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscountParams {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl Default for DiscountParams {
    fn default() -> Self {
        Self {
            alpha: 1.5,
            beta: 0.0,
            gamma: 2.0,
        }
    }
}

impl DiscountParams {
    fn positive_regret_scale(&self, t: u64) -> f64 {
        let base = (t as f64).powf(self.alpha);
        base / (base + 1.0)
    }

    fn negative_regret_scale(&self, t: u64) -> f64 {
        let base = (t as f64).powf(self.beta);
        base / (base + 1.0)
    }

    fn strategy_scale(&self, t: u64) -> f64 {
        let t = t as f64;
        (t / (t + 1.0)).powf(self.gamma)
    }
}

/// CFR algorithm variant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum CfrVariant {
    /// Vanilla CFR: unit weights, signed regrets.
    Cfr,
    /// CFR+ : regrets floored at zero, linear strategy averaging.
    #[default]
    CfrPlus,
    /// Linear CFR: iteration-weighted regrets and averages.
    LinearCfr,
    /// Discounted CFR with configurable (alpha, beta, gamma).
    Discounted(DiscountParams),
}

/// Per-node regret and strategy-sum tables, row-major `hand x action`.
struct InfoSet {
    hand_count: usize,
    action_count: usize,
    regret: Vec<CfrScalar>,
    strategy_sum: Vec<CfrScalar>,
}

impl InfoSet {
    fn empty() -> Self {
        InfoSet {
            hand_count: 0,
            action_count: 0,
            regret: Vec::new(),
            strategy_sum: Vec::new(),
        }
    }

    fn is_active(&self) -> bool {
        self.hand_count > 0 && self.action_count > 0
    }

    /// Regret-matching over positive regrets, uniform when none.
    fn strategy_into(&self, out: &mut [f64]) {
        let actions = self.action_count;
        for h in 0..self.hand_count {
            let offset = h * actions;
            let mut normalizing = 0.0;
            for a in 0..actions {
                let r = self.regret[offset + a] as f64;
                if r > 0.0 {
                    normalizing += r;
                }
            }
            if normalizing > 0.0 {
                for a in 0..actions {
                    let r = self.regret[offset + a] as f64;
                    out[offset + a] = if r > 0.0 { r / normalizing } else { 0.0 };
                }
            } else {
                let uniform = 1.0 / actions as f64;
                for a in 0..actions {
                    out[offset + a] = uniform;
                }
            }
        }
    }

    /// Normalised cumulative strategy, uniform for zero-mass rows.
    fn average_strategy_into(&self, out: &mut [f64]) {
        let actions = self.action_count;
        for h in 0..self.hand_count {
            let offset = h * actions;
            let mut normalizing = 0.0;
            for a in 0..actions {
                normalizing += self.strategy_sum[offset + a] as f64;
            }
            if normalizing > 0.0 {
                for a in 0..actions {
                    out[offset + a] = self.strategy_sum[offset + a] as f64 / normalizing;
                }
            } else {
                let uniform = 1.0 / actions as f64;
                for a in 0..actions {
                    out[offset + a] = uniform;
                }
            }
        }
    }

    fn apply_discount(&mut self, pos_scale: f64, neg_scale: f64, strat_scale: f64) {
        for regret in &mut self.regret {
            let r = *regret as f64;
            if r > 0.0 {
                *regret = (r * pos_scale) as CfrScalar;
            } else if r < 0.0 {
                *regret = (r * neg_scale) as CfrScalar;
            }
        }
        for value in &mut self.strategy_sum {
            *value = (*value as f64 * strat_scale) as CfrScalar;
        }
    }
}

/// One pre-allocated frame per recursion depth, so traversals never touch
/// the heap.
struct ScratchFrame {
    values: Vec<f64>,
    strategy: Vec<f64>,
    next_reach: Vec<f64>,
    action_values: Vec<f64>,
    prefix: Vec<f64>,
}

/// Deterministic CFR trainer over a fixed (game, tree, evaluator).
pub struct CfrTrainer<'a> {
    game: &'a RiverGame,
    tree: &'a Tree,
    evaluator: &'a VectorEvaluator,
    variant: CfrVariant,
    infosets: Vec<InfoSet>,
    scratch: Vec<ScratchFrame>,
    iteration: u64,
    regret_weight: f64,
    avg_weight: f64,
    dcfr_pos_scale: f64,
    dcfr_neg_scale: f64,
    dcfr_strat_scale: f64,
}

impl<'a> CfrTrainer<'a> {
    pub fn new(
        game: &'a RiverGame,
        tree: &'a Tree,
        evaluator: &'a VectorEvaluator,
        variant: CfrVariant,
    ) -> Self {
        let mut infosets = Vec::with_capacity(tree.nodes.len());
        for node in &tree.nodes {
            if node.player < 0 {
                infosets.push(InfoSet::empty());
                continue;
            }
            let hand_count = game.hand_count(node.player as usize);
            let action_count = node.action_count();
            let total = hand_count * action_count;
            infosets.push(InfoSet {
                hand_count,
                action_count,
                regret: vec![0.0 as CfrScalar; total],
                strategy_sum: vec![0.0 as CfrScalar; total],
            });
        }

        let max_hands = game.hand_count(0).max(game.hand_count(1));
        let max_actions = tree.max_actions.max(1);
        let depth = tree.max_depth + 2;
        let scratch = (0..depth)
            .map(|_| ScratchFrame {
                values: vec![0.0; max_hands],
                strategy: vec![0.0; max_hands * max_actions],
                next_reach: vec![0.0; max_hands],
                action_values: vec![0.0; max_hands * max_actions],
                prefix: Vec::with_capacity(max_hands + 1),
            })
            .collect();

        CfrTrainer {
            game,
            tree,
            evaluator,
            variant,
            infosets,
            scratch,
            iteration: 0,
            regret_weight: 1.0,
            avg_weight: 1.0,
            dcfr_pos_scale: 1.0,
            dcfr_neg_scale: 1.0,
            dcfr_strat_scale: 1.0,
        }
    }

    /// Run `iterations` alternating-update iterations.
    pub fn run(&mut self, iterations: u64) {
        for _ in 0..iterations {
            self.iteration += 1;
            let t = self.iteration;
            match self.variant {
                CfrVariant::Cfr => {
                    self.regret_weight = 1.0;
                    self.avg_weight = 1.0;
                }
                CfrVariant::CfrPlus => {
                    self.regret_weight = 1.0;
                    self.avg_weight = t as f64;
                }
                CfrVariant::LinearCfr => {
                    self.regret_weight = t as f64;
                    self.avg_weight = t as f64;
                }
                CfrVariant::Discounted(params) => {
                    self.regret_weight = 1.0;
                    self.avg_weight = 1.0;
                    self.dcfr_pos_scale = params.positive_regret_scale(t);
                    self.dcfr_neg_scale = params.negative_regret_scale(t);
                    self.dcfr_strat_scale = params.strategy_scale(t);
                }
            }

            let game = self.game;
            for player in 0..2 {
                let mut frames = std::mem::take(&mut self.scratch);
                self.traverse(
                    self.tree.root,
                    player,
                    &game.hand_weights[player],
                    &game.hand_weights[1 - player],
                    &mut frames,
                );
                self.scratch = frames;
            }
        }
    }

    /// Iterations completed so far.
    pub fn iterations(&self) -> u64 {
        self.iteration
    }

    /// Whether the node holds a trained infoset.
    pub fn has_infoset(&self, node_id: usize) -> bool {
        self.infosets
            .get(node_id)
            .map(|i| i.is_active())
            .unwrap_or(false)
    }

    /// The average strategy at a node, row-major `hand x action`. Empty if
    /// the node is terminal.
    pub fn average_strategy(&self, node_id: usize) -> Vec<f64> {
        let info = &self.infosets[node_id];
        if !info.is_active() {
            return Vec::new();
        }
        let mut out = vec![0.0; info.hand_count * info.action_count];
        info.average_strategy_into(&mut out);
        out
    }

    /// Exploitability of the current average strategy, in chips.
    pub fn exploitability(&self) -> f64 {
        BestResponse::new(self.game, self.tree, self.evaluator).exploitability(self)
    }

    fn traverse(
        &mut self,
        node_id: usize,
        update_player: usize,
        reach_p: &[f64],
        reach_opp: &[f64],
        frames: &mut [ScratchFrame],
    ) {
        let game = self.game;
        let tree = self.tree;
        let evaluator = self.evaluator;
        let node = &tree.nodes[node_id];
        let update_hands = game.hand_count(update_player);
        let (frame, rest) = frames.split_first_mut().expect("scratch depth exceeded");

        if node.player < 0 {
            let pot = (game.base_pot + node.contrib0 + node.contrib1) as f64;
            let contrib = node.contrib(update_player) as f64;
            if node.terminal_winner >= 0 {
                let value = if node.terminal_winner as usize == update_player {
                    pot - contrib
                } else {
                    -contrib
                };
                evaluator.fold_values(
                    update_player,
                    reach_opp,
                    value,
                    &mut frame.values[..update_hands],
                );
            } else {
                evaluator.showdown_values(
                    update_player,
                    reach_opp,
                    pot,
                    contrib,
                    &mut frame.values[..update_hands],
                    &mut frame.prefix,
                );
            }
            return;
        }

        let player = node.player as usize;
        let action_count = node.action_count();

        if player != update_player {
            let opp_hands = game.hand_count(player);
            self.infosets[node_id].strategy_into(&mut frame.strategy[..opp_hands * action_count]);
            frame.values[..update_hands].fill(0.0);
            for a in 0..action_count {
                for h in 0..opp_hands {
                    frame.next_reach[h] = reach_opp[h] * frame.strategy[h * action_count + a];
                }
                self.traverse(
                    node.next[a],
                    update_player,
                    reach_p,
                    &frame.next_reach[..opp_hands],
                    rest,
                );
                let child_values = &rest[0].values;
                for h in 0..update_hands {
                    frame.values[h] += child_values[h];
                }
            }
            return;
        }

        // Update player's node. DCFR decays the accumulators before the
        // current strategy is read from them.
        if matches!(self.variant, CfrVariant::Discounted(_)) {
            let (pos, neg, strat) = (
                self.dcfr_pos_scale,
                self.dcfr_neg_scale,
                self.dcfr_strat_scale,
            );
            self.infosets[node_id].apply_discount(pos, neg, strat);
        }
        self.infosets[node_id].strategy_into(&mut frame.strategy[..update_hands * action_count]);

        for a in 0..action_count {
            for h in 0..update_hands {
                frame.next_reach[h] = reach_p[h] * frame.strategy[h * action_count + a];
            }
            self.traverse(
                node.next[a],
                update_player,
                &frame.next_reach[..update_hands],
                reach_opp,
                rest,
            );
            frame.action_values[a * update_hands..(a + 1) * update_hands]
                .copy_from_slice(&rest[0].values[..update_hands]);
        }

        for h in 0..update_hands {
            let offset = h * action_count;
            let mut value = 0.0;
            for a in 0..action_count {
                value += frame.strategy[offset + a] * frame.action_values[a * update_hands + h];
            }
            frame.values[h] = value;
        }

        let regret_weight = self.regret_weight;
        let avg_weight = self.avg_weight;
        let clamp = matches!(self.variant, CfrVariant::CfrPlus);
        let info = &mut self.infosets[node_id];

        for h in 0..update_hands {
            let offset = h * action_count;
            let base = frame.values[h];
            for a in 0..action_count {
                let delta = (frame.action_values[a * update_hands + h] - base) * regret_weight;
                let mut updated = info.regret[offset + a] as f64 + delta;
                if clamp && updated < 0.0 {
                    updated = 0.0;
                }
                info.regret[offset + a] = updated as CfrScalar;
            }
        }

        for h in 0..update_hands {
            let weight = reach_p[h] * avg_weight;
            if weight == 0.0 {
                continue;
            }
            let offset = h * action_count;
            for a in 0..action_count {
                let updated =
                    info.strategy_sum[offset + a] as f64 + weight * frame.strategy[offset + a];
                info.strategy_sum[offset + a] = updated as CfrScalar;
            }
        }
    }
}

impl StrategySource for CfrTrainer<'_> {
    fn average_strategy_into(&self, _player: usize, node_id: usize, out: &mut [f64]) {
        self.infosets[node_id].average_strategy_into(out);
    }
}

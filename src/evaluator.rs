//! Vectorised terminal evaluation.
//!
//! For each player the evaluator pre-sorts the opponent's hand list by
//! strength and locates, per player hand, the window of tied opponent
//! strengths within that order. Showdown values against an arbitrary
//! opponent reach vector then come from a single prefix-sum pass, with the
//! handful of card-sharing (blocked) opponent hands subtracted per hand.
//! All outputs are linear in the reach vector.

use crate::cards::DECK_SIZE;
use crate::game::Hand;
use crate::strength::Strength;

struct EvalCache {
    /// Opponent hand indices ordered by ascending strength.
    sorted_indices: Vec<usize>,
    /// Opponent strengths in sorted order.
    strengths_sorted: Vec<Strength>,
    /// Per player hand: first sorted position not strictly weaker.
    range_start: Vec<usize>,
    /// Per player hand: first sorted position strictly stronger.
    range_end: Vec<usize>,
    /// Card-sharing opponent hands, split by strength comparison.
    blocked_less: Vec<Vec<usize>>,
    blocked_equal: Vec<Vec<usize>>,
    blocked_greater: Vec<Vec<usize>>,
}

impl EvalCache {
    fn build(player_hands: &[Hand], opp_hands: &[Hand]) -> Self {
        let opp_count = opp_hands.len();
        let mut sorted_indices: Vec<usize> = (0..opp_count).collect();
        sorted_indices.sort_by_key(|&i| opp_hands[i].strength);
        let strengths_sorted: Vec<Strength> = sorted_indices
            .iter()
            .map(|&i| opp_hands[i].strength)
            .collect();

        let mut range_start = Vec::with_capacity(player_hands.len());
        let mut range_end = Vec::with_capacity(player_hands.len());
        for hand in player_hands {
            let s = hand.strength;
            range_start.push(strengths_sorted.partition_point(|&o| o < s));
            range_end.push(strengths_sorted.partition_point(|&o| o <= s));
        }

        let mut card_to_indices: Vec<Vec<usize>> = vec![Vec::new(); DECK_SIZE];
        for (idx, hand) in opp_hands.iter().enumerate() {
            card_to_indices[hand.cards[0] as usize].push(idx);
            card_to_indices[hand.cards[1] as usize].push(idx);
        }

        let mut blocked_less = Vec::with_capacity(player_hands.len());
        let mut blocked_equal = Vec::with_capacity(player_hands.len());
        let mut blocked_greater = Vec::with_capacity(player_hands.len());
        for hand in player_hands {
            let mut blocked: Vec<usize> = card_to_indices[hand.cards[0] as usize]
                .iter()
                .chain(&card_to_indices[hand.cards[1] as usize])
                .copied()
                .collect();
            blocked.sort_unstable();
            blocked.dedup();

            let mut less = Vec::new();
            let mut equal = Vec::new();
            let mut greater = Vec::new();
            for idx in blocked {
                let opp_strength = opp_hands[idx].strength;
                if opp_strength < hand.strength {
                    less.push(idx);
                } else if opp_strength > hand.strength {
                    greater.push(idx);
                } else {
                    equal.push(idx);
                }
            }
            blocked_less.push(less);
            blocked_equal.push(equal);
            blocked_greater.push(greater);
        }

        EvalCache {
            sorted_indices,
            strengths_sorted,
            range_start,
            range_end,
            blocked_less,
            blocked_equal,
            blocked_greater,
        }
    }
}

/// Per-terminal utility vectors computed in O(hands) per call.
pub struct VectorEvaluator {
    cache: [EvalCache; 2],
    num_hands: [usize; 2],
}

impl VectorEvaluator {
    pub fn new(hands: &[Vec<Hand>; 2]) -> Self {
        VectorEvaluator {
            cache: [
                EvalCache::build(&hands[0], &hands[1]),
                EvalCache::build(&hands[1], &hands[0]),
            ],
            num_hands: [hands[0].len(), hands[1].len()],
        }
    }

    /// Per-hand expected chip delta at a showdown for `player`, against the
    /// opponent reach vector `opp_reach`. `pot_total` is the full pot at the
    /// terminal and `contrib` the player's own contribution to it.
    pub fn showdown_values(
        &self,
        player: usize,
        opp_reach: &[f64],
        pot_total: f64,
        contrib: f64,
        out: &mut [f64],
        prefix: &mut Vec<f64>,
    ) {
        let cache = &self.cache[player];
        let opp_count = self.num_hands[1 - player];
        debug_assert_eq!(opp_reach.len(), opp_count);

        prefix.resize(opp_count + 1, 0.0);
        prefix[0] = 0.0;
        for i in 0..opp_count {
            prefix[i + 1] = prefix[i] + opp_reach[cache.sorted_indices[i]];
        }
        let total = prefix[opp_count];
        if total <= 0.0 {
            out.fill(0.0);
            return;
        }

        for (h, out_value) in out.iter_mut().enumerate() {
            let start = cache.range_start[h];
            let end = cache.range_end[h];
            let mut win_weight = prefix[start];
            let mut tie_weight = prefix[end] - prefix[start];
            let mut lose_weight = total - win_weight - tie_weight;

            for &idx in &cache.blocked_less[h] {
                win_weight -= opp_reach[idx];
            }
            for &idx in &cache.blocked_equal[h] {
                tie_weight -= opp_reach[idx];
            }
            for &idx in &cache.blocked_greater[h] {
                lose_weight -= opp_reach[idx];
            }

            let active = win_weight + tie_weight + lose_weight;
            *out_value = win_weight * pot_total + tie_weight * (pot_total * 0.5) - contrib * active;
        }
    }

    /// Per-hand chip delta when one side folded: the constant per-matchup
    /// `value` scaled by the unblocked opponent reach mass.
    pub fn fold_values(&self, player: usize, opp_reach: &[f64], value: f64, out: &mut [f64]) {
        let cache = &self.cache[player];
        let total: f64 = opp_reach.iter().sum();
        if total <= 0.0 {
            out.fill(0.0);
            return;
        }
        for (h, out_value) in out.iter_mut().enumerate() {
            *out_value = value * (total - self.blocked_weight(cache, h, opp_reach));
        }
    }

    /// Per-hand unblocked opponent reach mass; the normalising denominator
    /// when converting aggregate utilities to per-hand expected value.
    pub fn valid_opp_weights(&self, player: usize, opp_reach: &[f64], out: &mut [f64]) {
        let cache = &self.cache[player];
        let total: f64 = opp_reach.iter().sum();
        if total <= 0.0 {
            out.fill(0.0);
            return;
        }
        for (h, out_value) in out.iter_mut().enumerate() {
            *out_value = total - self.blocked_weight(cache, h, opp_reach);
        }
    }

    fn blocked_weight(&self, cache: &EvalCache, h: usize, opp_reach: &[f64]) -> f64 {
        let mut blocked = 0.0;
        for &idx in &cache.blocked_less[h] {
            blocked += opp_reach[idx];
        }
        for &idx in &cache.blocked_equal[h] {
            blocked += opp_reach[idx];
        }
        for &idx in &cache.blocked_greater[h] {
            blocked += opp_reach[idx];
        }
        blocked
    }
}

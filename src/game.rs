//! River subgame definition: board, stacks, ranges and per-hand weights.

use rayon::prelude::*;

use crate::cards::{card_to_string, Card, DECK_SIZE};
use crate::error::{SolverError, SolverResult};
use crate::strength::{evaluate_seven, Strength};

/// An explicit weighted range for one player.
#[derive(Debug, Clone, Default)]
pub struct PlayerRange {
    /// Two-card hands, each with `cards[0] < cards[1]`.
    pub hands: Vec<[Card; 2]>,
    /// Non-negative weight per hand, parallel to `hands`.
    pub weights: Vec<f64>,
}

/// Configuration for a river subgame.
#[derive(Debug, Clone)]
pub struct RiverConfig {
    /// The five community cards.
    pub board_cards: Vec<Card>,
    /// Chips already in the pot when the subgame starts.
    pub pot: i32,
    /// Remaining stack per player.
    pub stack: i32,
    /// Bet sizes as fractions of the pot.
    pub bet_sizes: Vec<f64>,
    /// Whether to add an all-in bet/raise beyond the listed sizes.
    pub include_all_in: bool,
    /// Maximum number of bets/raises on the street.
    pub max_raises: u32,
    /// Optional explicit ranges. `None` enumerates every hand at weight 1.
    pub ranges: [Option<PlayerRange>; 2],
}

impl Default for RiverConfig {
    fn default() -> Self {
        Self {
            board_cards: Vec::new(),
            pot: 1000,
            stack: 9500,
            bet_sizes: vec![0.5, 1.0],
            include_all_in: true,
            max_raises: 1000,
            ranges: [None, None],
        }
    }
}

/// A private hand with its weight and precomputed board strength.
#[derive(Debug, Clone)]
pub struct Hand {
    /// Hole cards, `cards[0] < cards[1]`.
    pub cards: [Card; 2],
    /// Raw range weight.
    pub weight: f64,
    /// Seven-card strength on the configured board.
    pub strength: Strength,
}

/// An immutable river subgame: validated board, betting parameters, and the
/// per-player hand lists with normalised weights.
pub struct RiverGame {
    pub board: [Card; 5],
    pub base_pot: i32,
    pub stack: i32,
    pub bet_sizes: Vec<f64>,
    pub include_all_in: bool,
    pub max_raises: u32,
    /// Hand list per player, fixed after construction.
    pub hands: [Vec<Hand>; 2],
    /// Range weights renormalised to sum to 1 (all zero if the total is zero).
    pub hand_weights: [Vec<f64>; 2],
}

impl RiverGame {
    pub fn new(config: RiverConfig) -> SolverResult<Self> {
        if config.board_cards.len() != 5 {
            return Err(SolverError::InvalidBoard(format!(
                "River board must have exactly 5 cards, got {}",
                config.board_cards.len()
            )));
        }
        let mut board = [0 as Card; 5];
        board.copy_from_slice(&config.board_cards);
        for i in 0..5 {
            for j in (i + 1)..5 {
                if board[i] == board[j] {
                    return Err(SolverError::InvalidBoard(format!(
                        "Duplicate card on board: {}",
                        card_to_string(board[i])
                    )));
                }
            }
        }

        let mut on_board = [false; DECK_SIZE];
        for &c in &board {
            on_board[c as usize] = true;
        }

        let mut hands: [Vec<Hand>; 2] = [Vec::new(), Vec::new()];
        let mut hand_weights: [Vec<f64>; 2] = [Vec::new(), Vec::new()];

        for player in 0..2 {
            let raw: Vec<([Card; 2], f64)> = match &config.ranges[player] {
                Some(range) => {
                    if range.hands.len() != range.weights.len() {
                        return Err(SolverError::InvalidConfig(format!(
                            "Player {} has {} hands but {} weights",
                            player,
                            range.hands.len(),
                            range.weights.len()
                        )));
                    }
                    range
                        .hands
                        .iter()
                        .zip(&range.weights)
                        .filter(|(cards, _)| {
                            !on_board[cards[0] as usize] && !on_board[cards[1] as usize]
                        })
                        .map(|(&cards, &w)| (cards, w))
                        .collect()
                }
                None => {
                    let mut all = Vec::with_capacity(47 * 46 / 2);
                    for c1 in 0..DECK_SIZE as Card {
                        if on_board[c1 as usize] {
                            continue;
                        }
                        for c2 in (c1 + 1)..DECK_SIZE as Card {
                            if on_board[c2 as usize] {
                                continue;
                            }
                            all.push(([c1, c2], 1.0));
                        }
                    }
                    all
                }
            };

            let strengths: Vec<Strength> = raw
                .par_iter()
                .map(|&(cards, _)| {
                    evaluate_seven([
                        board[0], board[1], board[2], board[3], board[4], cards[0], cards[1],
                    ])
                })
                .collect();

            hands[player] = raw
                .iter()
                .zip(strengths)
                .map(|(&(cards, weight), strength)| Hand {
                    cards,
                    weight,
                    strength,
                })
                .collect();

            let total: f64 = hands[player].iter().map(|h| h.weight).sum();
            hand_weights[player] = if total > 0.0 {
                hands[player].iter().map(|h| h.weight / total).collect()
            } else {
                vec![0.0; hands[player].len()]
            };
        }

        Ok(RiverGame {
            board,
            base_pot: config.pot,
            stack: config.stack,
            bet_sizes: config.bet_sizes,
            include_all_in: config.include_all_in,
            max_raises: config.max_raises,
            hands,
            hand_weights,
        })
    }

    /// Number of hands in a player's list.
    #[inline]
    pub fn hand_count(&self, player: usize) -> usize {
        self.hands[player].len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{parse_board, parse_hand};

    fn base_config(board: &str) -> RiverConfig {
        RiverConfig {
            board_cards: parse_board(board).unwrap(),
            ..RiverConfig::default()
        }
    }

    #[test]
    fn test_full_enumeration_excludes_board() {
        let game = RiverGame::new(base_config("KsTh7s4d2s")).unwrap();
        // C(47, 2) hands remain once the five board cards are dead.
        assert_eq!(game.hand_count(0), 47 * 46 / 2);
        assert_eq!(game.hand_count(1), 47 * 46 / 2);

        for hand in &game.hands[0] {
            assert!(hand.cards[0] < hand.cards[1]);
            for &b in &game.board {
                assert_ne!(hand.cards[0], b);
                assert_ne!(hand.cards[1], b);
            }
        }
    }

    #[test]
    fn test_weights_normalised() {
        let game = RiverGame::new(base_config("KsTh7s4d2s")).unwrap();
        for player in 0..2 {
            let total: f64 = game.hand_weights[player].iter().sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_explicit_range_filtering() {
        let mut config = base_config("KsTh7s4d2s");
        // KsKd collides with the board king and must be dropped.
        let hands = vec![
            parse_hand("AsAd").unwrap(),
            parse_hand("KsKd").unwrap(),
            parse_hand("QsQd").unwrap(),
        ];
        config.ranges[0] = Some(PlayerRange {
            hands,
            weights: vec![1.0, 1.0, 2.0],
        });
        let game = RiverGame::new(config).unwrap();
        assert_eq!(game.hand_count(0), 2);
        assert!((game.hand_weights[0][0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((game.hand_weights[0][1] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_total_weight_gives_zero_vector() {
        let mut config = base_config("KsTh7s4d2s");
        config.ranges[1] = Some(PlayerRange {
            hands: vec![parse_hand("AsAd").unwrap()],
            weights: vec![0.0],
        });
        let game = RiverGame::new(config).unwrap();
        assert_eq!(game.hand_weights[1], vec![0.0]);
    }

    #[test]
    fn test_board_validation() {
        assert!(RiverGame::new(base_config("KsTh7s4d")).is_err());
        let mut config = base_config("KsTh7s4d2s");
        config.board_cards[4] = config.board_cards[0];
        assert!(RiverGame::new(config).is_err());
    }

    #[test]
    fn test_mismatched_weights_rejected() {
        let mut config = base_config("KsTh7s4d2s");
        config.ranges[0] = Some(PlayerRange {
            hands: vec![parse_hand("AsAd").unwrap()],
            weights: vec![1.0, 0.5],
        });
        assert!(matches!(
            RiverGame::new(config),
            Err(SolverError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_strength_precomputed() {
        let mut config = base_config("KsTh7s4d2s");
        config.ranges[0] = Some(PlayerRange {
            hands: vec![parse_hand("AsQs").unwrap(), parse_hand("KdKh").unwrap()],
            weights: vec![1.0, 1.0],
        });
        let game = RiverGame::new(config).unwrap();
        // AsQs makes the ace-high flush, KdKh only trips.
        assert!(game.hands[0][0].strength > game.hands[0][1].strength);
    }
}

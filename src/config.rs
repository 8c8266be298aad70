//! JSON subgame configuration.
//!
//! Recognised fields, all optional:
//!
//! ```json
//! {
//!   "board": ["Ks", "Th", "7s", "4d", "2s"],
//!   "pot": 1000,
//!   "stack": 9500,
//!   "bet_sizes": [0.5, 1.0],
//!   "include_all_in": true,
//!   "max_raises": 1000,
//!   "players": [
//!     {"hands": ["AsAd", "KdKh"], "weights": [1.0, 0.8]},
//!     {}
//!   ]
//! }
//! ```
//!
//! A player entry needs `hands` and `weights` together; an entry missing
//! either field falls back to full enumeration at weight 1.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::cards::{parse_card, parse_hand};
use crate::error::{SolverError, SolverResult};
use crate::game::{PlayerRange, RiverConfig};

#[derive(Debug, Default, Deserialize)]
struct PlayerEntry {
    hands: Option<Vec<String>>,
    weights: Option<Vec<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct SubgameFile {
    board: Option<Vec<String>>,
    pot: Option<i32>,
    stack: Option<i32>,
    bet_sizes: Option<Vec<f64>>,
    include_all_in: Option<bool>,
    max_raises: Option<u32>,
    players: Option<Vec<PlayerEntry>>,
}

/// Load a subgame configuration from a JSON file.
pub fn load_config(path: &Path) -> SolverResult<RiverConfig> {
    let text = fs::read_to_string(path)?;
    parse_config(&text)
}

/// Parse a subgame configuration from JSON text.
pub fn parse_config(text: &str) -> SolverResult<RiverConfig> {
    let file: SubgameFile = serde_json::from_str(text)?;
    let mut config = RiverConfig::default();

    if let Some(board) = file.board {
        config.board_cards = board
            .iter()
            .map(|s| parse_card(s))
            .collect::<SolverResult<Vec<_>>>()?;
    }
    if let Some(pot) = file.pot {
        config.pot = pot;
    }
    if let Some(stack) = file.stack {
        config.stack = stack;
    }
    if let Some(bet_sizes) = file.bet_sizes {
        config.bet_sizes = bet_sizes;
    }
    if let Some(include_all_in) = file.include_all_in {
        config.include_all_in = include_all_in;
    }
    if let Some(max_raises) = file.max_raises {
        config.max_raises = max_raises;
    }

    if let Some(players) = file.players {
        if players.len() != 2 {
            return Err(SolverError::InvalidConfig(format!(
                "players must have exactly 2 entries, got {}",
                players.len()
            )));
        }
        for (player, entry) in players.into_iter().enumerate() {
            // An entry missing either field keeps the full-enumeration
            // default for that player.
            let (Some(hands), Some(weights)) = (entry.hands, entry.weights) else {
                continue;
            };
            if hands.len() != weights.len() {
                return Err(SolverError::InvalidConfig(format!(
                    "player {}: {} hands but {} weights",
                    player,
                    hands.len(),
                    weights.len()
                )));
            }
            let hands = hands
                .iter()
                .map(|s| parse_hand(s))
                .collect::<SolverResult<Vec<_>>>()?;
            config.ranges[player] = Some(PlayerRange { hands, weights });
        }
    }

    Ok(config)
}

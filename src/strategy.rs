//! Average-strategy JSON dump.
//!
//! The dump has one entry per player: the hand list, the normalised hand
//! weights, and a `profile` keyed by the node's action path from the root
//! (`"root"`, `"c"`, `"b500/r1000"`, ...). Each profile entry carries the
//! node's action tokens and a `hand_count x action_count` probability
//! matrix.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::best_response::StrategySource;
use crate::cards::hand_to_string;
use crate::error::SolverResult;
use crate::game::RiverGame;
use crate::tree::Tree;

/// Strategy at one decision node.
#[derive(Debug, Serialize)]
pub struct NodeStrategy {
    /// Action tokens in tree order (`c`, `f`, `b<amount>`, `r<extra>`).
    pub actions: Vec<String>,
    /// Row per hand, column per action.
    pub strategy: Vec<Vec<f64>>,
}

/// One player's side of the dump.
#[derive(Debug, Serialize)]
pub struct PlayerStrategy {
    pub hands: Vec<String>,
    pub weights: Vec<f64>,
    pub profile: BTreeMap<String, NodeStrategy>,
}

/// The complete strategy dump.
#[derive(Debug, Serialize)]
pub struct StrategyDump {
    pub players: Vec<PlayerStrategy>,
}

/// Action path per node: `/`-joined tokens from the root, the root itself
/// labelled `"root"`.
pub fn node_paths(tree: &Tree) -> Vec<String> {
    let mut paths = vec![String::new(); tree.len()];
    let mut stack = vec![(tree.root, "root".to_string())];
    while let Some((node_id, path)) = stack.pop() {
        let node = &tree.nodes[node_id];
        for (a, &child) in node.next.iter().enumerate() {
            let token = node.actions[a].token();
            let child_path = if node_id == tree.root {
                token
            } else {
                format!("{}/{}", path, token)
            };
            stack.push((child, child_path));
        }
        paths[node_id] = path;
    }
    paths
}

/// Build the dump from a trained profile.
pub fn build_dump<S: StrategySource>(game: &RiverGame, tree: &Tree, source: &S) -> StrategyDump {
    let paths = node_paths(tree);
    let mut players = Vec::with_capacity(2);

    for player in 0..2 {
        let hand_count = game.hand_count(player);
        let mut profile = BTreeMap::new();

        for (node_id, node) in tree.nodes.iter().enumerate() {
            if node.player != player as i8 {
                continue;
            }
            let action_count = node.action_count();
            let mut flat = vec![0.0; hand_count * action_count];
            source.average_strategy_into(player, node_id, &mut flat);

            let strategy: Vec<Vec<f64>> = flat.chunks(action_count).map(|row| row.to_vec()).collect();
            let actions: Vec<String> = node.actions.iter().map(|a| a.token()).collect();
            profile.insert(paths[node_id].clone(), NodeStrategy { actions, strategy });
        }

        players.push(PlayerStrategy {
            hands: game.hands[player]
                .iter()
                .map(|h| hand_to_string(h.cards))
                .collect(),
            weights: game.hand_weights[player].clone(),
            profile,
        });
    }

    StrategyDump { players }
}

/// Write the dump as JSON.
pub fn write_dump(path: &Path, dump: &StrategyDump) -> SolverResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{parse_board, parse_hand};
    use crate::cfr::{CfrTrainer, CfrVariant};
    use crate::evaluator::VectorEvaluator;
    use crate::game::{PlayerRange, RiverConfig};

    fn small_game() -> RiverGame {
        let range = || {
            let hands = ["AhAd", "QcQd", "JcJd", "9c9d"];
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

    #[test]
    fn test_node_paths() {
        let game = small_game();
        let tree = Tree::build(&game);
        let paths = node_paths(&tree);

        assert_eq!(paths[tree.root], "root");
        let root = &tree.nodes[tree.root];
        // First child of root is the check node; its check child is "c/c".
        let check = root.next[0];
        assert_eq!(paths[check], "c");
        let check_check = tree.nodes[check].next[0];
        assert_eq!(paths[check_check], "c/c");
        // Bet paths carry amounts.
        let bet = root.next[1];
        assert_eq!(paths[bet], "b500");
    }

    #[test]
    fn test_dump_shape() {
        let game = small_game();
        let tree = Tree::build(&game);
        let evaluator = VectorEvaluator::new(&game.hands);
        let mut trainer = CfrTrainer::new(&game, &tree, &evaluator, CfrVariant::CfrPlus);
        trainer.run(10);

        let dump = build_dump(&game, &tree, &trainer);
        assert_eq!(dump.players.len(), 2);

        for (player, side) in dump.players.iter().enumerate() {
            assert_eq!(side.hands.len(), game.hand_count(player));
            assert_eq!(side.weights.len(), game.hand_count(player));
            assert!((side.weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);

            // Root strategy belongs to player 0 only.
            assert_eq!(side.profile.contains_key("root"), player == 0);

            for node in side.profile.values() {
                assert!(!node.actions.is_empty());
                assert_eq!(node.strategy.len(), game.hand_count(player));
                for row in &node.strategy {
                    assert_eq!(row.len(), node.actions.len());
                    let sum: f64 = row.iter().sum();
                    assert!((sum - 1.0).abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_dump_serialises() {
        let game = small_game();
        let tree = Tree::build(&game);
        let evaluator = VectorEvaluator::new(&game.hands);
        let mut trainer = CfrTrainer::new(&game, &tree, &evaluator, CfrVariant::CfrPlus);
        trainer.run(5);

        let dump = build_dump(&game, &tree, &trainer);
        let json = serde_json::to_value(&dump).unwrap();
        assert!(json["players"].is_array());
        assert_eq!(json["players"].as_array().unwrap().len(), 2);
        let root = &json["players"][0]["profile"]["root"];
        assert_eq!(root["actions"][0], "c");
        assert!(root["strategy"].is_array());
    }
}

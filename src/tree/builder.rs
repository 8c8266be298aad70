//! Betting tree expansion.
//!
//! The tree is stored flat: a vector of [`TreeNode`]s with child indices,
//! root at index 0. Terminals carry `player = -1`; a fold terminal names the
//! winner, a showdown terminal has `terminal_winner = -1` and equal
//! contributions.

use crate::game::RiverGame;
use crate::tree::action::Action;

/// Index of a node in [`Tree::nodes`].
pub type NodeId = usize;

/// A node in the flattened betting tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Acting player (0 or 1), or -1 at terminals.
    pub player: i8,
    /// Fold winner (0 or 1), or -1 at non-terminals and showdowns.
    pub terminal_winner: i8,
    /// Chips player 0 has put into the subgame pot so far.
    pub contrib0: i32,
    /// Chips player 1 has put into the subgame pot so far.
    pub contrib1: i32,
    /// Legal actions, in fixed emission order.
    pub actions: Vec<Action>,
    /// Child node per action.
    pub next: Vec<NodeId>,
}

impl TreeNode {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.player < 0
    }

    #[inline]
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Contribution of the given player.
    #[inline]
    pub fn contrib(&self, player: usize) -> i32 {
        if player == 0 {
            self.contrib0
        } else {
            self.contrib1
        }
    }
}

/// The complete betting tree for a river subgame.
#[derive(Debug)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
    pub root: NodeId,
    /// Largest action count at any node, for scratch sizing.
    pub max_actions: usize,
    /// Deepest node (root at depth 0), for scratch sizing.
    pub max_depth: usize,
}

impl Tree {
    /// Build the betting tree for a game.
    pub fn build(game: &RiverGame) -> Tree {
        let mut builder = TreeBuilder {
            game,
            nodes: Vec::new(),
            max_actions: 0,
            max_depth: 0,
        };
        let root = builder.expand(0, 0, 0, [0, 0], 0);
        Tree {
            nodes: builder.nodes,
            root,
            max_actions: builder.max_actions,
            max_depth: builder.max_depth,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn terminal_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_terminal()).count()
    }

    pub fn internal_count(&self) -> usize {
        self.nodes.len() - self.terminal_count()
    }
}

struct TreeBuilder<'a> {
    game: &'a RiverGame,
    nodes: Vec<TreeNode>,
    max_actions: usize,
    max_depth: usize,
}

impl TreeBuilder<'_> {
    fn terminal(&mut self, winner: i8, contrib: [i32; 2], depth: usize) -> NodeId {
        let id = self.nodes.len();
        self.max_depth = self.max_depth.max(depth);
        self.nodes.push(TreeNode {
            player: -1,
            terminal_winner: winner,
            contrib0: contrib[0],
            contrib1: contrib[1],
            actions: Vec::new(),
            next: Vec::new(),
        });
        id
    }

    fn expand(
        &mut self,
        player: usize,
        checks: u32,
        raises: u32,
        contrib: [i32; 2],
        depth: usize,
    ) -> NodeId {
        let node_id = self.nodes.len();
        self.max_depth = self.max_depth.max(depth);
        self.nodes.push(TreeNode {
            player: player as i8,
            terminal_winner: -1,
            contrib0: contrib[0],
            contrib1: contrib[1],
            actions: Vec::new(),
            next: Vec::new(),
        });

        let opponent = 1 - player;
        let to_call = contrib[opponent] - contrib[player];
        let pot_now = self.game.base_pot + contrib[0] + contrib[1];
        let remaining = self.game.stack - contrib[player];

        let mut actions = Vec::new();
        if to_call == 0 {
            actions.push(Action::Check);

            let mut amounts: Vec<i32> = Vec::new();
            for &size in &self.game.bet_sizes {
                let amount = ((pot_now as f64) * size).round() as i32;
                let amount = amount.min(remaining);
                // A size that rounds to zero chips is dropped.
                if amount > 0 {
                    amounts.push(amount);
                }
            }
            if self.game.include_all_in && remaining > 0 {
                amounts.push(remaining);
            }
            amounts.sort_unstable();
            amounts.dedup();
            actions.extend(amounts.into_iter().map(Action::Bet));
        } else {
            actions.push(Action::Call(to_call));
            actions.push(Action::Fold);

            // contrib <= stack on every path, so remaining >= to_call here.
            let max_extra = remaining - to_call;
            if raises < self.game.max_raises && max_extra > 0 {
                let mut extras: Vec<i32> = Vec::new();
                for &size in &self.game.bet_sizes {
                    let extra = (((pot_now + to_call) as f64) * size).round() as i32;
                    let extra = extra.min(max_extra);
                    if extra > 0 {
                        extras.push(extra);
                    }
                }
                if self.game.include_all_in {
                    extras.push(max_extra);
                }
                extras.sort_unstable();
                extras.dedup();
                actions.extend(extras.into_iter().map(Action::Raise));
            }
        }

        let mut next = Vec::with_capacity(actions.len());
        for &action in &actions {
            let child = match action {
                Action::Check => {
                    if checks + 1 == 2 {
                        self.terminal(-1, contrib, depth + 1)
                    } else {
                        self.expand(opponent, checks + 1, raises, contrib, depth + 1)
                    }
                }
                Action::Call(amount) => {
                    let mut c = contrib;
                    c[player] += amount;
                    self.terminal(-1, c, depth + 1)
                }
                Action::Fold => self.terminal(opponent as i8, contrib, depth + 1),
                Action::Bet(amount) => {
                    let mut c = contrib;
                    c[player] += amount;
                    self.expand(opponent, 0, raises + 1, c, depth + 1)
                }
                Action::Raise(extra) => {
                    let mut c = contrib;
                    c[player] += to_call + extra;
                    self.expand(opponent, 0, raises + 1, c, depth + 1)
                }
            };
            next.push(child);
        }

        self.max_actions = self.max_actions.max(actions.len());
        let node = &mut self.nodes[node_id];
        node.actions = actions;
        node.next = next;
        node_id
    }
}

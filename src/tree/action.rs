//! Betting actions.

/// A river betting action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    /// Pass with no bet outstanding.
    Check,
    /// Match the outstanding bet.
    Call(i32),
    /// Surrender the pot.
    Fold,
    /// Open for the given amount.
    Bet(i32),
    /// Add the given amount on top of the call.
    Raise(i32),
}

impl Action {
    /// Chips this action adds beyond what the player already has in.
    pub fn amount(&self) -> i32 {
        match self {
            Action::Check | Action::Fold => 0,
            Action::Call(a) | Action::Bet(a) => *a,
            Action::Raise(extra) => *extra,
        }
    }

    /// Compact token used in strategy dumps: `c`, `f`, `b<amount>`,
    /// `r<extra>`.
    pub fn token(&self) -> String {
        match self {
            Action::Check | Action::Call(_) => "c".to_string(),
            Action::Fold => "f".to_string(),
            Action::Bet(a) => format!("b{}", a),
            Action::Raise(extra) => format!("r{}", extra),
        }
    }

    /// Human-readable label for display.
    pub fn label(&self) -> String {
        match self {
            Action::Check => "Check".to_string(),
            Action::Call(a) => format!("Call {}", a),
            Action::Fold => "Fold".to_string(),
            Action::Bet(a) => format!("Bet {}", a),
            Action::Raise(extra) => format!("Raise +{}", extra),
        }
    }
}

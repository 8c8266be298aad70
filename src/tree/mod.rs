//! Betting tree construction for the river street.

pub mod action;
pub mod builder;

pub use action::Action;
pub use builder::{NodeId, Tree, TreeNode};

//! Structural diff between a current and a target configuration tree.

pub mod engine;
pub mod human;
mod lcs;

pub use engine::{diff, diff_with_options, DiffError, DiffOptions};
pub use human::{human_diff, human_diff_with_options, HumanDiffMode};

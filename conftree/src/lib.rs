//! Command-line front-end for `conftree-core`.
//!
//! - [`rules`]: tagging rules from TOML, with embedded defaults
//! - [`report`]: terminal rendering of diffs and change counts
//! - [`inspect`]: tree view with tags

pub mod inspect;
pub mod report;
pub mod rules;

//! Prompt variables and template rendering for Prompt Vault.
//!
//! This crate holds the two pure steps of a run:
//! - parsing the user's `--vars` string into a variable mapping
//! - rendering stored prompt content against that mapping
//!
//! Neither step performs I/O.

pub mod render;
pub mod vars;

// Re-export main API
pub use render::render;
pub use vars::{parse_vars, Variables};

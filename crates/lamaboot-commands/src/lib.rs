//! lamaboot commands.
//!
//!   setup  the bootstrap sequence (tool → venv → deps → data seed → handoff)
//!   status read-only report of what setup would find
//!   env    remove the venv (and optionally the data dir)

pub mod env;
pub mod setup;
pub mod status;

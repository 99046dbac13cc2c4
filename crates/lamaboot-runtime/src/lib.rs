pub mod env;
pub mod handoff;
pub mod host;
pub mod log;
pub mod manifest;
pub mod process;
pub mod runtime_resolver;
pub mod seed;
pub mod tool;

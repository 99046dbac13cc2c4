//! lamaboot configuration layer
//!
//! All environment variable reads live here; other crates access structured
//! config instead of calling `std::env::var` directly.
//!
//! - `loader`: env_or, env_optional, env_bool helpers and `.env` loading
//! - `schema`: BootstrapConfig, ObservabilityConfig
//! - `env_keys`: key constants

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_optional, env_or, load_dotenv, load_dotenv_from_dir};
pub use schema::{BootstrapConfig, CliOverrides, ObservabilityConfig};

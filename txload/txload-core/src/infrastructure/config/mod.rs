mod env;
mod loader;
mod types;
pub mod validation;

pub use env::*;
pub use loader::{load_config, load_config_from_file, ENV_PREFIX};
pub use types::*;

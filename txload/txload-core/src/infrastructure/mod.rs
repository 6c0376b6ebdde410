//! Infrastructure layer: node access, configuration and logging.

pub mod config;
pub mod logging;
pub mod rpc;

//! Domain layer: data model and pure transaction logic, free of I/O.

pub mod dispatch;
pub mod model;
pub mod policy;
pub mod selection;
pub mod transaction;

pub use model::*;
pub use policy::{Backoff, RetryPolicy, StabilizationPolicy};
pub use selection::{largest_output, select_outputs, OutputSelection};
pub use transaction::{build_transfer, check_conservation, ChangePlacement};

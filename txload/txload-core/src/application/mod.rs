//! Application layer: load-run phases composed from domain logic and node access.

pub mod dispatch;
pub mod fanout;
pub mod funding;
pub mod orchestrator;
pub mod participant;
pub mod preparer;
pub mod sender;

pub use dispatch::{DispatchEngine, DispatchSettings};
pub use fanout::fan_out;
pub use funding::FundingCoordinator;
pub use orchestrator::{Orchestrator, RunOutcome, RunSettings};
pub use participant::{obtain_key_material, ParticipantContext};
pub use preparer::OutputPreparer;
pub use sender::WalletSender;

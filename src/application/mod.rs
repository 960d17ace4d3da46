// Application layer: operation orchestration over the ledger gateway.
// Clients (the CLI today) only talk to `AccountService` and `BulkCoordinator`.

pub mod bulk;
pub mod error;
pub mod service;

pub use bulk::*;
pub use error::*;
pub use service::*;

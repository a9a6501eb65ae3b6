// clinancial - Core Library
// Accounts, financial registers and monthly balances over a pluggable store.
// Used by the CLI binary and by tests.

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod export;
pub mod ledger;
pub mod logging;
pub mod memory;
pub mod store;
pub mod temporal;

// Re-export commonly used types
pub use config::Config;
pub use db::SqliteStore;
pub use entities::{Account, AccountId, AccountRef, Register, RegisterDetails, RegisterId};
pub use error::{LedgerError, Result};
pub use export::{export_registers, write_registers};
pub use ledger::{BoundaryZone, Ledger};
pub use memory::MemoryStore;
pub use store::LedgerStore;
pub use temporal::{Period, PeriodKey};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Storage contract shared by the persistent and in-memory backends
//
// Both backends hold accounts and registers keyed by numeric id. Lookups that
// match nothing return `LedgerError::NotFound`; everything else that fails is
// a storage error. Range results are ordered by (time, id).

use crate::entities::{Account, AccountId, Register, RegisterId};
use crate::error::Result;
use chrono::{DateTime, Utc};

pub trait LedgerStore {
    /// Create tables/indexes if missing. Calling it twice is harmless.
    fn create_schema(&mut self) -> Result<()>;

    /// Wipe everything the store holds
    fn drop_schema(&mut self) -> Result<()>;

    fn insert_account(&mut self, name: &str, created_at: DateTime<Utc>) -> Result<AccountId>;

    fn rename_account(&mut self, id: AccountId, name: &str) -> Result<()>;

    fn account_by_id(&self, id: AccountId) -> Result<Account>;

    /// First match wins if names collide
    fn account_by_name(&self, name: &str) -> Result<Account>;

    /// All accounts, ascending id
    fn all_accounts(&self) -> Result<Vec<Account>>;

    /// Persist a register and return the id the store assigned. Present
    /// endpoints must reference existing accounts.
    fn insert_register(&mut self, register: &Register) -> Result<RegisterId>;

    /// Delete the register matching both id and name
    fn delete_register(&mut self, id: RegisterId, name: &str) -> Result<()>;

    fn register_by_id(&self, id: RegisterId) -> Result<Register>;

    /// Registers with `time < end`
    fn registers_before(&self, end: DateTime<Utc>) -> Result<Vec<Register>>;

    /// Registers with `start < time < end`
    fn registers_between(&self, start: DateTime<Utc>, end: DateTime<Utc>)
        -> Result<Vec<Register>>;
}

// 📒 Ledger Engine - balances, register bookkeeping, date-range lookups
//
// Balance of account A as of month M/year Y:
//   sum over registers with time < first instant of month M+1 of
//     +value if A is `to`, -value if A is `from`, 0 otherwise
//
// Registers are recorded once in the store and seen by both endpoints;
// there is no per-account copy to keep in sync.

use crate::config::Config;
use crate::db::SqliteStore;
use crate::entities::{
    Account, AccountId, AccountRef, Register, RegisterDetails, RegisterId,
};
use crate::error::{LedgerError, Result};
use crate::store::LedgerStore;
use crate::temporal::Period;
use chrono::{DateTime, Local, SubsecRound, Utc};
use tracing::{debug, info, warn};

/// Time zone in which month boundaries are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryZone {
    Local,
    Utc,
}

pub struct Ledger<S: LedgerStore> {
    store: S,
    zone: BoundaryZone,
}

impl Ledger<SqliteStore> {
    /// Open the persistent ledger at the configured path
    pub fn open(config: &Config) -> Result<Self> {
        Ok(Ledger::new(SqliteStore::open(config)?))
    }
}

impl<S: LedgerStore> Ledger<S> {
    /// Ledger whose months follow the local time zone
    pub fn new(store: S) -> Self {
        Ledger {
            store,
            zone: BoundaryZone::Local,
        }
    }

    /// Ledger whose months follow UTC
    pub fn with_utc(store: S) -> Self {
        Ledger {
            store,
            zone: BoundaryZone::Utc,
        }
    }

    pub fn zone(&self) -> BoundaryZone {
        self.zone
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Exclusive upper bound of `period` in this ledger's zone
    pub fn month_end(&self, period: Period) -> Result<DateTime<Utc>> {
        match self.zone {
            BoundaryZone::Local => period.end_bound_in(&Local),
            BoundaryZone::Utc => period.end_bound_in(&Utc),
        }
    }

    /// Drop all data and recreate an empty schema
    pub fn reset(&mut self) -> Result<()> {
        self.store.drop_schema()?;
        self.store.create_schema()?;
        warn!("ledger reset: all accounts and registers removed");
        Ok(())
    }

    // ========================================================================
    // ACCOUNTS
    // ========================================================================

    pub fn create_account(&mut self, name: &str) -> Result<Account> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::validation("account name cannot be empty"));
        }

        let created_at = Utc::now().trunc_subsecs(0);
        let id = self.store.insert_account(name, created_at)?;
        info!(account_id = id, name, "account created");
        Ok(Account::new(id, name, created_at))
    }

    /// Rename an account. Creation time is untouched.
    pub fn rename_account(&mut self, id: AccountId, name: &str) -> Result<Account> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::validation("account name cannot be empty"));
        }
        self.store.rename_account(id, name)?;
        self.store.account_by_id(id)
    }

    pub fn account(&self, id: AccountId) -> Result<Account> {
        self.store.account_by_id(id)
    }

    pub fn account_by_name(&self, name: &str) -> Result<Account> {
        self.store.account_by_name(name)
    }

    pub fn find_account(&self, reference: &AccountRef) -> Result<Account> {
        match reference {
            AccountRef::Id(id) => self.account(*id),
            AccountRef::Name(name) => self.account_by_name(name),
        }
    }

    pub fn accounts(&self) -> Result<Vec<Account>> {
        self.store.all_accounts()
    }

    /// Accounts are never removed; registers keep referring to them. This
    /// only checks the account exists.
    pub fn delete_account(&mut self, id: AccountId) -> Result<()> {
        let account = self.account(id)?;
        warn!(account_id = account.id, "account deletion is not supported, nothing removed");
        Ok(())
    }

    // ========================================================================
    // BALANCES
    // ========================================================================

    /// Balance of `account` at the end of `month`/`year`
    pub fn balance(&self, account: AccountId, month: u32, year: i32) -> Result<f64> {
        let period = Period::new(year, month)?;
        let bound = self.month_end(period)?;
        let total = self.balance_at(account, bound)?;
        debug!(account_id = account, period = %period, total, "balance computed");
        Ok(total)
    }

    /// Balance of `account` counting registers strictly before `instant`
    pub fn balance_at(&self, account: AccountId, instant: DateTime<Utc>) -> Result<f64> {
        self.account(account)?;
        let registers = self.store.registers_before(instant)?;
        // Fold from +0.0: an empty f64 sum is -0.0
        Ok(registers
            .iter()
            .fold(0.0, |total, r| total + r.signed_value(account)))
    }

    // ========================================================================
    // REGISTERS
    // ========================================================================

    /// Record a register and write the assigned id back onto it
    pub fn add_register(&mut self, register: &mut Register) -> Result<RegisterId> {
        if register.is_persisted() {
            return Err(LedgerError::validation(format!(
                "register {} is already recorded",
                register.id.unwrap_or_default()
            )));
        }
        register.validate()?;

        let id = self.store.insert_register(register)?;
        register.id = Some(id);
        info!(
            register_id = id,
            value = register.value,
            from = ?register.from,
            to = ?register.to,
            "register added"
        );
        Ok(id)
    }

    /// Delete a recorded register; its id is cleared on success
    pub fn remove_register(&mut self, register: &mut Register) -> Result<()> {
        let id = match register.id {
            Some(id) if id > 0 => id,
            _ => return Err(LedgerError::validation("invalid financial register id")),
        };

        self.store.delete_register(id, &register.name)?;
        register.id = None;
        info!(register_id = id, "register removed");
        Ok(())
    }

    pub fn register_by_id(&self, id: RegisterId) -> Result<Register> {
        self.store.register_by_id(id)
    }

    /// Register plus its endpoint accounts; an endpoint that does not
    /// resolve is reported as None
    pub fn register_details(&self, id: RegisterId) -> Result<RegisterDetails> {
        let register = self.register_by_id(id)?;
        let from = self.resolve_endpoint(register.from)?;
        let to = self.resolve_endpoint(register.to)?;
        Ok(RegisterDetails { register, from, to })
    }

    fn resolve_endpoint(&self, id: Option<AccountId>) -> Result<Option<Account>> {
        let Some(id) = id else {
            return Ok(None);
        };
        match self.account(id) {
            Ok(account) => Ok(Some(account)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Registers with `start < time < end`, ordered by time
    pub fn registers_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Register>> {
        if start >= end {
            return Err(LedgerError::validation(format!(
                "range start {} is not before end {}",
                start, end
            )));
        }
        self.store.registers_between(start, end)
    }

    /// Same as `registers_between`, limited to registers touching `account`
    pub fn account_registers_between(
        &self,
        account: AccountId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Register>> {
        self.account(account)?;
        let mut registers = self.registers_between(start, end)?;
        registers.retain(|r| r.touches(account));
        Ok(registers)
    }
}

// ============================================================================
// TESTS
// ============================================================================

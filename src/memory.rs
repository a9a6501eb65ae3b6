// 🧠 In-memory ledger store
//
// Registers live in a single map keyed by register id. A BTreeMap from
// PeriodKey (UTC month of the register) to register ids narrows range scans
// to the months that can match; the exact timestamp filter runs after.
// BTreeMap iteration is ascending, so a scan can stop at the last key in range.

use crate::entities::{Account, AccountId, Register, RegisterId};
use crate::error::{LedgerError, Result};
use crate::store::LedgerStore;
use crate::temporal::{Period, PeriodKey};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::ops::RangeBounds;
use tracing::debug;

pub struct MemoryStore {
    accounts: BTreeMap<AccountId, Account>,
    registers: HashMap<RegisterId, Register>,
    periods: BTreeMap<PeriodKey, Vec<RegisterId>>,
    next_account_id: AccountId,
    next_register_id: RegisterId,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            accounts: BTreeMap::new(),
            registers: HashMap::new(),
            periods: BTreeMap::new(),
            next_account_id: 1,
            next_register_id: 1,
        }
    }

    fn bucket_key(time: &DateTime<Utc>) -> PeriodKey {
        Period::of(time).key()
    }

    /// Registers indexed under `keys` that pass `keep`, ordered by (time, id)
    fn scan<R, F>(&self, keys: R, keep: F) -> Vec<Register>
    where
        R: RangeBounds<PeriodKey>,
        F: Fn(&Register) -> bool,
    {
        let mut found: Vec<Register> = self
            .periods
            .range(keys)
            .flat_map(|(_, ids)| ids.iter())
            .filter_map(|id| self.registers.get(id))
            .filter(|r| keep(*r))
            .cloned()
            .collect();

        found.sort_by(|a, b| a.time.cmp(&b.time).then(a.id.cmp(&b.id)));
        found
    }

    /// Number of months that currently hold at least one register
    pub fn indexed_periods(&self) -> usize {
        self.periods.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for MemoryStore {
    fn create_schema(&mut self) -> Result<()> {
        Ok(())
    }

    fn drop_schema(&mut self) -> Result<()> {
        *self = MemoryStore::new();
        debug!("in-memory ledger wiped");
        Ok(())
    }

    fn insert_account(&mut self, name: &str, created_at: DateTime<Utc>) -> Result<AccountId> {
        let id = self.next_account_id;
        self.next_account_id += 1;
        self.accounts.insert(id, Account::new(id, name, created_at));
        Ok(id)
    }

    fn rename_account(&mut self, id: AccountId, name: &str) -> Result<()> {
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or_else(|| LedgerError::not_found("account", id))?;
        account.name = name.to_string();
        Ok(())
    }

    fn account_by_id(&self, id: AccountId) -> Result<Account> {
        self.accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("account", id))
    }

    fn account_by_name(&self, name: &str) -> Result<Account> {
        self.accounts
            .values()
            .find(|a| a.name == name)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("account", name))
    }

    fn all_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.accounts.values().cloned().collect())
    }

    fn insert_register(&mut self, register: &Register) -> Result<RegisterId> {
        for account in [register.from, register.to].into_iter().flatten() {
            if !self.accounts.contains_key(&account) {
                return Err(LedgerError::not_found("account", account));
            }
        }

        let id = self.next_register_id;
        self.next_register_id += 1;

        let mut stored = register.clone();
        stored.id = Some(id);

        self.periods
            .entry(Self::bucket_key(&stored.time))
            .or_default()
            .push(id);
        self.registers.insert(id, stored);

        debug!(register_id = id, "register indexed");
        Ok(id)
    }

    fn delete_register(&mut self, id: RegisterId, name: &str) -> Result<()> {
        let key = match self.registers.get(&id) {
            Some(r) if r.name == name => Self::bucket_key(&r.time),
            _ => return Err(LedgerError::not_found("register", id)),
        };

        self.registers.remove(&id);
        if let Some(ids) = self.periods.get_mut(&key) {
            ids.retain(|&r| r != id);
            if ids.is_empty() {
                self.periods.remove(&key);
            }
        }
        Ok(())
    }

    fn register_by_id(&self, id: RegisterId) -> Result<Register> {
        self.registers
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("register", id))
    }

    fn registers_before(&self, end: DateTime<Utc>) -> Result<Vec<Register>> {
        Ok(self.scan(..=Self::bucket_key(&end), |r| r.time < end))
    }

    fn registers_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Register>> {
        if start >= end {
            return Ok(Vec::new());
        }
        let keys = Self::bucket_key(&start)..=Self::bucket_key(&end);
        Ok(self.scan(keys, |r| r.time > start && r.time < end))
    }
}

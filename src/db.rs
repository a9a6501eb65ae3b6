use crate::config::Config;
use crate::entities::{Account, AccountId, Register, RegisterId};
use crate::error::{LedgerError, Result};
use crate::store::LedgerStore;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const ACCOUNT_COLUMNS: &str = "id, name, ctime";
const REGISTER_COLUMNS: &str = "id, name, time, val, fromaccount, toaccount";

/// Persistent ledger store on SQLite
///
/// One connection is opened at construction and held for the lifetime of
/// the store. Times are stored as Unix seconds; an absent register endpoint
/// is stored as account id 0.
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) the database file named by `config` and make sure
    /// the schema exists.
    pub fn open(config: &Config) -> Result<Self> {
        let path = config.db_path();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        // Enable WAL mode for crash recovery
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let mut store = SqliteStore {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.create_schema()?;
        info!(path = %path.display(), "opened ledger database");
        Ok(store)
    }

    /// Private database that disappears with the store
    pub fn open_in_memory() -> Result<Self> {
        let mut store = SqliteStore {
            conn: Connection::open_in_memory()?,
            path: None,
        };
        store.create_schema()?;
        Ok(store)
    }

    /// File backing this store, None when in memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn query_registers(
        &self,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Register>> {
        let sql = format!(
            "SELECT {} FROM registers WHERE {} ORDER BY time, id",
            REGISTER_COLUMNS, filter
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let registers = stmt
            .query_map(params, register_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(registers)
    }

    fn account_exists(conn: &Connection, id: AccountId) -> Result<bool> {
        let found = conn
            .query_row("SELECT 1 FROM accounts WHERE id = ?1", [id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }
}

impl LedgerStore for SqliteStore {
    fn create_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                ctime INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS registers (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                time INTEGER NOT NULL,
                val REAL NOT NULL,
                fromaccount INTEGER NOT NULL DEFAULT 0,
                toaccount INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_registers_time ON registers(time);
            CREATE INDEX IF NOT EXISTS idx_accounts_name ON accounts(name);",
        )?;
        debug!("ledger schema ensured");
        Ok(())
    }

    fn drop_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "DROP TABLE IF EXISTS accounts;
             DROP TABLE IF EXISTS registers;",
        )?;
        info!("ledger tables dropped");
        Ok(())
    }

    fn insert_account(&mut self, name: &str, created_at: DateTime<Utc>) -> Result<AccountId> {
        self.conn.execute(
            "INSERT INTO accounts (name, ctime) VALUES (?1, ?2)",
            params![name, created_at.timestamp()],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(account_id = id, name, "account inserted");
        Ok(id)
    }

    fn rename_account(&mut self, id: AccountId, name: &str) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE accounts SET name = ?1 WHERE id = ?2",
            params![name, id],
        )?;
        if changed == 0 {
            return Err(LedgerError::not_found("account", id));
        }
        Ok(())
    }

    fn account_by_id(&self, id: AccountId) -> Result<Account> {
        let sql = format!("SELECT {} FROM accounts WHERE id = ?1", ACCOUNT_COLUMNS);
        self.conn
            .query_row(&sql, [id], account_from_row)
            .optional()?
            .ok_or_else(|| LedgerError::not_found("account", id))
    }

    fn account_by_name(&self, name: &str) -> Result<Account> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE name = ?1 ORDER BY id LIMIT 1",
            ACCOUNT_COLUMNS
        );
        self.conn
            .query_row(&sql, [name], account_from_row)
            .optional()?
            .ok_or_else(|| LedgerError::not_found("account", name))
    }

    fn all_accounts(&self) -> Result<Vec<Account>> {
        let sql = format!("SELECT {} FROM accounts ORDER BY id", ACCOUNT_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let accounts = stmt
            .query_map([], account_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(accounts)
    }

    fn insert_register(&mut self, register: &Register) -> Result<RegisterId> {
        // Endpoint checks and the insert commit together or not at all
        let tx = self.conn.transaction()?;

        for account in [register.from, register.to].into_iter().flatten() {
            if !Self::account_exists(&tx, account)? {
                return Err(LedgerError::not_found("account", account));
            }
        }

        tx.execute(
            "INSERT INTO registers (name, time, val, fromaccount, toaccount)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                register.name,
                register.time.timestamp(),
                register.value,
                register.from.unwrap_or(0),
                register.to.unwrap_or(0),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!(register_id = id, value = register.value, "register inserted");
        Ok(id)
    }

    fn delete_register(&mut self, id: RegisterId, name: &str) -> Result<()> {
        let deleted = self.conn.execute(
            "DELETE FROM registers WHERE id = ?1 AND name = ?2",
            params![id, name],
        )?;
        if deleted == 0 {
            return Err(LedgerError::not_found("register", id));
        }
        debug!(register_id = id, "register deleted");
        Ok(())
    }

    fn register_by_id(&self, id: RegisterId) -> Result<Register> {
        let sql = format!("SELECT {} FROM registers WHERE id = ?1", REGISTER_COLUMNS);
        self.conn
            .query_row(&sql, [id], register_from_row)
            .optional()?
            .ok_or_else(|| LedgerError::not_found("register", id))
    }

    fn registers_before(&self, end: DateTime<Utc>) -> Result<Vec<Register>> {
        self.query_registers("time < ?1", [exclusive_end_secs(&end)])
    }

    fn registers_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Register>> {
        self.query_registers(
            "time > ?1 AND time < ?2",
            [start.timestamp(), exclusive_end_secs(&end)],
        )
    }
}

/// Whole-second bound with the same meaning as `time < end`: stored times
/// are whole seconds, so a fractional `end` rounds up
fn exclusive_end_secs(end: &DateTime<Utc>) -> i64 {
    if end.timestamp_subsec_nanos() > 0 {
        end.timestamp() + 1
    } else {
        end.timestamp()
    }
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let secs: i64 = row.get(idx)?;
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs))
}

fn endpoint(id: AccountId) -> Option<AccountId> {
    (id > 0).then_some(id)
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: timestamp_column(row, 2)?,
    })
}

fn register_from_row(row: &Row<'_>) -> rusqlite::Result<Register> {
    Ok(Register {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        time: timestamp_column(row, 2)?,
        value: row.get(3)?,
        from: endpoint(row.get(4)?),
        to: endpoint(row.get(5)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn count_tables(store: &SqliteStore) -> i64 {
        store
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name IN ('accounts', 'registers')",
                [],
                |row| row.get(0),
            )
            .unwrap()
    }

    /// Temp database file that is removed (with its WAL side files) on drop
    struct TempDb(PathBuf);

    impl TempDb {
        fn new(tag: &str) -> Self {
            let path = std::env::temp_dir()
                .join(format!("clinancial-{}-{}", std::process::id(), tag))
                .join("ledger.db");
            let _ = std::fs::remove_dir_all(path.parent().unwrap());
            TempDb(path)
        }
    }

    impl Drop for TempDb {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(self.0.parent().unwrap());
        }
    }

    #[test]
    fn test_create_schema_is_idempotent() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.insert_account("Wallet", at(1_000)).unwrap();

        store.create_schema().unwrap();
        store.create_schema().unwrap();

        assert_eq!(count_tables(&store), 2);
        assert_eq!(store.all_accounts().unwrap().len(), 1);
    }

    #[test]
    fn test_drop_schema_wipes_everything() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.insert_account("Wallet", at(1_000)).unwrap();

        store.drop_schema().unwrap();
        assert_eq!(count_tables(&store), 0);

        store.create_schema().unwrap();
        assert!(store.all_accounts().unwrap().is_empty());
    }

    #[test]
    fn test_account_round_trip() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let id = store.insert_account("Account1", at(1_483_228_800)).unwrap();

        let by_id = store.account_by_id(id).unwrap();
        let by_name = store.account_by_name("Account1").unwrap();

        assert_eq!(by_id, by_name);
        assert_eq!(by_id.id, id);
        assert_eq!(by_id.name, "Account1");
        assert_eq!(by_id.created_at, at(1_483_228_800));
    }

    #[test]
    fn test_name_collision_first_match_wins() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let first = store.insert_account("Dup", at(1)).unwrap();
        store.insert_account("Dup", at(2)).unwrap();

        assert_eq!(store.account_by_name("Dup").unwrap().id, first);
    }

    #[test]
    fn test_missing_account_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.account_by_id(42).unwrap_err().is_not_found());
        assert!(store.account_by_name("nobody").unwrap_err().is_not_found());
    }

    #[test]
    fn test_rename_account() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let id = store.insert_account("Old", at(1)).unwrap();

        store.rename_account(id, "New").unwrap();
        assert_eq!(store.account_by_id(id).unwrap().name, "New");
        assert!(store.rename_account(99, "x").unwrap_err().is_not_found());
    }

    #[test]
    fn test_register_with_absent_endpoint() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let a = store.insert_account("A", at(1)).unwrap();

        let salary = Register::new("Salary", 100.0, at(5_000)).to_account(a);
        let id = store.insert_register(&salary).unwrap();

        let loaded = store.register_by_id(id).unwrap();
        assert_eq!(loaded.id, Some(id));
        assert_eq!(loaded.from, None);
        assert_eq!(loaded.to, Some(a));
        assert_eq!(loaded.value, 100.0);
        assert_eq!(loaded.time, at(5_000));
    }

    #[test]
    fn test_insert_register_rejects_unknown_account_atomically() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let a = store.insert_account("A", at(1)).unwrap();

        let bad = Register::new("Ghost", 10.0, at(5_000))
            .from_account(a)
            .to_account(77);
        assert!(store.insert_register(&bad).unwrap_err().is_not_found());
        assert!(store.registers_before(at(10_000)).unwrap().is_empty());
    }

    #[test]
    fn test_delete_register_matches_id_and_name() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let id = store
            .insert_register(&Register::new("Coffee", 3.5, at(100)))
            .unwrap();

        assert!(store.delete_register(id, "Tea").unwrap_err().is_not_found());
        store.delete_register(id, "Coffee").unwrap();
        assert!(store.register_by_id(id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_range_queries_are_exclusive_and_ordered() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let late = store.insert_register(&Register::new("late", 1.0, at(300))).unwrap();
        let early = store.insert_register(&Register::new("early", 1.0, at(200))).unwrap();
        store.insert_register(&Register::new("edge", 1.0, at(100))).unwrap();
        store.insert_register(&Register::new("edge", 1.0, at(400))).unwrap();

        let between = store.registers_between(at(100), at(400)).unwrap();
        let ids: Vec<_> = between.iter().map(|r| r.id.unwrap()).collect();
        assert_eq!(ids, vec![early, late]);

        assert_eq!(store.registers_before(at(300)).unwrap().len(), 2);
    }

    #[test]
    fn test_fractional_end_bound_keeps_whole_second_register() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.insert_register(&Register::new("on the second", 1.0, at(300))).unwrap();

        let just_after = Utc.timestamp_opt(300, 500_000_000).unwrap();
        let just_before = Utc.timestamp_opt(299, 500_000_000).unwrap();
        assert_eq!(store.registers_before(just_after).unwrap().len(), 1);
        assert!(store.registers_before(just_before).unwrap().is_empty());
        assert_eq!(store.registers_between(just_before, just_after).unwrap().len(), 1);
        assert!(store.registers_between(at(200), just_before).unwrap().is_empty());
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let first = TempDb::new("reopen-a");
        let second = TempDb::new("reopen-b");

        let id = {
            let mut store = SqliteStore::open(&Config::with_path(&first.0)).unwrap();
            assert_eq!(store.path(), Some(first.0.as_path()));
            store.insert_account("Persisted", at(10)).unwrap()
        };

        // Reopening runs create_schema again without touching the data
        let store = SqliteStore::open(&Config::with_path(&first.0)).unwrap();
        assert_eq!(store.account_by_id(id).unwrap().name, "Persisted");

        // A different path is a different ledger
        let other = SqliteStore::open(&Config::with_path(&second.0)).unwrap();
        assert!(other.all_accounts().unwrap().is_empty());
    }
}

// CSV export of registers
//
// One row per register, endpoints written as id + current account name.
// Absent endpoints leave both columns empty.

use crate::entities::{Account, AccountId, Register, RegisterId};
use crate::error::Result;
use crate::ledger::Ledger;
use crate::store::LedgerStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
struct RegisterRow<'a> {
    id: Option<RegisterId>,
    time: String,
    name: &'a str,
    value: f64,
    from_id: Option<AccountId>,
    from_name: Option<String>,
    to_id: Option<AccountId>,
    to_name: Option<String>,
}

/// Write `registers` as CSV, returning the number of rows written
pub fn write_registers<S, W>(ledger: &Ledger<S>, registers: &[Register], writer: W) -> Result<usize>
where
    S: LedgerStore,
    W: Write,
{
    let mut wtr = csv::Writer::from_writer(writer);
    let mut names: HashMap<AccountId, Option<String>> = HashMap::new();

    let mut lookup = |id: Option<AccountId>| -> Result<Option<String>> {
        let Some(id) = id else {
            return Ok(None);
        };
        if let Some(cached) = names.get(&id) {
            return Ok(cached.clone());
        }
        let name = match ledger.account(id) {
            Ok(Account { name, .. }) => Some(name),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };
        names.insert(id, name.clone());
        Ok(name)
    };

    for register in registers {
        let row = RegisterRow {
            id: register.id,
            time: register.time.to_rfc3339(),
            name: &register.name,
            value: register.value,
            from_id: register.from,
            from_name: lookup(register.from)?,
            to_id: register.to,
            to_name: lookup(register.to)?,
        };
        wtr.serialize(row)?;
    }

    wtr.flush()?;
    Ok(registers.len())
}

/// Export registers with `start < time < end` to a CSV file at `path`
pub fn export_registers<S: LedgerStore>(
    ledger: &Ledger<S>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    path: &Path,
) -> Result<usize> {
    let registers = ledger.registers_between(start, end)?;
    let file = std::fs::File::create(path)?;
    let written = write_registers(ledger, &registers, file)?;
    tracing::info!(rows = written, path = %path.display(), "registers exported");
    Ok(written)
}

// Command dispatcher: clap definitions and one handler per subcommand.
// Handlers only talk to the library through `Ledger`.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use clinancial::{
    export_registers, Account, AccountRef, Config, Ledger, LedgerError, LedgerStore, Period,
    Register, RegisterId,
};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clinancial", version, about = "clinancial - a command-line financial manager")]
pub struct Cli {
    /// Database file (overrides CLINANCIAL_DB)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the database tables if they do not exist
    Init,
    /// Drop every account and register
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Create a new account
    CreateAccount {
        name: String,
    },
    /// List all accounts
    ListAccounts {
        #[arg(long)]
        json: bool,
    },
    /// Change an account's name
    RenameAccount {
        /// Account id or name
        account: AccountRef,
        name: String,
    },
    /// Accounts cannot be deleted; kept for compatibility
    DeleteAccount {
        account: AccountRef,
    },
    /// Balance of an account at the end of a month
    Balance {
        /// Account id or name
        account: AccountRef,
        /// Month 1-12 (default: current)
        #[arg(long)]
        month: Option<u32>,
        /// Year (default: current)
        #[arg(long)]
        year: Option<i32>,
    },
    /// Record a transaction between two accounts
    AddRegister(AddRegisterArgs),
    /// Delete a recorded transaction
    RemoveRegister {
        id: RegisterId,
        #[arg(long)]
        yes: bool,
    },
    /// Show one transaction
    ShowRegister {
        id: RegisterId,
        #[arg(long)]
        json: bool,
    },
    /// List transactions strictly between two dates
    Registers {
        #[command(flatten)]
        range: DateRange,
        /// Only transactions touching this account
        #[arg(long)]
        account: Option<AccountRef>,
        #[arg(long)]
        json: bool,
    },
    /// Write transactions strictly between two dates to a CSV file
    Export {
        #[command(flatten)]
        range: DateRange,
        file: PathBuf,
    },
}

#[derive(Args)]
pub struct AddRegisterArgs {
    /// Description, e.g. 'Rent'
    #[arg(long)]
    pub name: String,
    /// Positive amount
    #[arg(long)]
    pub value: f64,
    /// Debited account (omit for money coming from outside)
    #[arg(long)]
    pub from: Option<AccountRef>,
    /// Credited account (omit for money leaving)
    #[arg(long)]
    pub to: Option<AccountRef>,
    /// Date YYYY-MM-DD, stamped at 12:00 local (default: now)
    #[arg(long)]
    pub date: Option<NaiveDate>,
    /// Skip the confirmation prompt
    #[arg(long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct DateRange {
    /// Start date YYYY-MM-DD (exclusive)
    #[arg(long)]
    pub start: NaiveDate,
    /// End date YYYY-MM-DD (exclusive)
    #[arg(long)]
    pub end: NaiveDate,
}

impl DateRange {
    fn bounds(&self) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        Ok((
            local_instant(self.start, 0)?,
            local_instant(self.end, 0)?,
        ))
    }
}

pub fn dispatch<S: LedgerStore>(
    ledger: &mut Ledger<S>,
    config: &Config,
    command: Command,
) -> Result<()> {
    match command {
        Command::Init => {
            println!("✓ Database ready at {}", config.db_path().display());
        }
        Command::Reset { yes } => {
            if yes || prompt_yes_no("Delete ALL accounts and registers? [y/N] ")? {
                ledger.reset()?;
                println!("✓ Ledger wiped");
            } else {
                println!("Aborted");
            }
        }
        Command::CreateAccount { name } => {
            let account = ledger.create_account(&name)?;
            println!("✓ Created account {}", account);
        }
        Command::ListAccounts { json } => list_accounts(ledger, json)?,
        Command::RenameAccount { account, name } => {
            let current = find_account(ledger, &account)?;
            let renamed = ledger.rename_account(current.id, &name)?;
            println!("✓ Renamed {} to {}", current, renamed.name);
        }
        Command::DeleteAccount { account } => {
            let account = find_account(ledger, &account)?;
            ledger.delete_account(account.id)?;
            println!("Account deletion is not supported; {} left in place", account);
        }
        Command::Balance {
            account,
            month,
            year,
        } => {
            let account = find_account(ledger, &account)?;
            let current = Period::current();
            let period = Period::new(year.unwrap_or(current.year), month.unwrap_or(current.month))?;
            let balance = ledger.balance(account.id, period.month, period.year)?;
            println!("{} balance at end of {}: {:.2}", account, period, balance);
        }
        Command::AddRegister(args) => add_register(ledger, args)?,
        Command::RemoveRegister { id, yes } => {
            let mut register = ledger.register_by_id(id)?;
            println!("{}", describe(&register));
            if yes || prompt_yes_no("Remove this register? [y/N] ")? {
                ledger.remove_register(&mut register)?;
                println!("✓ Removed register #{}", id);
            } else {
                println!("Aborted");
            }
        }
        Command::ShowRegister { id, json } => {
            let details = ledger.register_details(id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&details)?);
            } else {
                println!("{}", describe(&details.register));
                println!("  from: {}", endpoint_label(details.from.as_ref()));
                println!("  to:   {}", endpoint_label(details.to.as_ref()));
            }
        }
        Command::Registers {
            range,
            account,
            json,
        } => {
            let (start, end) = range.bounds()?;
            let (registers, perspective) = match account {
                Some(reference) => {
                    let account = find_account(ledger, &reference)?;
                    (
                        ledger.account_registers_between(account.id, start, end)?,
                        Some(account.id),
                    )
                }
                None => (ledger.registers_between(start, end)?, None),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&registers)?);
            } else if registers.is_empty() {
                println!("No registers between {} and {}", range.start, range.end);
            } else {
                for register in &registers {
                    match perspective {
                        Some(id) => println!(
                            "{}  [{:+.2}]",
                            describe(register),
                            register.signed_value(id)
                        ),
                        None => println!("{}", describe(register)),
                    }
                }
            }
        }
        Command::Export { range, file } => {
            let (start, end) = range.bounds()?;
            let written = export_registers(ledger, start, end, &file)
                .with_context(|| format!("failed to export to {}", file.display()))?;
            println!("✓ Exported {} registers to {}", written, file.display());
        }
    }

    Ok(())
}

fn list_accounts<S: LedgerStore>(ledger: &Ledger<S>, json: bool) -> Result<()> {
    let accounts = ledger.accounts()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&accounts)?);
        return Ok(());
    }

    if accounts.is_empty() {
        println!("No accounts yet. Create one with: clinancial create-account <name>");
        return Ok(());
    }

    println!("{:>5}  {:<30} {}", "ID", "NAME", "CREATED");
    for account in &accounts {
        println!(
            "{:>5}  {:<30} {}",
            account.id,
            account.name,
            account.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn add_register<S: LedgerStore>(ledger: &mut Ledger<S>, args: AddRegisterArgs) -> Result<()> {
    let from = match &args.from {
        Some(reference) => Some(find_account(ledger, reference)?),
        None => None,
    };
    let to = match &args.to {
        Some(reference) => Some(find_account(ledger, reference)?),
        None => None,
    };

    let time = match args.date {
        Some(date) => local_instant(date, 12)?,
        None => Utc::now(),
    };

    let mut register = Register::new(args.name, args.value, time);
    register.from = from.as_ref().map(|a| a.id);
    register.to = to.as_ref().map(|a| a.id);
    register.validate()?;

    println!("New register: {} {:.2}", register.name, register.value);
    println!("  from: {}", endpoint_label(from.as_ref()));
    println!("  to:   {}", endpoint_label(to.as_ref()));
    println!("  on:   {}", register.time.with_timezone(&Local).format("%Y-%m-%d %H:%M"));

    if !args.yes && !prompt_yes_no("Add this register? [y/N] ")? {
        println!("Aborted");
        return Ok(());
    }

    let id = ledger.add_register(&mut register)?;
    println!("✓ Added register #{}", id);
    Ok(())
}

/// Look an account up, turning "no such account" into a hint
fn find_account<S: LedgerStore>(ledger: &Ledger<S>, reference: &AccountRef) -> Result<Account> {
    ledger.find_account(reference).map_err(|e| match e {
        LedgerError::NotFound { .. } => anyhow!(
            "no account {} (list them with: clinancial list-accounts)",
            reference
        ),
        other => other.into(),
    })
}

fn describe(register: &Register) -> String {
    format!(
        "#{} {} {:<24} {:>12.2}  {} -> {}",
        register.id.unwrap_or_default(),
        register.time.with_timezone(&Local).format("%Y-%m-%d"),
        register.name,
        register.value,
        id_label(register.from),
        id_label(register.to),
    )
}

fn id_label(id: Option<i64>) -> String {
    id.map(|id| format!("#{}", id))
        .unwrap_or_else(|| "(external)".to_string())
}

fn endpoint_label(account: Option<&Account>) -> String {
    account
        .map(|a| a.to_string())
        .unwrap_or_else(|| "(external)".to_string())
}

/// `hour`:00 on `date` in local time, as UTC
fn local_instant(date: NaiveDate, hour: u32) -> Result<DateTime<Utc>> {
    let naive = date
        .and_hms_opt(hour, 0, 0)
        .with_context(|| format!("invalid hour {}", hour))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("{} does not exist in the local time zone", naive))
}

fn prompt_yes_no(prompt: &str) -> Result<bool> {
    eprint!("{prompt}");
    io::stderr().flush().ok();
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(matches!(
        line.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

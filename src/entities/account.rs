// 💳 Account Entity - a named money holder
//
// Identity is the numeric id assigned by the store on creation. The name can
// change; the creation timestamp never does. An account does not own its
// registers: its balance is derived from the registers that reference its id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type AccountId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Assigned by the store, never 0
    pub id: AccountId,

    pub name: String,

    /// Creation time, second precision (that is what the store keeps)
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(id: AccountId, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Account {
            id,
            name: name.into(),
            created_at,
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id, self.name)
    }
}

// ============================================================================
// ACCOUNT REFERENCE
// ============================================================================

/// How a caller names an account: by id or by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountRef {
    Id(AccountId),
    Name(String),
}

impl FromStr for AccountRef {
    type Err = std::convert::Infallible;

    /// Digits are an id, anything else is a name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.parse::<AccountId>() {
            Ok(id) => Ok(AccountRef::Id(id)),
            Err(_) => Ok(AccountRef::Name(trimmed.to_string())),
        }
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountRef::Id(id) => write!(f, "#{}", id),
            AccountRef::Name(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_ref_parsing() {
        assert_eq!("12".parse::<AccountRef>().unwrap(), AccountRef::Id(12));
        assert_eq!(
            " Wallet ".parse::<AccountRef>().unwrap(),
            AccountRef::Name("Wallet".to_string())
        );
        assert_eq!(
            "Account1".parse::<AccountRef>().unwrap(),
            AccountRef::Name("Account1".to_string())
        );
    }

    #[test]
    fn test_account_display() {
        let account = Account::new(3, "Savings", Utc::now());
        assert_eq!(account.to_string(), "#3 Savings");
    }
}

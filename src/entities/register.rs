// 🧾 Financial Register - one transaction moving value between two accounts
//
// The value is always a positive magnitude. Its sign depends on who asks:
// the `from` account is debited, the `to` account is credited. Either side
// may be absent (money entering or leaving the tracked world).

use super::account::{Account, AccountId};
use crate::error::{LedgerError, Result};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

pub type RegisterId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Register {
    /// None until the store assigns one
    pub id: Option<RegisterId>,

    pub name: String,

    pub time: DateTime<Utc>,

    pub value: f64,

    /// Debited account
    pub from: Option<AccountId>,

    /// Credited account
    pub to: Option<AccountId>,
}

impl Register {
    /// Unpersisted register with no endpoints; the time is kept at second
    /// precision, the resolution the store persists.
    pub fn new(name: impl Into<String>, value: f64, time: DateTime<Utc>) -> Self {
        Register {
            id: None,
            name: name.into(),
            time: time.trunc_subsecs(0),
            value,
            from: None,
            to: None,
        }
    }

    pub fn from_account(mut self, account: AccountId) -> Self {
        self.from = Some(account);
        self
    }

    pub fn to_account(mut self, account: AccountId) -> Self {
        self.to = Some(account);
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn touches(&self, account: AccountId) -> bool {
        self.from == Some(account) || self.to == Some(account)
    }

    /// Contribution of this register to `account`'s balance
    pub fn signed_value(&self, account: AccountId) -> f64 {
        if self.from == Some(account) {
            -self.value
        } else if self.to == Some(account) {
            self.value
        } else {
            0.0
        }
    }

    /// Reject registers the ledger refuses to record
    pub fn validate(&self) -> Result<()> {
        if !self.value.is_finite() || self.value <= 0.0 {
            return Err(LedgerError::validation(format!(
                "register value must be a positive amount, got {}",
                self.value
            )));
        }

        for id in [self.from, self.to].into_iter().flatten() {
            if id <= 0 {
                return Err(LedgerError::validation(format!(
                    "invalid account id {} on register",
                    id
                )));
            }
        }

        if self.from.is_some() && self.from == self.to {
            return Err(LedgerError::validation(
                "register cannot move value from an account to itself",
            ));
        }

        Ok(())
    }
}

/// A register with its endpoint accounts looked up. An endpoint that no
/// longer resolves is `None` rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterDetails {
    pub register: Register,
    pub from: Option<Account>,
    pub to: Option<Account>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Register {
        Register::new("Rent", 50.0, Utc::now())
            .from_account(2)
            .to_account(1)
    }

    #[test]
    fn test_sign_convention() {
        let reg = sample();
        assert_eq!(reg.signed_value(1), 50.0);
        assert_eq!(reg.signed_value(2), -50.0);
        assert_eq!(reg.signed_value(3), 0.0);
        assert!(reg.touches(1) && reg.touches(2) && !reg.touches(3));
    }

    #[test]
    fn test_time_truncated_to_seconds() {
        let t = Utc.timestamp_opt(1_500_000_000, 999_000_000).unwrap();
        let reg = Register::new("x", 1.0, t);
        assert_eq!(reg.time.timestamp_subsec_nanos(), 0);
        assert_eq!(reg.time.timestamp(), 1_500_000_000);
    }

    #[test]
    fn test_validation() {
        assert!(sample().validate().is_ok());
        assert!(Register::new("open", 10.0, Utc::now()).validate().is_ok());

        let negative = Register::new("neg", -1.0, Utc::now());
        assert!(negative.validate().unwrap_err().is_validation());

        let nan = Register::new("nan", f64::NAN, Utc::now());
        assert!(nan.validate().is_err());

        let zero = Register::new("zero", 0.0, Utc::now());
        assert!(zero.validate().is_err());

        let self_transfer = Register::new("loop", 5.0, Utc::now())
            .from_account(1)
            .to_account(1);
        assert!(self_transfer.validate().is_err());

        let bad_id = Register::new("bad", 5.0, Utc::now()).to_account(0);
        assert!(bad_id.validate().is_err());
    }

    #[test]
    fn test_new_register_is_not_persisted() {
        assert!(!sample().is_persisted());
    }
}

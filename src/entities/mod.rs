// Entity Models
//
// Accounts and registers refer to each other by id only. Registers live in
// one store keyed by register id; an account's view of them is a query.

pub mod account;
pub mod register;

pub use account::{Account, AccountId, AccountRef};
pub use register::{Register, RegisterDetails, RegisterId};

pub mod account;
pub mod amount;
pub mod entry;
pub mod render;

pub use account::{AccountKind, LedgerError};
pub use amount::{Amount, CostBasis};
pub use entry::{LedgerEntry, Posting};

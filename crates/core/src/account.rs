use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::amount::Amount;

/// The five standard root segments of a colon-separated account path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    Assets,
    Liabilities,
    Equity,
    Income,
    Expenses,
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountKind::Assets => write!(f, "Assets"),
            AccountKind::Liabilities => write!(f, "Liabilities"),
            AccountKind::Equity => write!(f, "Equity"),
            AccountKind::Income => write!(f, "Income"),
            AccountKind::Expenses => write!(f, "Expenses"),
        }
    }
}

/// Root segment of an account path, e.g. `"Expenses"` for `Expenses:Food`.
pub fn root(path: &str) -> &str {
    path.split(':').next().unwrap_or("")
}

pub fn kind_of(path: &str) -> Option<AccountKind> {
    match root(path) {
        "Assets" => Some(AccountKind::Assets),
        "Liabilities" => Some(AccountKind::Liabilities),
        "Equity" => Some(AccountKind::Equity),
        "Income" => Some(AccountKind::Income),
        "Expenses" => Some(AccountKind::Expenses),
        _ => None,
    }
}

/// A path is valid when every segment is non-empty and the root is one of
/// the five standard kinds.
pub fn is_valid(path: &str) -> bool {
    kind_of(path).is_some() && path.split(':').all(|seg| !seg.is_empty())
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("entry does not balance in {currency}: residual {residual}")]
    Unbalanced { currency: String, residual: Amount },
    #[error("entry must have at least two postings")]
    TooFewPostings,
    #[error("entry has more than one amount-elided posting")]
    MultipleElidedPostings,
    #[error("invalid account path: {0}")]
    InvalidAccount(String),
}

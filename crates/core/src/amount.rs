use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Neg;

/// A signed quantity of a single commodity, e.g. `-28.50 RMB`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub number: Decimal,
    pub currency: String,
}

impl Amount {
    pub fn new(number: Decimal, currency: impl Into<String>) -> Self {
        Amount {
            number,
            currency: currency.into(),
        }
    }

    pub fn zero(currency: impl Into<String>) -> Self {
        Amount {
            number: Decimal::ZERO,
            currency: currency.into(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.number.is_zero()
    }

    pub fn abs(&self) -> Self {
        Amount {
            number: self.number.abs(),
            currency: self.currency.clone(),
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.currency)
    }
}

impl Neg for Amount {
    type Output = Self;
    fn neg(self) -> Self {
        Amount {
            number: -self.number,
            currency: self.currency,
        }
    }
}

/// Cost annotation on a foreign-denominated posting: the home-currency total
/// the posted units were exchanged for. Mirrors a total-cost spec in ledger
/// files (`{{717.50 RMB}}`), not a per-unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBasis {
    pub total: Amount,
}

impl CostBasis {
    pub fn total_of(number: Decimal, currency: impl Into<String>) -> Self {
        CostBasis {
            total: Amount::new(number, currency),
        }
    }
}

impl fmt::Display for CostBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{}}}}}", self.total)
    }
}

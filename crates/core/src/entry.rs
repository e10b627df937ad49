use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::account::{self, LedgerError};
use super::amount::{Amount, CostBasis};

/// One leg of a ledger entry. A `None` amount is an elided leg whose value
/// is left to the consuming ledger's auto-balancing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub account: String,
    pub amount: Option<Amount>,
    pub cost: Option<CostBasis>,
    pub meta: BTreeMap<String, String>,
}

impl Posting {
    pub fn new(account: impl Into<String>, amount: Amount) -> Self {
        Posting {
            account: account.into(),
            amount: Some(amount),
            cost: None,
            meta: BTreeMap::new(),
        }
    }

    pub fn elided(account: impl Into<String>) -> Self {
        Posting {
            account: account.into(),
            amount: None,
            cost: None,
            meta: BTreeMap::new(),
        }
    }

    pub fn with_cost(mut self, cost: CostBasis) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Contribution towards the entry's balance. A costed posting weighs in
    /// at its cost-basis total, signed like its posted units.
    pub fn weight(&self) -> Option<Amount> {
        let amount = self.amount.as_ref()?;
        match &self.cost {
            Some(cost) => {
                let number = if amount.number.is_sign_negative() {
                    -cost.total.number
                } else {
                    cost.total.number
                };
                Some(Amount::new(number, cost.total.currency.clone()))
            }
            None => Some(amount.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub date: NaiveDate,
    /// Posting/ledger date, present only when it differs from `date`.
    pub aux_date: Option<NaiveDate>,
    pub category: String,
    pub postings: Vec<Posting>,
}

impl LedgerEntry {
    /// Per-currency zero-sum check over explicit legs. An entry with exactly
    /// one elided leg passes by definition; more than one is malformed.
    pub fn check_balance(&self) -> Result<(), LedgerError> {
        if self.postings.len() < 2 {
            return Err(LedgerError::TooFewPostings);
        }
        let elided = self.postings.iter().filter(|p| p.amount.is_none()).count();
        if elided > 1 {
            return Err(LedgerError::MultipleElidedPostings);
        }
        if elided == 1 {
            return Ok(());
        }

        let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
        for posting in &self.postings {
            if let Some(weight) = posting.weight() {
                *totals.entry(weight.currency).or_default() += weight.number;
            }
        }
        for (currency, residual) in totals {
            if !residual.is_zero() {
                return Err(LedgerError::Unbalanced {
                    residual: Amount::new(residual, currency.clone()),
                    currency,
                });
            }
        }
        Ok(())
    }

    pub fn check_accounts(&self) -> Result<(), LedgerError> {
        for posting in &self.postings {
            if !account::is_valid(&posting.account) {
                return Err(LedgerError::InvalidAccount(posting.account.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(postings: Vec<Posting>) -> LedgerEntry {
        LedgerEntry {
            date: date(2023, 6, 15),
            aux_date: None,
            category: "Test".to_string(),
            postings,
        }
    }

    #[test]
    fn balanced_two_leg_entry() {
        let e = entry(vec![
            Posting::new("Expenses:Food", Amount::new(dec("28.00"), "RMB")),
            Posting::new("Liabilities:Card", Amount::new(dec("-28.00"), "RMB")),
        ]);
        assert!(e.check_balance().is_ok());
    }

    #[test]
    fn unbalanced_entry_reports_residual() {
        let e = entry(vec![
            Posting::new("Expenses:Food", Amount::new(dec("28.00"), "RMB")),
            Posting::new("Liabilities:Card", Amount::new(dec("-20.00"), "RMB")),
        ]);
        match e.check_balance() {
            Err(LedgerError::Unbalanced { residual, .. }) => {
                assert_eq!(residual.number, dec("8.00"));
            }
            other => panic!("expected Unbalanced, got {other:?}"),
        }
    }

    #[test]
    fn costed_leg_weighs_in_at_total() {
        // 40 SGD purchased for 210.00 RMB balances a -210.00 RMB leg.
        let e = entry(vec![
            Posting::new("Expenses:Food", Amount::new(dec("40.00"), "SGD"))
                .with_cost(CostBasis::total_of(dec("210.00"), "RMB")),
            Posting::new("Liabilities:Card", Amount::new(dec("-210.00"), "RMB")),
        ]);
        assert!(e.check_balance().is_ok());
    }

    #[test]
    fn negative_costed_leg_negates_total() {
        let weight = Posting::new("Expenses:Food", Amount::new(dec("-40.00"), "SGD"))
            .with_cost(CostBasis::total_of(dec("210.00"), "RMB"))
            .weight()
            .unwrap();
        assert_eq!(weight, Amount::new(dec("-210.00"), "RMB"));
    }

    #[test]
    fn single_elided_leg_passes() {
        let e = entry(vec![
            Posting::new("Expenses:Misc", Amount::new(dec("5.00"), "SGD")),
            Posting::elided("Assets:Bank:Checking"),
        ]);
        assert!(e.check_balance().is_ok());
    }

    #[test]
    fn two_elided_legs_rejected() {
        let e = entry(vec![
            Posting::elided("Expenses:Misc"),
            Posting::elided("Assets:Bank:Checking"),
        ]);
        assert!(matches!(
            e.check_balance(),
            Err(LedgerError::MultipleElidedPostings)
        ));
    }

    #[test]
    fn single_posting_rejected() {
        let e = entry(vec![Posting::new(
            "Expenses:Misc",
            Amount::new(dec("5.00"), "SGD"),
        )]);
        assert!(matches!(e.check_balance(), Err(LedgerError::TooFewPostings)));
    }

    #[test]
    fn check_accounts_flags_unknown_root() {
        let e = entry(vec![
            Posting::new("Spending:Food", Amount::new(dec("5.00"), "SGD")),
            Posting::elided("Assets:Bank:Checking"),
        ]);
        assert!(matches!(
            e.check_accounts(),
            Err(LedgerError::InvalidAccount(_))
        ));
    }
}

//! First-match-wins classification of raw transactions into posting sets.
//!
//! A rule set is an ordered list of named rules, each a predicate-plus-builder
//! closure over (raw transaction, posting builder). Rules are tried strictly
//! in declaration order and the first one returning a posting set wins, so
//! ordering encodes priority: a specific merchant rule must precede a generic
//! category rule that would also match. The last rule of every built-in set
//! always matches; running off the end is an internal defect, not a
//! per-record condition.

use regex::Regex;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use thiserror::Error;

use ledgest_core::{Amount, CostBasis, Posting};

use crate::csv::CsvTransaction;
use crate::email::EmailTransaction;

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("no classification rule matched; the default rule must always match")]
    NoRuleMatched,
    #[error("funding source {0:?} has no mapped account")]
    UnmappedFundingSource(String),
}

pub struct Rule<T, B> {
    name: &'static str,
    run: Box<dyn Fn(&T, &B) -> Option<Vec<Posting>> + Send + Sync>,
}

impl<T, B> Rule<T, B> {
    pub fn new(
        name: &'static str,
        run: impl Fn(&T, &B) -> Option<Vec<Posting>> + Send + Sync + 'static,
    ) -> Self {
        Rule {
            name,
            run: Box::new(run),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Category label shown on the ledger entry: underscores become spaces,
    /// first letter capitalized.
    pub fn category(&self) -> String {
        let spaced = self.name.replace('_', " ");
        let mut chars = spaced.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => spaced,
        }
    }
}

pub struct Classification {
    pub category: String,
    /// Destination legs only; the offsetting funding-source leg is added
    /// during aggregation.
    pub postings: Vec<Posting>,
}

pub struct RuleSet<T, B> {
    rules: Vec<Rule<T, B>>,
}

impl<T, B> RuleSet<T, B> {
    pub fn new(rules: Vec<Rule<T, B>>) -> Self {
        RuleSet { rules }
    }

    pub fn classify(&self, txn: &T, builder: &B) -> Result<Classification, ClassifyError> {
        for rule in &self.rules {
            if let Some(postings) = (rule.run)(txn, builder) {
                return Ok(Classification {
                    category: rule.category(),
                    postings,
                });
            }
        }
        Err(ClassifyError::NoRuleMatched)
    }
}

pub(crate) fn signed(magnitude: Decimal, is_withdrawal: bool) -> Decimal {
    if is_withdrawal {
        magnitude
    } else {
        -magnitude
    }
}

// ── Email format posting construction ─────────────────────────────────────

const HINT_US: &str = "US";
const CURRENCY_USD: &str = "USD";
const DEFAULT_FOREIGN_CURRENCY: &str = "SGD";

/// Builds postings for email-format transactions: home-currency legs, or
/// foreign-denominated legs with a cost basis when the statement carries a
/// distinct foreign magnitude.
pub struct EmailPostings {
    funding_map: BTreeMap<String, String>,
    home_currency: String,
}

impl EmailPostings {
    pub fn new(funding_map: BTreeMap<String, String>, home_currency: impl Into<String>) -> Self {
        EmailPostings {
            funding_map,
            home_currency: home_currency.into(),
        }
    }

    fn foreign_currency(&self, txn: &EmailTransaction) -> &'static str {
        if txn.foreign_hint == HINT_US {
            CURRENCY_USD
        } else {
            DEFAULT_FOREIGN_CURRENCY
        }
    }

    /// Destination leg carrying the transaction's full signed amount.
    pub fn dest_leg(&self, txn: &EmailTransaction, account: &str) -> Posting {
        match txn.foreign_amount {
            Some(foreign) if foreign != txn.amount => Posting::new(
                account,
                Amount::new(
                    signed(foreign, txn.is_withdrawal),
                    self.foreign_currency(txn),
                ),
            )
            .with_cost(CostBasis::total_of(txn.amount, self.home_currency.clone())),
            _ => Posting::new(
                account,
                Amount::new(
                    signed(txn.amount, txn.is_withdrawal),
                    self.home_currency.clone(),
                ),
            ),
        }
    }

    /// Destination leg with explicitly pinned units, costed at the
    /// transaction's home-currency total. Used for wallet top-ups where the
    /// purchased units are a fixed denomination.
    pub fn pinned_leg(
        &self,
        txn: &EmailTransaction,
        account: &str,
        number: Decimal,
        currency: &str,
    ) -> Posting {
        Posting::new(account, Amount::new(number, currency))
            .with_cost(CostBasis::total_of(txn.amount, self.home_currency.clone()))
    }

    pub fn offset_account(&self, txn: &EmailTransaction) -> Result<String, ClassifyError> {
        self.funding_map
            .get(&txn.funding_source)
            .cloned()
            .ok_or_else(|| ClassifyError::UnmappedFundingSource(txn.funding_source.clone()))
    }

    pub fn offset_amount(&self, txn: &EmailTransaction) -> Amount {
        Amount::new(
            -signed(txn.amount, txn.is_withdrawal),
            self.home_currency.clone(),
        )
    }
}

// ── CSV format posting construction ───────────────────────────────────────

/// Builds postings for CSV-format transactions. Single statement currency,
/// fixed home cash account offsetting every entry.
pub struct CsvPostings {
    cash_account: String,
    currency: String,
}

impl CsvPostings {
    pub fn new(cash_account: impl Into<String>, currency: impl Into<String>) -> Self {
        CsvPostings {
            cash_account: cash_account.into(),
            currency: currency.into(),
        }
    }

    pub fn dest_leg(&self, txn: &CsvTransaction, account: &str) -> Posting {
        Posting::new(
            account,
            Amount::new(signed(txn.amount, txn.is_withdrawal), self.currency.clone()),
        )
    }

    /// Split leg with a hard-coded sub-amount. Deliberately not derived from
    /// the transaction total; a mismatch between total and sum-of-splits is
    /// the funding leg's problem, not validated here.
    pub fn split_leg(&self, account: &str, number: Decimal) -> Posting {
        Posting::new(account, Amount::new(number, self.currency.clone()))
    }

    pub fn offset_account(&self) -> &str {
        &self.cash_account
    }
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern")
}

// ── Built-in rule sets ────────────────────────────────────────────────────

/// Rules for the email statement format, most specific first.
pub fn email_rules() -> RuleSet<EmailTransaction, EmailPostings> {
    let food = re(r"DELIVEROO");
    let grocery = re(r"NTUC|DOOKKI|WATSON|COLD STORAGE|Redmart");
    let grab = re(r"Grab Grab*");
    let cashback = re(r"返现|红包");
    let utility = re(r"SP DIGITAL");

    RuleSet::new(vec![
        Rule::new("food", move |txn: &EmailTransaction, b: &EmailPostings| {
            (txn.is_withdrawal && food.is_match(&txn.description))
                .then(|| vec![b.dest_leg(txn, "Expenses:Food")])
        }),
        Rule::new("grocery", move |txn: &EmailTransaction, b: &EmailPostings| {
            (txn.is_withdrawal && grocery.is_match(&txn.description))
                .then(|| vec![b.dest_leg(txn, "Expenses:Groceries")])
        }),
        Rule::new("grab", move |txn: &EmailTransaction, b: &EmailPostings| {
            if !(txn.is_withdrawal && grab.is_match(&txn.description)) {
                return None;
            }
            // A top-up in the 400..600 band buys a fixed 100 SGD wallet
            // denomination; anything else is an ordinary ride.
            if txn.amount > Decimal::from(400) && txn.amount < Decimal::from(600) {
                return Some(vec![b.pinned_leg(
                    txn,
                    "Assets:Wallet:Grab",
                    Decimal::from(100),
                    DEFAULT_FOREIGN_CURRENCY,
                )]);
            }
            Some(vec![b.dest_leg(txn, "Expenses:Transit")])
        }),
        Rule::new("cashback", move |txn: &EmailTransaction, b: &EmailPostings| {
            (!txn.is_withdrawal && cashback.is_match(&txn.description))
                .then(|| vec![b.dest_leg(txn, "Income:Cashback")])
        }),
        Rule::new("utility", move |txn: &EmailTransaction, b: &EmailPostings| {
            (txn.is_withdrawal && utility.is_match(&txn.description))
                .then(|| vec![b.dest_leg(txn, "Expenses:Utils")])
        }),
        Rule::new("default", |txn: &EmailTransaction, b: &EmailPostings| {
            let account = if txn.is_withdrawal {
                "Expenses:Misc"
            } else {
                "Income:Misc"
            };
            Some(vec![b.dest_leg(txn, account)])
        }),
    ])
}

/// Rules for the CSV statement format, most specific first.
pub fn csv_rules() -> RuleSet<CsvTransaction, CsvPostings> {
    let utils = re(r"SP SERVICES");
    let bus = re(r"BUS/MRT");
    let bubbletea = re(r"KOI|CHICHA SAN CHEN|HEYTEA");
    let tax = re(r"IRAS TAXS");
    let rent = re(r"Rent to");
    let tv_split = re(r"YOUTUBEPREMIUM");
    let tv = re(r"Netflix|NETFLIX");
    let invest_robo = re(r"RoboInvest");
    let invest_managed = re(r"ASIA WEALTH PLAT|Asia Wealth Plat");
    let salary_desc = re(r"SALARY.*GOOGLE");
    let salary_fop = re(r"SALARY");
    let interest = re(r"INTEREST");
    let gpay = re(r"OTHR GOOGLE PAY MENT");
    let dining = re(r"YIHE|KOUFU PTE");

    RuleSet::new(vec![
        Rule::new("utils", move |txn: &CsvTransaction, b: &CsvPostings| {
            (txn.is_withdrawal && utils.is_match(&txn.description))
                .then(|| vec![b.dest_leg(txn, "Expenses:Utils")])
        }),
        Rule::new("bus", move |txn: &CsvTransaction, b: &CsvPostings| {
            (txn.is_withdrawal && bus.is_match(&txn.description))
                .then(|| vec![b.dest_leg(txn, "Expenses:Transit:Public")])
        }),
        Rule::new("bubbletea", move |txn: &CsvTransaction, b: &CsvPostings| {
            (txn.is_withdrawal && bubbletea.is_match(&txn.description))
                .then(|| vec![b.dest_leg(txn, "Expenses:Drink")])
        }),
        Rule::new("tax", move |txn: &CsvTransaction, b: &CsvPostings| {
            (txn.is_withdrawal && tax.is_match(&txn.description))
                .then(|| vec![b.dest_leg(txn, "Expenses:Tax")])
        }),
        Rule::new("rent", move |txn: &CsvTransaction, b: &CsvPostings| {
            (txn.is_withdrawal && rent.is_match(&txn.description))
                .then(|| vec![b.dest_leg(txn, "Expenses:Rent")])
        }),
        Rule::new("tv", move |txn: &CsvTransaction, b: &CsvPostings| {
            if txn.is_withdrawal && tv_split.is_match(&txn.description) {
                // Family subscription: fixed split between own expense and
                // the share owed back, regardless of the charged total.
                return Some(vec![
                    b.split_leg("Expenses:Utils:Tv", Decimal::new(598, 2)),
                    b.split_leg("Assets:Debt:YtFamily", Decimal::from(12)),
                ]);
            }
            (txn.is_withdrawal && tv.is_match(&txn.description))
                .then(|| vec![b.dest_leg(txn, "Expenses:Utils:Tv")])
        }),
        Rule::new("invest", move |txn: &CsvTransaction, b: &CsvPostings| {
            if txn.is_withdrawal && invest_robo.is_match(&txn.description) {
                return Some(vec![b.dest_leg(txn, "Assets:Investment:Roboinvest")]);
            }
            (txn.is_withdrawal && invest_managed.is_match(&txn.description))
                .then(|| vec![b.dest_leg(txn, "Assets:Stashaway")])
        }),
        Rule::new("basic_income", move |txn: &CsvTransaction, b: &CsvPostings| {
            if !txn.is_withdrawal
                && (salary_desc.is_match(&txn.description) || salary_fop.is_match(&txn.fop))
            {
                return Some(vec![b.dest_leg(txn, "Income:Salary")]);
            }
            (!txn.is_withdrawal
                && (interest.is_match(&txn.fop) || interest.is_match(&txn.description)))
            .then(|| vec![b.dest_leg(txn, "Income:Bank:Interest")])
        }),
        Rule::new("gpay_reward", move |txn: &CsvTransaction, b: &CsvPostings| {
            (!txn.is_withdrawal && gpay.is_match(&txn.description))
                .then(|| vec![b.dest_leg(txn, "Income:Cashback:GPay")])
        }),
        Rule::new("dining", move |txn: &CsvTransaction, b: &CsvPostings| {
            (txn.is_withdrawal
                && (dining.is_match(&txn.description) || txn.amount > Decimal::from(30))
                && txn.amount < Decimal::from(300))
            .then(|| vec![b.dest_leg(txn, "Expenses:Food")])
        }),
        Rule::new("default", |txn: &CsvTransaction, b: &CsvPostings| {
            let account = if txn.is_withdrawal {
                "Expenses:Misc"
            } else {
                "Income:Misc"
            };
            Some(vec![b.dest_leg(txn, account)])
        }),
    ])
}

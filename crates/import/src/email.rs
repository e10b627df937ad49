//! Step-driven line scanner for the email-export statement format.
//!
//! Each transaction occupies a fixed 17-line block. The scanner keeps a step
//! cursor that every consumed line advances, blank or not; a fixed step → field
//! mapping decides what the current line populates, and step 16 is a finalize
//! sentinel regardless of its content. The statement carries no year, so the
//! caller supplies one.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

const STEP_TXN_DATE: usize = 0;
const STEP_LEDGER_DATE: usize = 2;
const STEP_DESCRIPTION: usize = 4;
const STEP_AMOUNT: usize = 6;
const STEP_FUNDING_SOURCE: usize = 8;
const STEP_FOREIGN_HINT: usize = 10;
const STEP_FOREIGN_AMOUNT: usize = 12;
const STEP_FINALIZE: usize = 16;

#[derive(Debug, Clone)]
pub struct EmailTransaction {
    pub transaction_date: NaiveDate,
    pub ledger_date: NaiveDate,
    pub funding_source: String,
    pub description: String,
    /// Home-currency magnitude, always non-negative; sign lives in
    /// `is_withdrawal`.
    pub amount: Decimal,
    /// Foreign-currency magnitude for foreign-denominated transactions.
    pub foreign_amount: Option<Decimal>,
    /// Short code narrowing which foreign currency was used, e.g. `US`.
    pub foreign_hint: String,
    pub is_withdrawal: bool,
    pub line_number: usize,
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: malformed MMDD date token {token:?}")]
    MalformedDate { line: usize, token: String },
    #[error("line {line}: malformed amount line {raw:?}")]
    MalformedAmount { line: usize, raw: String },
    #[error("record starting at line {line} truncated before the amount field")]
    Truncated { line: usize },
}

#[derive(Debug, Default)]
struct Draft {
    transaction_date: Option<NaiveDate>,
    ledger_date: Option<NaiveDate>,
    funding_source: String,
    description: String,
    amount: Option<Decimal>,
    foreign_amount: Option<Decimal>,
    foreign_hint: String,
    is_withdrawal: bool,
    line_number: usize,
}

/// Scanner state: the step cursor plus the record under construction.
/// `feed` is a function of (state, line) → (new state, optional record).
#[derive(Debug)]
pub struct LineScanner {
    year: i32,
    step: usize,
    draft: Draft,
    line_number: usize,
}

impl LineScanner {
    pub fn new(year: i32) -> Self {
        LineScanner {
            year,
            step: 0,
            draft: Draft::default(),
            line_number: 0,
        }
    }

    pub fn feed(&mut self, line: &str) -> Result<Option<EmailTransaction>, ScanError> {
        let lineno = self.line_number;
        self.line_number += 1;
        let line = line.trim();

        if self.step == STEP_FINALIZE {
            // Sentinel: finalize regardless of line content.
            return Ok(Some(self.take_record()?));
        }

        match self.step {
            STEP_TXN_DATE => self.draft.transaction_date = Some(self.parse_mmdd(line, lineno)?),
            STEP_LEDGER_DATE => self.draft.ledger_date = Some(self.parse_mmdd(line, lineno)?),
            STEP_DESCRIPTION => self.draft.description = line.to_string(),
            STEP_AMOUNT => {
                let (is_withdrawal, amount) = parse_amount_line(line, lineno)?;
                self.draft.is_withdrawal = is_withdrawal;
                self.draft.amount = Some(amount);
            }
            STEP_FUNDING_SOURCE => self.draft.funding_source = line.to_string(),
            STEP_FOREIGN_HINT => {
                if !line.is_empty() {
                    self.draft.foreign_hint = line.to_string();
                }
            }
            STEP_FOREIGN_AMOUNT => {
                if !line.is_empty() {
                    self.draft.foreign_amount = Some(parse_magnitude(line, lineno)?);
                }
            }
            _ => {}
        }
        self.step += 1;
        Ok(None)
    }

    /// End of input. A partially-built record is still emitted, provided it
    /// got far enough to carry an amount.
    pub fn finish(mut self) -> Result<Option<EmailTransaction>, ScanError> {
        if self.step == 0 {
            return Ok(None);
        }
        tracing::debug!(
            "input ended mid-record at step {}, emitting partial record",
            self.step
        );
        Ok(Some(self.take_record()?))
    }

    fn take_record(&mut self) -> Result<EmailTransaction, ScanError> {
        let draft = std::mem::take(&mut self.draft);
        self.step = 0;
        self.draft.line_number = self.line_number;

        let start = draft.line_number;
        let transaction_date = draft
            .transaction_date
            .ok_or(ScanError::Truncated { line: start })?;
        let amount = draft.amount.ok_or(ScanError::Truncated { line: start })?;
        Ok(EmailTransaction {
            transaction_date,
            ledger_date: draft.ledger_date.unwrap_or(transaction_date),
            funding_source: draft.funding_source,
            description: draft.description,
            amount,
            foreign_amount: draft.foreign_amount,
            foreign_hint: draft.foreign_hint,
            is_withdrawal: draft.is_withdrawal,
            line_number: start,
        })
    }

    fn parse_mmdd(&self, token: &str, line: usize) -> Result<NaiveDate, ScanError> {
        let malformed = || ScanError::MalformedDate {
            line,
            token: token.to_string(),
        };
        if token.len() != 4 || !token.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let month: u32 = token[..2].parse().map_err(|_| malformed())?;
        let day: u32 = token[2..].parse().map_err(|_| malformed())?;
        NaiveDate::from_ymd_opt(self.year, month, day).ok_or_else(malformed)
    }
}

/// Sign and magnitude from the amount line. The character at offset 1 carries
/// the sign (`-` marks a deposit); the magnitude is the numeric token after
/// the first space, thousands separators stripped.
fn parse_amount_line(line: &str, lineno: usize) -> Result<(bool, Decimal), ScanError> {
    let malformed = || ScanError::MalformedAmount {
        line: lineno,
        raw: line.to_string(),
    };
    let sign = line.chars().nth(1).ok_or_else(malformed)?;
    let is_withdrawal = sign != '-';
    let token = line.split(' ').nth(1).ok_or_else(malformed)?;
    let amount = Decimal::from_str(&token.replace(',', ""))
        .map_err(|_| malformed())?
        .abs();
    Ok((is_withdrawal, amount))
}

fn parse_magnitude(line: &str, lineno: usize) -> Result<Decimal, ScanError> {
    Decimal::from_str(&line.replace(',', ""))
        .map(|d| d.abs())
        .map_err(|_| ScanError::MalformedAmount {
            line: lineno,
            raw: line.to_string(),
        })
}

/// Scans a whole statement, one record per 17-line block, in input order.
pub fn scan<R: BufRead>(reader: R, year: i32) -> Result<Vec<EmailTransaction>, ScanError> {
    let mut scanner = LineScanner::new(year);
    let mut records = Vec::new();
    for line in reader.lines() {
        if let Some(record) = scanner.feed(&line?)? {
            records.push(record);
        }
    }
    if let Some(record) = scanner.finish()? {
        records.push(record);
    }
    Ok(records)
}

//! Row-driven continuation scanner for the tabular CSV statement export.
//!
//! Fixed columns: [0] date `DD/MM/YYYY`, [2] type/description, [3] debit,
//! [4] credit. A row with a parsable date starts a new transaction; a row
//! with an empty date field is a continuation that replaces the pending
//! transaction's description. Rows whose date field is non-empty but does
//! not parse are dropped — an inherited leniency, kept but logged, since it
//! also swallows genuinely malformed data rows.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::io::Read;
use std::str::FromStr;
use thiserror::Error;

const COL_DATE: usize = 0;
const COL_DESCRIPTION: usize = 2;
const COL_DEBIT: usize = 3;
const COL_CREDIT: usize = 4;

const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone)]
pub struct CsvTransaction {
    /// Date as stated on the statement; may be a posting date rather than
    /// the true transaction date (see the normalizer).
    pub transaction_date: NaiveDate,
    /// Transaction-type code, e.g. `DEBIT PURCHASE`.
    pub fop: String,
    pub description: String,
    /// Non-negative magnitude; sign lives in `is_withdrawal`.
    pub amount: Decimal,
    pub is_withdrawal: bool,
    pub line_number: usize,
}

#[derive(Error, Debug)]
pub enum CsvScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {line}: malformed amount {raw:?}")]
    MalformedAmount { line: usize, raw: String },
}

/// Scanner state: the transaction still waiting for possible continuation
/// rows.
#[derive(Debug, Default)]
pub struct RowScanner {
    pending: Option<CsvTransaction>,
}

impl RowScanner {
    pub fn new() -> Self {
        RowScanner::default()
    }

    /// Consumes one row; returns the previously pending transaction when the
    /// row closes it out.
    pub fn feed(
        &mut self,
        row: &csv::StringRecord,
        line_number: usize,
    ) -> Result<Option<CsvTransaction>, CsvScanError> {
        if row.len() < 3 {
            // Blank separator rows and other formatting noise.
            return Ok(None);
        }

        let mut emitted = None;
        if let Some(pending) = self.pending.as_mut() {
            if row.get(COL_DATE).unwrap_or("").is_empty() {
                // Continuation row: the description is replaced, not appended.
                pending.description = row.get(COL_DESCRIPTION).unwrap_or("").to_string();
                return Ok(None);
            }
            emitted = self.pending.take();
        }
        self.pending = from_row(row, line_number)?;
        Ok(emitted)
    }

    /// End of input flushes whatever is still pending.
    pub fn finish(self) -> Option<CsvTransaction> {
        self.pending
    }
}

fn from_row(
    row: &csv::StringRecord,
    line_number: usize,
) -> Result<Option<CsvTransaction>, CsvScanError> {
    let date_field = row.get(COL_DATE).unwrap_or("");
    let transaction_date = match NaiveDate::parse_from_str(date_field, DATE_FORMAT) {
        Ok(date) => date,
        Err(_) => {
            tracing::warn!("row {}: dropping row with unparsable date {:?}", line_number, date_field);
            return Ok(None);
        }
    };

    let debit = row.get(COL_DEBIT).unwrap_or("").trim();
    let (raw, is_withdrawal) = if !debit.is_empty() {
        (debit, true)
    } else {
        (row.get(COL_CREDIT).unwrap_or("").trim(), false)
    };
    let amount =
        Decimal::from_str(&raw.replace(',', "")).map_err(|_| CsvScanError::MalformedAmount {
            line: line_number,
            raw: raw.to_string(),
        })?;

    let type_field = row.get(COL_DESCRIPTION).unwrap_or("");
    Ok(Some(CsvTransaction {
        transaction_date,
        fop: type_field.to_string(),
        description: type_field.trim().to_string(),
        amount,
        is_withdrawal,
        line_number,
    }))
}

/// Scans a whole CSV export, one transaction per primary row, in input order.
pub fn scan<R: Read>(data: R) -> Result<Vec<CsvTransaction>, CsvScanError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut scanner = RowScanner::new();
    let mut records = Vec::new();
    for (line_number, result) in reader.records().enumerate() {
        let row = result?;
        if let Some(record) = scanner.feed(&row, line_number)? {
            records.push(record);
        }
    }
    if let Some(record) = scanner.finish() {
        records.push(record);
    }
    Ok(records)
}

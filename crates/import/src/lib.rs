//! Statement extraction: fixed-layout bank exports in, categorized and
//! aggregated double-entry ledger entries out.
//!
//! Pipeline per format: record scanner → normalizer → classification rules
//! (one record may expand into several destination legs) → aggregator.
//! Sequential and single-pass; the whole file extracts or the call fails.

pub mod aggregate;
pub mod config;
pub mod csv;
pub mod email;
pub mod normalize;
pub mod rules;

use std::io::{BufRead, Read};

use ledgest_core::LedgerEntry;
use thiserror::Error;

use aggregate::{ClassifiedRecord, GroupKey};
use normalize::Normalizer;
use rules::{CsvPostings, EmailPostings, RuleSet};

pub use config::{ConfigError, CsvConfig, EmailConfig, ExtractConfig};
pub use csv::CsvTransaction;
pub use email::EmailTransaction;
pub use rules::{Classification, ClassifyError, Rule};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error(transparent)]
    Scan(#[from] email::ScanError),
    #[error(transparent)]
    Rows(#[from] csv::CsvScanError),
    #[error(transparent)]
    Classify(#[from] rules::ClassifyError),
}

const META_DESCRIPTION: &str = "source_desc";
const META_LINE: &str = "source_line";
const META_FOP: &str = "fop";

/// Importer for the email statement export.
pub struct EmailImporter {
    year: i32,
    rules: RuleSet<EmailTransaction, EmailPostings>,
    builder: EmailPostings,
}

impl EmailImporter {
    pub fn new(config: EmailConfig) -> Self {
        EmailImporter {
            year: config.year,
            rules: rules::email_rules(),
            builder: EmailPostings::new(config.funding_accounts, config.currency),
        }
    }

    pub fn extract<R: BufRead>(&self, reader: R) -> Result<Vec<LedgerEntry>, ExtractError> {
        let transactions = email::scan(reader, self.year)?;
        let mut records = Vec::with_capacity(transactions.len());
        for txn in &transactions {
            records.push(self.classify(txn)?);
        }
        Ok(aggregate::aggregate(records))
    }

    fn classify(&self, txn: &EmailTransaction) -> Result<ClassifiedRecord, ExtractError> {
        let mut classification = self.rules.classify(txn, &self.builder)?;
        for posting in &mut classification.postings {
            posting
                .meta
                .insert(META_DESCRIPTION.to_string(), txn.description.clone());
            posting
                .meta
                .insert(META_LINE.to_string(), txn.line_number.to_string());
        }
        Ok(ClassifiedRecord {
            key: GroupKey {
                ledger_date: txn.ledger_date,
                txn_date: txn.transaction_date,
                category: classification.category,
                funding_source: Some(txn.funding_source.clone()),
            },
            postings: classification.postings,
            offset_account: self.builder.offset_account(txn)?,
            offset: Some(self.builder.offset_amount(txn)),
        })
    }
}

/// Importer for the tabular CSV statement export.
pub struct CsvStatementImporter {
    normalizer: Normalizer,
    rules: RuleSet<CsvTransaction, CsvPostings>,
    builder: CsvPostings,
}

impl CsvStatementImporter {
    pub fn new(config: CsvConfig) -> Self {
        CsvStatementImporter {
            normalizer: Normalizer::new(config.card_marker),
            rules: rules::csv_rules(),
            builder: CsvPostings::new(config.cash_account, config.currency),
        }
    }

    pub fn extract<R: Read>(&self, reader: R) -> Result<Vec<LedgerEntry>, ExtractError> {
        let transactions = csv::scan(reader)?;
        let mut records = Vec::with_capacity(transactions.len());
        for txn in &transactions {
            records.push(self.classify(txn)?);
        }
        Ok(aggregate::aggregate(records))
    }

    fn classify(&self, txn: &CsvTransaction) -> Result<ClassifiedRecord, ExtractError> {
        let (effective_date, description) = self.normalizer.normalize(txn);
        // Rules match the raw statement description; the normalized one is
        // provenance metadata and the effective entry date.
        let mut classification = self.rules.classify(txn, &self.builder)?;
        for posting in &mut classification.postings {
            posting
                .meta
                .insert(META_DESCRIPTION.to_string(), description.clone());
            posting.meta.insert(META_FOP.to_string(), txn.fop.clone());
            posting
                .meta
                .insert(META_LINE.to_string(), txn.line_number.to_string());
        }
        Ok(ClassifiedRecord {
            key: GroupKey {
                ledger_date: txn.transaction_date,
                txn_date: effective_date,
                category: classification.category,
                funding_source: None,
            },
            postings: classification.postings,
            offset_account: self.builder.offset_account().to_string(),
            offset: None,
        })
    }
}

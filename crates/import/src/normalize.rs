//! Date/description normalizer for the CSV format.
//!
//! Card purchases post a day or two after the fact; the statement's stated
//! date is the posting date, and the true transaction date is embedded in
//! the description as a `DD/MM/YY` token, either as a prefix or a suffix.

use chrono::NaiveDate;
use regex::Regex;

use crate::csv::CsvTransaction;

const EMBEDDED_DATE_FORMAT: &str = "%d/%m/%y";

pub struct Normalizer {
    /// Transaction-type code whose descriptions carry an embedded date.
    card_marker: String,
    prefix: Regex,
    suffix: Regex,
}

impl Normalizer {
    pub fn new(card_marker: impl Into<String>) -> Self {
        Normalizer {
            card_marker: card_marker.into(),
            prefix: Regex::new(r"^(\d\d/\d\d/\d\d) (.*)$").expect("static pattern"),
            suffix: Regex::new(r"^(.*) (\d\d/\d\d/\d\d)$").expect("static pattern"),
        }
    }

    /// Effective transaction date and cleaned description. When no embedded
    /// date is found the stated date is used as-is.
    pub fn normalize(&self, txn: &CsvTransaction) -> (NaiveDate, String) {
        let mut date = txn.transaction_date;
        let mut description = txn.description.as_str();

        if txn.fop == self.card_marker {
            if let Some(caps) = self.prefix.captures(&txn.description) {
                if let Ok(parsed) = NaiveDate::parse_from_str(&caps[1], EMBEDDED_DATE_FORMAT) {
                    date = parsed;
                    description = caps.get(2).map_or("", |m| m.as_str());
                }
            } else if let Some(caps) = self.suffix.captures(&txn.description) {
                if let Ok(parsed) = NaiveDate::parse_from_str(&caps[2], EMBEDDED_DATE_FORMAT) {
                    date = parsed;
                    description = caps.get(1).map_or("", |m| m.as_str());
                }
            }
        }

        (date, description.replace('\t', " ").trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    const MARKER: &str = "DEBIT PURCHASE";

    fn txn(fop: &str, description: &str) -> CsvTransaction {
        CsvTransaction {
            transaction_date: NaiveDate::from_ymd_opt(2023, 3, 15).unwrap(),
            fop: fop.to_string(),
            description: description.to_string(),
            amount: Decimal::ONE,
            is_withdrawal: true,
            line_number: 0,
        }
    }

    #[test]
    fn prefix_date_becomes_effective_date() {
        let n = Normalizer::new(MARKER);
        let (date, desc) = n.normalize(&txn(MARKER, "12/03/23 KOPITIAM OUTLET"));
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 3, 12).unwrap());
        assert_eq!(desc, "KOPITIAM OUTLET");
    }

    #[test]
    fn suffix_date_becomes_effective_date() {
        let n = Normalizer::new(MARKER);
        let (date, desc) = n.normalize(&txn(MARKER, "KOPITIAM OUTLET 12/03/23"));
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 3, 12).unwrap());
        assert_eq!(desc, "KOPITIAM OUTLET");
    }

    #[test]
    fn prefix_attempt_wins_over_suffix() {
        let n = Normalizer::new(MARKER);
        let (date, desc) = n.normalize(&txn(MARKER, "12/03/23 SHOP 14/03/23"));
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 3, 12).unwrap());
        assert_eq!(desc, "SHOP 14/03/23");
    }

    #[test]
    fn non_card_rows_keep_stated_date() {
        let n = Normalizer::new(MARKER);
        let (date, desc) = n.normalize(&txn("GIRO", "12/03/23 INSURANCE"));
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 3, 15).unwrap());
        assert_eq!(desc, "12/03/23 INSURANCE");
    }

    #[test]
    fn no_embedded_date_keeps_description() {
        let n = Normalizer::new(MARKER);
        let (date, desc) = n.normalize(&txn(MARKER, "PLAIN MERCHANT"));
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 3, 15).unwrap());
        assert_eq!(desc, "PLAIN MERCHANT");
    }

    #[test]
    fn tabs_replaced_and_trimmed() {
        let n = Normalizer::new(MARKER);
        let (_, desc) = n.normalize(&txn("GIRO", "  SOME\tMERCHANT  "));
        assert_eq!(desc, "SOME MERCHANT");
    }
}

//! Beancount-style plain-text rendering. Output is deterministic: posting
//! order is preserved and metadata maps iterate in key order.

use std::fmt::Write;

use super::entry::{LedgerEntry, Posting};

pub fn render_entry(entry: &LedgerEntry) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} * \"{}\"", entry.date, entry.category);
    if let Some(aux) = entry.aux_date {
        let _ = writeln!(out, "  aux-date: {aux}");
    }
    for posting in &entry.postings {
        render_posting(&mut out, posting);
    }
    out
}

fn render_posting(out: &mut String, posting: &Posting) {
    let _ = write!(out, "  {}", posting.account);
    if let Some(amount) = &posting.amount {
        let _ = write!(out, "  {amount}");
    }
    if let Some(cost) = &posting.cost {
        let _ = write!(out, " {cost}");
    }
    out.push('\n');
    for (key, value) in &posting.meta {
        let _ = writeln!(out, "    {key}: \"{value}\"");
    }
}

/// Renders entries separated by blank lines, ready to append to a ledger file.
pub fn render_entries(entries: &[LedgerEntry]) -> String {
    entries
        .iter()
        .map(render_entry)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::{Amount, CostBasis};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn sample_entry() -> LedgerEntry {
        let mut dest = Posting::new("Expenses:Food", Amount::new(dec("40.00"), "SGD"))
            .with_cost(CostBasis::total_of(dec("210.00"), "RMB"));
        dest.meta
            .insert("source_desc".to_string(), "DELIVEROO SG".to_string());
        LedgerEntry {
            date: NaiveDate::from_ymd_opt(2023, 6, 15).unwrap(),
            aux_date: NaiveDate::from_ymd_opt(2023, 6, 17),
            category: "Food".to_string(),
            postings: vec![
                dest,
                Posting::new("Liabilities:Card", Amount::new(dec("-210.00"), "RMB")),
            ],
        }
    }

    #[test]
    fn renders_full_entry() {
        let text = render_entry(&sample_entry());
        assert_eq!(
            text,
            "2023-06-15 * \"Food\"\n\
             \x20 aux-date: 2023-06-17\n\
             \x20 Expenses:Food  40.00 SGD {{210.00 RMB}}\n\
             \x20   source_desc: \"DELIVEROO SG\"\n\
             \x20 Liabilities:Card  -210.00 RMB\n"
        );
    }

    #[test]
    fn elided_posting_has_no_amount_column() {
        let entry = LedgerEntry {
            date: NaiveDate::from_ymd_opt(2023, 3, 15).unwrap(),
            aux_date: None,
            category: "Default".to_string(),
            postings: vec![
                Posting::new("Expenses:Misc", Amount::new(dec("45.00"), "SGD")),
                Posting::elided("Assets:Bank:Checking"),
            ],
        };
        let text = render_entry(&entry);
        assert!(text.contains("  Assets:Bank:Checking\n"));
        assert!(!text.contains("aux-date"));
    }

    #[test]
    fn rendering_is_idempotent() {
        let entries = vec![sample_entry(), sample_entry()];
        assert_eq!(render_entries(&entries), render_entries(&entries));
    }

    #[test]
    fn entries_separated_by_blank_line() {
        let text = render_entries(&[sample_entry(), sample_entry()]);
        assert_eq!(text.matches("\n\n").count(), 1);
    }
}

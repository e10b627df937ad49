//! Groups classified transactions into one ledger entry per composite key
//! and emits entries in a fully deterministic order.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use ledgest_core::{Amount, LedgerEntry, Posting};

/// Grouping key. Field order is the output sort order: ascending
/// (ledger date, transaction date, category, funding source).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GroupKey {
    pub ledger_date: NaiveDate,
    pub txn_date: NaiveDate,
    pub category: String,
    /// Set for formats that keep same-category entries from different
    /// payment instruments separate; `None` for formats that do not.
    pub funding_source: Option<String>,
}

/// One classified raw transaction: destination legs plus the offsetting leg
/// it owes against its funding account. An offset of `None` delegates the
/// amount to the consuming ledger's auto-balancing.
#[derive(Debug, Clone)]
pub struct ClassifiedRecord {
    pub key: GroupKey,
    pub postings: Vec<Posting>,
    pub offset_account: String,
    pub offset: Option<Amount>,
}

#[derive(Debug, Default)]
struct Bucket {
    postings: Vec<Posting>,
    /// Offset accounts in first-seen order with accumulated explicit totals.
    offsets: Vec<(String, Option<Amount>)>,
}

impl Bucket {
    fn add_offset(&mut self, account: String, offset: Option<Amount>) {
        if let Some((_, total)) = self.offsets.iter_mut().find(|(a, _)| *a == account) {
            if let (Some(total), Some(offset)) = (total.as_mut(), offset) {
                total.number += offset.number;
            }
            return;
        }
        self.offsets.push((account, offset));
    }
}

/// One entry per distinct key: destination postings in grouped order, then
/// one offsetting leg per funding account represented.
pub fn aggregate(records: Vec<ClassifiedRecord>) -> Vec<LedgerEntry> {
    let mut groups: BTreeMap<GroupKey, Bucket> = BTreeMap::new();
    for record in records {
        let bucket = groups.entry(record.key).or_default();
        bucket.postings.extend(record.postings);
        bucket.add_offset(record.offset_account, record.offset);
    }

    groups
        .into_iter()
        .map(|(key, bucket)| {
            let mut postings = bucket.postings;
            for (account, offset) in bucket.offsets {
                postings.push(match offset {
                    Some(amount) => Posting::new(account, amount),
                    None => Posting::elided(account),
                });
            }
            LedgerEntry {
                date: key.txn_date,
                aux_date: (key.ledger_date != key.txn_date).then_some(key.ledger_date),
                category: key.category,
                postings,
            }
        })
        .collect()
}

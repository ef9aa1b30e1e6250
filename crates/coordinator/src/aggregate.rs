//! Balance and listing aggregation over per-shard transaction dumps
//!
//! A balance is never stored; it is Σ(credits) − Σ(debits) across every
//! shard's records, recomputed on demand. An account mentioned by no
//! record on any shard is unknown, which is a different thing from a
//! known account whose transfers net to zero.

use ledger_core::{Balance, Error, Result, ShardName, Transaction};

/// One shard's snapshot, tagged with the shard it came from
pub type ShardDump = (ShardName, Vec<Transaction>);

/// Compute an account's balance across all dumps
///
/// Order of the dumps does not change the result.
pub fn balance_of(dumps: &[ShardDump], account: &str) -> Result<Balance> {
    let mut known = false;
    let mut balance: Balance = 0;

    for (_, transactions) in dumps {
        for tx in transactions {
            if tx.touches(account) {
                known = true;
                balance += tx.balance_effect(account);
            }
        }
    }

    if !known {
        return Err(Error::UnknownAccount {
            account: account.to_string(),
        });
    }
    Ok(balance)
}

/// Collect every record touching an account, ordered by shard then serial
pub fn transactions_of(dumps: &[ShardDump], account: &str) -> Result<Vec<Transaction>> {
    let mut records: Vec<Transaction> = Vec::new();

    for (_, transactions) in dumps {
        let mut touching: Vec<Transaction> = transactions
            .iter()
            .filter(|tx| tx.touches(account))
            .cloned()
            .collect();
        touching.sort_by_key(|tx| tx.serial);
        records.extend(touching);
    }

    if records.is_empty() {
        return Err(Error::UnknownAccount {
            account: account.to_string(),
        });
    }
    Ok(records)
}

/// The account's home shard: the first dump, in configuration order,
/// that mentions it
pub fn home_shard<'a>(dumps: &'a [ShardDump], account: &str) -> Option<&'a str> {
    dumps
        .iter()
        .find(|(_, transactions)| transactions.iter().any(|tx| tx.touches(account)))
        .map(|(name, _)| name.as_str())
}

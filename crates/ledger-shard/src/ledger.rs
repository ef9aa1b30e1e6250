//! In-memory append-only transaction ledger and its flat-file loader

use std::path::Path;

use ledger_core::{Error, Result, Serial, Transaction};
use tracing::info;

/// One shard's partition of the transaction history
///
/// Loaded once at startup, read-only thereafter except for appends; history
/// is never rewritten. Serials are unique within this shard only.
#[derive(Debug)]
pub struct Ledger {
    transactions: Vec<Transaction>,
    next_serial: Serial,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::from_transactions(Vec::new())
    }
}

impl Ledger {
    /// Build a ledger from already-parsed records
    pub fn from_transactions(transactions: Vec<Transaction>) -> Self {
        let next_serial = transactions
            .iter()
            .map(|tx| tx.serial)
            .max()
            .map_or(1, |max| max + 1);
        Self {
            transactions,
            next_serial,
        }
    }

    /// Load the flat transaction source: one `serial sender receiver amount`
    /// record per line, whitespace separated
    ///
    /// A malformed record is fatal. Shard data integrity is foundational,
    /// so the caller is expected to abort with the returned diagnostic
    /// rather than serve a partial ledger.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = path.display().to_string();
        let raw = std::fs::read_to_string(path)?;

        let mut transactions = Vec::new();
        for (idx, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let malformed = |message: String| Error::MalformedRecord {
                file: file.clone(),
                line: idx + 1,
                message,
            };

            let tokens: Vec<&str> = line.split_whitespace().collect();
            let [serial, sender, receiver, amount] = tokens.as_slice() else {
                return Err(malformed(format!(
                    "expected 4 fields, got {}",
                    tokens.len()
                )));
            };

            transactions.push(Transaction {
                serial: serial
                    .parse()
                    .map_err(|_| malformed(format!("invalid serial: {}", serial)))?,
                sender: sender.to_string(),
                receiver: receiver.to_string(),
                amount: amount
                    .parse()
                    .map_err(|_| malformed(format!("invalid amount: {}", amount)))?,
            });
        }

        info!(file = %file, records = transactions.len(), "Ledger loaded");
        Ok(Self::from_transactions(transactions))
    }

    /// Append a new record, assigning the next serial
    pub fn append(
        &mut self,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: u64,
    ) -> Serial {
        let serial = self.next_serial;
        self.next_serial += 1;
        self.transactions
            .push(Transaction::new(serial, sender, receiver, amount));
        serial
    }

    /// Clone the full ordered record sequence
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.transactions.clone()
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether the ledger holds no records
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

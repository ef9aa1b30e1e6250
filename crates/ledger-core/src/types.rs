//! Core type definitions for the sharded ledger network

use serde::{Deserialize, Serialize};

/// Unique identifier types
pub type AccountId = String;
pub type ShardName = String;

/// Transaction serial number, unique within its home shard only
pub type Serial = u32;

/// Signed account balance in alicoins, derived by aggregation
pub type Balance = i64;

/// Reserved account id used as the intermediate party of a cross-shard
/// transfer. Rejected as a client-supplied account name; a non-zero escrow
/// balance marks an orphaned debit awaiting reconciliation.
pub const ESCROW_ACCOUNT: &str = "_escrow_";

/// A single ledger record
///
/// Immutable once loaded or appended; shards never rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Serial number assigned by the home shard
    pub serial: Serial,

    /// Debited account
    pub sender: AccountId,

    /// Credited account
    pub receiver: AccountId,

    /// Transferred amount in alicoins
    pub amount: u64,
}

impl Transaction {
    /// Create a new transaction record
    pub fn new(
        serial: Serial,
        sender: impl Into<AccountId>,
        receiver: impl Into<AccountId>,
        amount: u64,
    ) -> Self {
        Self {
            serial,
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
        }
    }

    /// Whether this record mentions the given account on either side
    pub fn touches(&self, account: &str) -> bool {
        self.sender == account || self.receiver == account
    }

    /// Signed effect of this record on the given account's balance
    pub fn balance_effect(&self, account: &str) -> Balance {
        let mut effect = 0;
        if self.receiver == account {
            effect += self.amount as Balance;
        }
        if self.sender == account {
            effect -= self.amount as Balance;
        }
        effect
    }
}

/// Client class, distinguished only by which front-door port it connects to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientClass {
    A,
    B,
}

impl ClientClass {
    /// Wire tag sent as the first frame field
    pub fn tag(&self) -> &'static str {
        match self {
            ClientClass::A => "A",
            ClientClass::B => "B",
        }
    }
}

/// Outcome of a fully acknowledged transfer commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Sender and receiver share a home shard; one record appended
    Committed { shard: ShardName, serial: Serial },

    /// Both legs of a cross-shard commit acknowledged
    CommittedCrossShard {
        debit_shard: ShardName,
        debit_serial: Serial,
        credit_shard: ShardName,
        credit_serial: Serial,
    },
}

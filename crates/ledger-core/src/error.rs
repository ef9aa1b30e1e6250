//! Error types for the sharded ledger network

use thiserror::Error;

/// Result type alias using the ledger Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the sharded ledger network
#[derive(Error, Debug)]
pub enum Error {
    // Protocol errors
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("Field contains reserved delimiter or terminator: {field}")]
    InvalidField { field: String },

    #[error("Encoded frame exceeds {limit} bytes: {size}")]
    FrameOverflow { size: usize, limit: usize },

    // Shard communication errors
    #[error("Shard unreachable: {shard}")]
    ShardUnavailable { shard: String },

    #[error("Shard {shard} rejected request: {message}")]
    ShardRejected { shard: String, message: String },

    // Ledger query/transfer errors
    #[error("Unknown account: {account}")]
    UnknownAccount { account: String },

    #[error("Insufficient funds: {account} holds {balance}, transfer needs {requested}")]
    InsufficientFunds {
        account: String,
        balance: i64,
        requested: u64,
    },

    #[error(
        "Partial commit: debit {debit_serial} recorded on shard {debit_shard}, \
         credit on shard {credit_shard} failed: {reason}"
    )]
    PartialCommit {
        debit_shard: String,
        debit_serial: u32,
        credit_shard: String,
        reason: String,
    },

    // Ledger source errors
    #[error("Malformed ledger record in {file} at line {line}: {message}")]
    MalformedRecord {
        file: String,
        line: usize,
        message: String,
    },

    // Configuration errors
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // Channel errors
    #[error("Channel closed: {channel}")]
    ChannelClosed { channel: String },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Returns true if this error must terminate the process rather than
    /// be converted into a response frame
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::MalformedRecord { .. } | Error::InvalidConfig { .. }
        )
    }

    /// Client-facing message body for the response frame
    ///
    /// Every handled error maps to exactly one failure response; the
    /// wording for unknown accounts and partial commits is load-bearing
    /// for callers.
    pub fn user_message(&self) -> String {
        match self {
            Error::UnknownAccount { account } => {
                format!("{} is not part of the network.", account)
            }
            Error::InsufficientFunds {
                account,
                balance,
                requested,
            } => format!(
                "{} has {} alicoins, cannot transfer {}.",
                account, balance, requested
            ),
            Error::ShardUnavailable { shard } => {
                format!("shard {} did not respond, try again later.", shard)
            }
            Error::PartialCommit {
                debit_shard,
                debit_serial,
                credit_shard,
                ..
            } => format!(
                "PARTIAL: debit {} recorded on shard {}, credit on shard {} failed, \
                 reconciliation required.",
                debit_serial, debit_shard, credit_shard
            ),
            Error::Protocol { message } => message.clone(),
            Error::InvalidField { field } => format!("invalid field: {}", field),
            Error::FrameOverflow { size, limit } => {
                format!("response of {} bytes exceeds the {} byte frame limit.", size, limit)
            }
            Error::ShardRejected { shard, message } => {
                format!("shard {} rejected the request: {}", shard, message)
            }
            _ => "internal error.".to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

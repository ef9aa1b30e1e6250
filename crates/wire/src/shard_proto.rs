//! Datagram protocol between the coordinator and the shard servers
//!
//! Requests are single datagrams: the bare `DUMP` trigger, or
//! `APPEND <sender> <receiver> <amount>`. A dump reply is a count line
//! followed by one whitespace-separated record per line; an append reply
//! is `OK <serial>` or `ERR <message>`. Unlike the client links, this leg
//! carries whole ledger snapshots, so it is bounded by the UDP payload
//! ceiling rather than the 256-byte client frame.

use bytes::Bytes;
use ledger_core::{Error, Result, Serial, Transaction};

/// Largest payload a single UDP datagram can carry
pub const MAX_DATAGRAM: usize = 65_507;

/// A request datagram sent to a shard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardRequest {
    /// Return the full transaction snapshot
    Dump,

    /// Append one record; the shard assigns the serial
    Append {
        sender: String,
        receiver: String,
        amount: u64,
    },
}

/// A reply to an [`ShardRequest::Append`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendReply {
    /// Record durably appended under the given serial
    Ack { serial: Serial },

    /// Shard refused the append
    Rejected { message: String },
}

/// Reject account fields the whitespace-separated record format cannot carry
fn validate_record_field(field: &str) -> Result<()> {
    if field.is_empty() || field.bytes().any(|b| b.is_ascii_whitespace() || b == 0) {
        return Err(Error::InvalidField {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Encode a shard request datagram
pub fn encode_shard_request(request: &ShardRequest) -> Result<Bytes> {
    match request {
        ShardRequest::Dump => Ok(Bytes::from_static(b"DUMP")),
        ShardRequest::Append {
            sender,
            receiver,
            amount,
        } => {
            validate_record_field(sender)?;
            validate_record_field(receiver)?;
            Ok(Bytes::from(format!(
                "APPEND {} {} {}",
                sender, receiver, amount
            )))
        }
    }
}

/// Decode a shard request datagram, failing closed on malformed input
pub fn decode_shard_request(bytes: &[u8]) -> Result<ShardRequest> {
    let text = std::str::from_utf8(bytes).map_err(|_| Error::Protocol {
        message: "shard request is not valid UTF-8".to_string(),
    })?;
    let tokens: Vec<&str> = text.split_whitespace().collect();

    match tokens.as_slice() {
        ["DUMP"] => Ok(ShardRequest::Dump),
        ["APPEND", sender, receiver, amount] => {
            let amount = amount.parse::<u64>().map_err(|_| Error::Protocol {
                message: format!("invalid append amount: {}", amount),
            })?;
            Ok(ShardRequest::Append {
                sender: sender.to_string(),
                receiver: receiver.to_string(),
                amount,
            })
        }
        _ => Err(Error::Protocol {
            message: format!("unrecognized shard request: {:?}", text),
        }),
    }
}

/// Serialize a ledger snapshot: a count line, then one record per line
pub fn encode_dump_reply(transactions: &[Transaction]) -> Result<Bytes> {
    let mut out = String::with_capacity(16 + transactions.len() * 24);
    out.push_str(&transactions.len().to_string());
    out.push('\n');
    for tx in transactions {
        validate_record_field(&tx.sender)?;
        validate_record_field(&tx.receiver)?;
        out.push_str(&format!(
            "{} {} {} {}\n",
            tx.serial, tx.sender, tx.receiver, tx.amount
        ));
    }

    if out.len() > MAX_DATAGRAM {
        return Err(Error::FrameOverflow {
            size: out.len(),
            limit: MAX_DATAGRAM,
        });
    }
    Ok(Bytes::from(out))
}

/// Parse a ledger snapshot, verifying the count line
pub fn decode_dump_reply(bytes: &[u8]) -> Result<Vec<Transaction>> {
    let text = std::str::from_utf8(bytes).map_err(|_| Error::Protocol {
        message: "dump reply is not valid UTF-8".to_string(),
    })?;
    let mut lines = text.lines();

    let count: usize = lines
        .next()
        .unwrap_or_default()
        .trim()
        .parse()
        .map_err(|_| Error::Protocol {
            message: "dump reply missing count line".to_string(),
        })?;

    let mut transactions = Vec::with_capacity(count);
    for line in lines.by_ref().take(count) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let [serial, sender, receiver, amount] = tokens.as_slice() else {
            return Err(Error::Protocol {
                message: format!("malformed dump record: {:?}", line),
            });
        };
        transactions.push(Transaction {
            serial: serial.parse().map_err(|_| Error::Protocol {
                message: format!("invalid serial in dump record: {}", serial),
            })?,
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            amount: amount.parse().map_err(|_| Error::Protocol {
                message: format!("invalid amount in dump record: {}", amount),
            })?,
        });
    }

    if transactions.len() != count {
        return Err(Error::Protocol {
            message: format!(
                "dump reply promised {} records, carried {}",
                count,
                transactions.len()
            ),
        });
    }
    Ok(transactions)
}

/// Encode an append reply datagram
pub fn encode_append_reply(reply: &AppendReply) -> Bytes {
    match reply {
        AppendReply::Ack { serial } => Bytes::from(format!("OK {}", serial)),
        AppendReply::Rejected { message } => Bytes::from(format!("ERR {}", message)),
    }
}

/// Decode an append reply datagram
pub fn decode_append_reply(bytes: &[u8]) -> Result<AppendReply> {
    let text = std::str::from_utf8(bytes).map_err(|_| Error::Protocol {
        message: "append reply is not valid UTF-8".to_string(),
    })?;
    let text = text.trim_end();

    if let Some(serial) = text.strip_prefix("OK ") {
        let serial = serial.trim().parse().map_err(|_| Error::Protocol {
            message: format!("invalid serial in append reply: {}", serial),
        })?;
        return Ok(AppendReply::Ack { serial });
    }
    if let Some(message) = text.strip_prefix("ERR") {
        return Ok(AppendReply::Rejected {
            message: message.trim().to_string(),
        });
    }
    Err(Error::Protocol {
        message: format!("unrecognized append reply: {:?}", text),
    })
}

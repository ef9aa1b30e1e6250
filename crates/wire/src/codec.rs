//! Bounded frame codec for the client links
//!
//! Frames are comma-delimited, NUL-terminated, and capped at [`MAX_FRAME`]
//! bytes including the terminator. Responses are not delimited: the status
//! byte is concatenated directly to the message body and decode splits on
//! the first byte only.

use bytes::{BufMut, Bytes, BytesMut};
use ledger_core::{Error, Result};

use crate::frame::{Command, Request, Response};

/// Hard ceiling on an encoded frame, terminator included
pub const MAX_FRAME: usize = 256;

/// Field delimiter for request frames
const DELIMITER: u8 = b',';

/// Frame terminator
const TERMINATOR: u8 = b'\0';

/// Reject a field that would corrupt framing
fn validate_field(field: &str) -> Result<()> {
    if field.is_empty() {
        return Err(Error::Protocol {
            message: "empty frame field".to_string(),
        });
    }
    if field.bytes().any(|b| b == DELIMITER || b == TERMINATOR) {
        return Err(Error::InvalidField {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Join validated fields and terminate, enforcing the frame ceiling
fn finish_frame(fields: &[&str]) -> Result<Bytes> {
    let body_len: usize = fields.iter().map(|f| f.len()).sum::<usize>() + fields.len() - 1;
    let size = body_len + 1;
    if size > MAX_FRAME {
        return Err(Error::FrameOverflow {
            size,
            limit: MAX_FRAME,
        });
    }

    let mut buf = BytesMut::with_capacity(size);
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            buf.put_u8(DELIMITER);
        }
        buf.put_slice(field.as_bytes());
    }
    buf.put_u8(TERMINATOR);
    Ok(buf.freeze())
}

/// Encode a request frame: `<tag>,<OPERATION>,<arg1>[,<arg2>...]`
pub fn encode_request(request: &Request) -> Result<Bytes> {
    validate_field(&request.client)?;
    let args = request.command.args();
    for arg in &args {
        validate_field(arg)?;
    }

    let mut fields = vec![request.client.as_str(), request.command.op_name()];
    fields.extend(args.iter().map(|a| a.as_str()));
    finish_frame(&fields)
}

/// Strip the terminator and return the frame body as UTF-8
fn frame_body(bytes: &[u8]) -> Result<&str> {
    let body = match bytes.iter().position(|&b| b == TERMINATOR) {
        Some(end) => &bytes[..end],
        None => bytes,
    };
    std::str::from_utf8(body).map_err(|_| Error::Protocol {
        message: "frame is not valid UTF-8".to_string(),
    })
}

/// Decode a request frame, failing closed on anything malformed
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    let body = frame_body(bytes)?;
    let mut fields = body.split(DELIMITER as char);

    let client = fields.next().unwrap_or_default();
    validate_field(client)?;

    let op = fields.next().ok_or_else(|| Error::Protocol {
        message: "request frame has no operation field".to_string(),
    })?;

    let args: Vec<&str> = fields.collect();
    let arity = |expected: usize| -> Result<()> {
        if args.len() != expected {
            return Err(Error::Protocol {
                message: format!(
                    "{} expects {} argument(s), got {}",
                    op,
                    expected,
                    args.len()
                ),
            });
        }
        Ok(())
    };

    let command = match op {
        "CHECK WALLET" => {
            arity(1)?;
            validate_field(args[0])?;
            Command::CheckWallet {
                username: args[0].to_string(),
            }
        }
        "TXLIST" => {
            arity(1)?;
            validate_field(args[0])?;
            Command::TxList {
                username: args[0].to_string(),
            }
        }
        "TXCOINS" => {
            arity(3)?;
            validate_field(args[0])?;
            validate_field(args[1])?;
            let amount = args[2].parse::<u64>().map_err(|_| Error::Protocol {
                message: format!("invalid transfer amount: {}", args[2]),
            })?;
            Command::TxCoins {
                sender: args[0].to_string(),
                receiver: args[1].to_string(),
                amount,
            }
        }
        other => {
            return Err(Error::Protocol {
                message: format!("unknown operation: {}", other),
            })
        }
    };

    Ok(Request {
        client: client.to_string(),
        command,
    })
}

/// Encode a response frame: `<'1'|'0'><message>`
pub fn encode_response(response: &Response) -> Result<Bytes> {
    if response.message.bytes().any(|b| b == TERMINATOR) {
        return Err(Error::InvalidField {
            field: response.message.clone(),
        });
    }

    let size = 1 + response.message.len() + 1;
    if size > MAX_FRAME {
        return Err(Error::FrameOverflow {
            size,
            limit: MAX_FRAME,
        });
    }

    let mut buf = BytesMut::with_capacity(size);
    buf.put_u8(if response.success { b'1' } else { b'0' });
    buf.put_slice(response.message.as_bytes());
    buf.put_u8(TERMINATOR);
    Ok(buf.freeze())
}

/// Decode a response frame, splitting on the first byte only
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let body = frame_body(bytes)?;
    let mut chars = body.chars();
    let success = match chars.next() {
        Some('1') => true,
        Some('0') => false,
        Some(other) => {
            return Err(Error::Protocol {
                message: format!("invalid response status byte: {}", other),
            })
        }
        None => {
            return Err(Error::Protocol {
                message: "empty response frame".to_string(),
            })
        }
    };

    Ok(Response {
        success,
        message: chars.as_str().to_string(),
    })
}

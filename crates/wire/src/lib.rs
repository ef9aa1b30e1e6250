//! Wire formats for the sharded ledger network
//!
//! This crate provides:
//! - **Client frames**: the comma-delimited, NUL-terminated, size-bounded
//!   request/response codec used on every client link
//! - **Shard protocol**: the datagram requests (`DUMP`, `APPEND`) and
//!   replies exchanged between the coordinator and the shard servers
//!
//! Every encoder rejects fields that would corrupt framing instead of
//! emitting them; every decoder fails closed on malformed input.

mod codec;
mod frame;
mod shard_proto;

pub use codec::{
    decode_request, decode_response, encode_request, encode_response, MAX_FRAME,
};
pub use frame::{Command, Request, Response};
pub use shard_proto::{
    decode_append_reply, decode_dump_reply, decode_shard_request, encode_append_reply,
    encode_dump_reply, encode_shard_request, AppendReply, ShardRequest, MAX_DATAGRAM,
};

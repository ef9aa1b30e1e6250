//! Client request and response frame types

use ledger_core::AccountId;

/// One client operation, parsed from the request frame
///
/// The tagged union replaces positional string splitting at the dispatch
/// boundary; anything that does not parse into one of these is a protocol
/// error, never undefined behavior on a short frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Balance enquiry for one account
    CheckWallet { username: AccountId },

    /// Transfer `amount` alicoins from `sender` to `receiver`
    TxCoins {
        sender: AccountId,
        receiver: AccountId,
        amount: u64,
    },

    /// List every transaction touching one account
    TxList { username: AccountId },
}

impl Command {
    /// Operation name as it appears on the wire
    pub fn op_name(&self) -> &'static str {
        match self {
            Command::CheckWallet { .. } => "CHECK WALLET",
            Command::TxCoins { .. } => "TXCOINS",
            Command::TxList { .. } => "TXLIST",
        }
    }

    /// Payload fields in wire order
    pub fn args(&self) -> Vec<String> {
        match self {
            Command::CheckWallet { username } | Command::TxList { username } => {
                vec![username.clone()]
            }
            Command::TxCoins {
                sender,
                receiver,
                amount,
            } => vec![sender.clone(), receiver.clone(), amount.to_string()],
        }
    }
}

/// A parsed client request frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Client tag, the first frame field ("A" or "B" in the fixed deployment)
    pub client: String,

    /// The requested operation
    pub command: Command,
}

/// A response frame: success flag plus message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub success: bool,
    pub message: String,
}

impl Response {
    /// Successful response with the given body
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Failure response with the given body
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

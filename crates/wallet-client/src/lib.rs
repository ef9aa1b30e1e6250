//! Wallet client library
//!
//! A client opens one TCP connection to its class's front door, sends one
//! framed request, reads the single framed response, and disconnects.
//! The two command-line binaries (`client-a`, `client-b`) are thin
//! wrappers over [`WalletClient`]; they differ only in which front-door
//! port they dial.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use ledger_core::{ClientClass, Result};
use wire::{decode_response, encode_request, Command, Request, Response, MAX_FRAME};

/// One-shot connection to a coordinator front door
pub struct WalletClient {
    class: ClientClass,
    stream: TcpStream,
}

impl WalletClient {
    /// Connect to the front door at `addr`
    pub async fn connect(class: ClientClass, addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        debug!(class = class.tag(), address = addr, "Connected to front door");
        Ok(Self { class, stream })
    }

    /// Send one command and collect the single response
    ///
    /// Consumes the client: the protocol is one exchange per connection.
    pub async fn request(mut self, command: Command) -> Result<Response> {
        let frame = encode_request(&Request {
            client: self.class.tag().to_string(),
            command,
        })?;
        self.stream.write_all(&frame).await?;

        let mut buf = [0u8; MAX_FRAME];
        let mut filled = 0;
        loop {
            let n = self.stream.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
            if buf[..filled].contains(&0) || filled == MAX_FRAME {
                break;
            }
        }

        decode_response(&buf[..filled])
    }
}

/// Parse positional arguments and run one client exchange
///
/// Accepted argument shapes:
/// - `<username>`: balance enquiry
/// - `TXLIST <username>`: transaction listing
/// - `<sender> <receiver> <amount>`: transfer
pub async fn run_cli(class: ClientClass, addr: &str) -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    println!("The client {} is up and running.", class.tag());

    match args.as_slice() {
        [username] => {
            println!(
                "{} sent a balance enquiry request to the main server.",
                username
            );
            let response = WalletClient::connect(class, addr)
                .await?
                .request(Command::CheckWallet {
                    username: username.clone(),
                })
                .await?;
            if response.success {
                println!(
                    "The current balance of {} is :{} alicoins.",
                    username, response.message
                );
            } else {
                println!("{}", response.message);
            }
        }
        [keyword, username] if keyword == "TXLIST" => {
            let response = WalletClient::connect(class, addr)
                .await?
                .request(Command::TxList {
                    username: username.clone(),
                })
                .await?;
            if response.success {
                for record in response.message.split("; ") {
                    println!("{}", record);
                }
            } else {
                println!("{}", response.message);
            }
        }
        [sender, receiver, amount] => {
            println!(
                "{} has requested to transfer {} coins to {}.",
                sender, amount, receiver
            );
            let amount = amount.parse::<u64>().map_err(|_| {
                ledger_core::Error::Protocol {
                    message: format!("invalid transfer amount: {}", amount),
                }
            })?;
            let response = WalletClient::connect(class, addr)
                .await?
                .request(Command::TxCoins {
                    sender: sender.clone(),
                    receiver: receiver.clone(),
                    amount,
                })
                .await?;
            println!("{}", response.message);
        }
        _ => {
            println!("usage: <username> | TXLIST <username> | <sender> <receiver> <amount>");
        }
    }

    Ok(())
}

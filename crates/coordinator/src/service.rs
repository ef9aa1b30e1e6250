//! Router/coordinator protocol state machine
//!
//! One request frame in, exactly one response frame out. Dispatch fans
//! out to every configured shard in parallel, aggregates, and converts
//! every handled error into a failure response at this boundary; only
//! startup failures are allowed to kill the process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tracing::{info, warn};

use ledger_core::{
    ClusterConfig, Error, Result, Serial, ShardConfig, TransferOutcome, ESCROW_ACCOUNT,
};
use wire::{Command, Request, Response};

use crate::aggregate::{self, ShardDump};
use crate::gateway::ShardGateway;

/// Per-shard exchange counters
#[derive(Debug, Clone, Copy, Default)]
pub struct ShardStats {
    /// Exchanges attempted against this shard
    pub exchanges: u64,

    /// Exchanges that timed out or were rejected
    pub failures: u64,
}

/// Coordinator service
///
/// Cheap to clone; all clones share the same counters.
#[derive(Clone)]
pub struct CoordinatorService {
    /// Cluster topology, shards in home-shard precedence order
    config: Arc<ClusterConfig>,

    /// Datagram client for the shard endpoints
    gateway: ShardGateway,

    /// Per-shard exchange statistics
    stats: Arc<DashMap<String, ShardStats>>,

    /// Requests handled since startup
    request_count: Arc<AtomicU64>,

    /// Server start time for uptime tracking
    start_time: Instant,
}

impl CoordinatorService {
    /// Create a service for the given cluster topology
    pub fn new(config: ClusterConfig) -> Self {
        let gateway = ShardGateway::new(config.coordinator.shard_timeout);
        Self {
            config: Arc::new(config),
            gateway,
            stats: Arc::new(DashMap::new()),
            request_count: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    /// Cluster topology this service routes for
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Seconds since the service was created
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Requests handled since startup
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Exchange counters for one shard
    pub fn shard_stats(&self, shard: &str) -> ShardStats {
        self.stats.get(shard).map(|s| *s).unwrap_or_default()
    }

    /// Handle one parsed request, producing exactly one response
    pub async fn handle_request(&self, request: Request) -> Response {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        info!(
            client = %request.client,
            operation = request.command.op_name(),
            "Request received"
        );

        let result = match &request.command {
            Command::CheckWallet { username } => self.check_wallet(username).await,
            Command::TxCoins {
                sender,
                receiver,
                amount,
            } => self.transfer(sender, receiver, *amount).await,
            Command::TxList { username } => self.tx_list(username).await,
        };

        result.unwrap_or_else(|e| {
            warn!(operation = request.command.op_name(), error = %e, "Request failed");
            Response::fail(e.user_message())
        })
    }

    /// Record the outcome of one shard exchange
    fn record_exchange(&self, shard: &str, ok: bool) {
        let mut entry = self.stats.entry(shard.to_string()).or_default();
        entry.exchanges += 1;
        if !ok {
            entry.failures += 1;
        }
    }

    /// Fan out a dump request to every shard in parallel
    ///
    /// Latency is bounded by the slowest shard, not the sum. A single
    /// unreachable shard fails the whole collection: a partial sum is
    /// worse than no answer for a balance. Sibling exchanges already in
    /// flight are not cancelled by one failure.
    async fn collect_dumps(&self) -> Result<Vec<ShardDump>> {
        let mut handles = Vec::with_capacity(self.config.shards.len());
        for shard in &self.config.shards {
            let gateway = self.gateway.clone();
            let shard = shard.clone();
            handles.push(tokio::spawn(async move {
                let dump = gateway.dump(&shard).await;
                (shard.name, dump)
            }));
        }

        let mut dumps = Vec::with_capacity(handles.len());
        let mut unavailable: Option<Error> = None;
        for handle in handles {
            let (name, result) = handle.await.map_err(|_| Error::ChannelClosed {
                channel: "shard fan-out".to_string(),
            })?;
            match result {
                Ok(transactions) => {
                    self.record_exchange(&name, true);
                    dumps.push((name, transactions));
                }
                Err(e) => {
                    self.record_exchange(&name, false);
                    unavailable.get_or_insert(e);
                }
            }
        }

        if let Some(e) = unavailable {
            return Err(e);
        }
        Ok(dumps)
    }

    /// Append one record via the gateway, tracking the shard's counters
    async fn append_on(
        &self,
        shard: &ShardConfig,
        sender: &str,
        receiver: &str,
        amount: u64,
    ) -> Result<Serial> {
        let result = self.gateway.append(shard, sender, receiver, amount).await;
        self.record_exchange(&shard.name, result.is_ok());
        result
    }

    /// Look up a shard endpoint by name
    fn shard_config(&self, name: &str) -> Result<ShardConfig> {
        self.config
            .shard(name)
            .cloned()
            .ok_or_else(|| Error::InvalidConfig {
                message: format!("no shard named {:?}", name),
            })
    }

    /// CHECK WALLET: aggregate the account's balance across all shards
    async fn check_wallet(&self, username: &str) -> Result<Response> {
        let dumps = self.collect_dumps().await?;
        let balance = aggregate::balance_of(&dumps, username)?;

        info!(account = username, balance, "Balance computed");
        Ok(Response::ok(balance.to_string()))
    }

    /// TXLIST: aggregate every record touching the account
    async fn tx_list(&self, username: &str) -> Result<Response> {
        let dumps = self.collect_dumps().await?;
        let records = aggregate::transactions_of(&dumps, username)?;

        info!(account = username, records = records.len(), "Listing computed");
        let body = records
            .iter()
            .map(|tx| format!("{} {} {} {}", tx.serial, tx.sender, tx.receiver, tx.amount))
            .collect::<Vec<_>>()
            .join("; ");
        Ok(Response::ok(body))
    }

    /// TXCOINS: validate, locate both parties, and commit the transfer
    async fn transfer(&self, sender: &str, receiver: &str, amount: u64) -> Result<Response> {
        if amount == 0 {
            return Err(Error::Protocol {
                message: "transfer amount must be positive".to_string(),
            });
        }
        for account in [sender, receiver] {
            if account == ESCROW_ACCOUNT {
                return Err(Error::Protocol {
                    message: format!("{} is a reserved account name", ESCROW_ACCOUNT),
                });
            }
        }

        let dumps = self.collect_dumps().await?;

        // Both parties must exist before any shard is mutated
        let balance = aggregate::balance_of(&dumps, sender)?;
        let sender_home = aggregate::home_shard(&dumps, sender)
            .ok_or_else(|| Error::UnknownAccount {
                account: sender.to_string(),
            })?
            .to_string();
        let receiver_home = aggregate::home_shard(&dumps, receiver)
            .ok_or_else(|| Error::UnknownAccount {
                account: receiver.to_string(),
            })?
            .to_string();

        if u64::try_from(balance).map_or(true, |held| held < amount) {
            return Err(Error::InsufficientFunds {
                account: sender.to_string(),
                balance,
                requested: amount,
            });
        }

        let outcome = self
            .commit(sender, receiver, amount, &sender_home, &receiver_home)
            .await?;

        let message = match &outcome {
            TransferOutcome::Committed { shard, serial } => {
                info!(sender, receiver, amount, shard = %shard, serial, "Transfer committed");
                format!(
                    "transferred {} alicoins from {} to {} (serial {} on shard {}).",
                    amount, sender, receiver, serial, shard
                )
            }
            TransferOutcome::CommittedCrossShard {
                debit_shard,
                debit_serial,
                credit_shard,
                credit_serial,
            } => {
                info!(
                    sender,
                    receiver,
                    amount,
                    debit_shard = %debit_shard,
                    credit_shard = %credit_shard,
                    "Cross-shard transfer committed"
                );
                format!(
                    "transferred {} alicoins from {} to {} (debit {} on shard {}, credit {} on shard {}).",
                    amount, sender, receiver, debit_serial, debit_shard, credit_serial, credit_shard
                )
            }
        };
        Ok(Response::ok(message))
    }

    /// Append the record(s) for a validated transfer
    ///
    /// Co-located parties get a single ordinary record. Cross-shard
    /// transfers run the two-step commit through the escrow account:
    /// the debit leg lands on the sender's home shard first, then the
    /// mirrored credit on the receiver's. A credit failure after the
    /// debit has been acknowledged is a partial commit and is surfaced
    /// as such, never as a generic failure.
    async fn commit(
        &self,
        sender: &str,
        receiver: &str,
        amount: u64,
        sender_home: &str,
        receiver_home: &str,
    ) -> Result<TransferOutcome> {
        let debit_shard = self.shard_config(sender_home)?;

        if sender_home == receiver_home {
            let serial = self.append_on(&debit_shard, sender, receiver, amount).await?;
            return Ok(TransferOutcome::Committed {
                shard: debit_shard.name,
                serial,
            });
        }

        let credit_shard = self.shard_config(receiver_home)?;

        let debit_serial = self
            .append_on(&debit_shard, sender, ESCROW_ACCOUNT, amount)
            .await?;

        match self
            .append_on(&credit_shard, ESCROW_ACCOUNT, receiver, amount)
            .await
        {
            Ok(credit_serial) => Ok(TransferOutcome::CommittedCrossShard {
                debit_shard: debit_shard.name,
                debit_serial,
                credit_shard: credit_shard.name,
                credit_serial,
            }),
            Err(e) => {
                warn!(
                    sender,
                    receiver,
                    amount,
                    debit_shard = %debit_shard.name,
                    debit_serial,
                    credit_shard = %credit_shard.name,
                    error = %e,
                    "Credit leg failed after debit was recorded"
                );
                Err(Error::PartialCommit {
                    debit_shard: debit_shard.name,
                    debit_serial,
                    credit_shard: credit_shard.name,
                    reason: e.to_string(),
                })
            }
        }
    }
}

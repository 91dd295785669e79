//! Collaborator contracts the engine calls across process boundaries
//!
//! The engine never talks to a ledger, wallet, or UI surface directly:
//! everything external is an object-safe trait consumed as `Arc<dyn _>`.
//! Implementations (RPC clients, wallet adapters, toast renderers) live
//! in the host.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bridge::message::SignedMessage;
use crate::error::SwapResult;

/// Liquidity pool snapshot, reserves in display units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub base: String,
    pub quote: String,
    pub base_reserve: f64,
    pub quote_reserve: f64,
    pub lp_fee_bps: u32,
}

impl PoolInfo {
    /// Whether this pool trades the given pair, in either order
    pub fn trades(&self, a: &str, b: &str) -> bool {
        (self.base == a && self.quote == b) || (self.base == b && self.quote == a)
    }

    /// Mid price of one unit of `pay` in units of the opposite side,
    /// inverted when `pay` sits on the quote side of the pool
    pub fn mid_price(&self, pay: &str) -> Option<f64> {
        if self.base_reserve <= 0.0 || self.quote_reserve <= 0.0 {
            return None;
        }
        if pay == self.base {
            Some(self.quote_reserve / self.base_reserve)
        } else if pay == self.quote {
            Some(self.base_reserve / self.quote_reserve)
        } else {
            None
        }
    }

    /// Reserve on the side of the given symbol
    pub fn reserve_of(&self, symbol: &str) -> Option<f64> {
        if symbol == self.base {
            Some(self.base_reserve)
        } else if symbol == self.quote {
            Some(self.quote_reserve)
        } else {
            None
        }
    }
}

/// Fee classification on a quote or execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeKind {
    Gas,
    Lp,
}

/// A single fee charge, in atomic units of `asset`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeCharge {
    pub kind: FeeKind,
    pub asset: String,
    pub amount: u128,
}

/// Result of the home ledger's read-only quote primitive
#[derive(Debug, Clone)]
pub struct LedgerQuote {
    pub receive_amount: u128,
    pub fees: Vec<FeeCharge>,
}

/// Parameters handed to the home ledger's execute primitive
#[derive(Debug, Clone)]
pub struct ExecuteParams {
    /// Unique per submission; ties ledger records back to engine logs
    pub correlation_id: Uuid,
    pub pay_symbol: String,
    pub pay_amount: u128,
    pub receive_symbol: String,
    pub min_receive_amount: u128,
    pub max_slippage_pct: f64,
    pub fees: Vec<FeeCharge>,
    /// Proof of the already-landed foreign pay transaction, if any
    pub pay_tx_id: Option<String>,
    /// Canonical message signed by the foreign wallet, if any
    pub signed_message: Option<SignedMessage>,
    /// Destination on the foreign chain for home-to-foreign swaps
    pub receive_address: Option<String>,
}

/// What the ledger's execute call produced
#[derive(Debug, Clone)]
pub enum ExecuteOutcome {
    /// Same-ledger swap settled immediately; `tx_id` is the ledger's
    /// numeric transaction reference rendered as a string
    Completed { tx_id: String },
    /// Cross-ledger swap accepted; settlement tracked by job id
    Accepted { job_id: u64 },
}

/// Status of an asynchronous cross-ledger swap job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    WaitingForSignature,
    SendingToForeign,
    Confirmed,
    Submitted,
    Failed(String),
}

impl JobStatus {
    /// Terminal statuses end monitoring
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Confirmed | JobStatus::Submitted | JobStatus::Failed(_)
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Confirmed | JobStatus::Submitted)
    }

    /// Status name for metrics and notifications
    pub fn name(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::WaitingForSignature => "waiting_for_signature",
            JobStatus::SendingToForeign => "sending_to_foreign",
            JobStatus::Confirmed => "confirmed",
            JobStatus::Submitted => "submitted",
            JobStatus::Failed(_) => "failed",
        }
    }
}

/// A server-tracked cross-ledger swap handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapJob {
    pub id: u64,
    pub status: JobStatus,
    pub pay_tx_signature: Option<String>,
    pub receive_tx_signature: Option<String>,
}

/// A foreign transaction the home ledger has indexed
#[derive(Debug, Clone)]
pub struct ForeignTxRecord {
    pub signature: String,
    pub amount: u128,
    pub seen_at_millis: u64,
}

/// The smart-contract ledger both assets settle against
#[async_trait]
pub trait HomeLedger: Send + Sync {
    async fn balance_of(&self, owner: &str, asset: &str) -> SwapResult<u128>;

    async fn allowance(&self, owner: &str, spender: &str, asset: &str) -> SwapResult<u128>;

    async fn approve(&self, spender: &str, amount: u128, asset: &str) -> SwapResult<()>;

    /// Snapshot of all liquidity pools
    async fn pools(&self) -> SwapResult<Vec<PoolInfo>>;

    /// Read-only quote primitive
    async fn quote(&self, pay: &str, amount: u128, receive: &str) -> SwapResult<LedgerQuote>;

    async fn execute(&self, params: ExecuteParams) -> SwapResult<ExecuteOutcome>;

    async fn job_status(&self, job_id: u64) -> SwapResult<Option<SwapJob>>;

    /// Look up a foreign-chain transaction by its signature, once the
    /// home ledger has registered it
    async fn lookup_foreign_transaction(
        &self,
        signature: &str,
    ) -> SwapResult<Option<ForeignTxRecord>>;
}

/// What the connected foreign wallet is able to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletCapabilities {
    pub can_send_native: bool,
    pub can_send_token: bool,
    pub can_sign_message: bool,
}

/// Adapter over the user's foreign-chain wallet
#[async_trait]
pub trait ForeignWallet: Send + Sync {
    fn capabilities(&self) -> WalletCapabilities;

    fn address(&self) -> String;

    /// Send the chain's native asset; returns the transaction signature
    async fn send_native(&self, to: &str, amount: u128) -> SwapResult<String>;

    /// Send a token by mint address; returns the transaction signature
    async fn send_token(&self, mint: &str, to: &str, amount: u128) -> SwapResult<String>;

    async fn sign_message(&self, payload: &[u8]) -> SwapResult<String>;
}

/// Handle to a displayed notification
pub type NotifyHandle = u64;

/// UI notification surface
pub trait NotificationSink: Send + Sync {
    fn info(&self, message: &str, duration_ms: Option<u64>) -> NotifyHandle;
    fn success(&self, message: &str, duration_ms: Option<u64>) -> NotifyHandle;
    fn error(&self, message: &str, duration_ms: Option<u64>) -> NotifyHandle;
    fn dismiss(&self, handle: NotifyHandle);
}

/// Balance refresh hooks into the host's balance store
#[async_trait]
pub trait BalanceSink: Send + Sync {
    async fn refresh_all(&self);

    /// Aggressive refresh of foreign-chain balances only
    async fn refresh_foreign(&self);
}

/// Analytics event sink
pub trait AnalyticsSink: Send + Sync {
    fn track(&self, event: &str, payload: serde_json::Value);
}

/// External reference-price source for the bridge quote fallback
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn usd_price(&self, symbol: &str) -> SwapResult<f64>;
}

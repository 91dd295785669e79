//! Hand-rolled collaborator fakes shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use swapbridge::asset::{parse_amount, Asset, AssetOrigin, AssetRegistry};
use swapbridge::error::{SwapError, SwapResult};
use swapbridge::ledger::{
    AnalyticsSink, BalanceSink, ExecuteOutcome, ExecuteParams, ForeignTxRecord, ForeignWallet,
    HomeLedger, LedgerQuote, NotificationSink, NotifyHandle, PoolInfo, PriceOracle, SwapJob,
    WalletCapabilities,
};

/// Never found: the lookup always comes back empty
pub const NEVER: u32 = u32::MAX;

pub fn pool(base: &str, quote: &str, base_reserve: f64, quote_reserve: f64) -> PoolInfo {
    PoolInfo {
        base: base.to_string(),
        quote: quote.to_string(),
        base_reserve,
        quote_reserve,
        lp_fee_bps: 30,
    }
}

fn asset(
    symbol: &str,
    decimals: u8,
    origin: AssetOrigin,
    requires_approval: bool,
    foreign_mint: Option<&str>,
) -> Asset {
    Asset {
        symbol: symbol.to_string(),
        decimals,
        origin,
        minimum_amount: None,
        approval_fee: 10_000,
        transfer_fee: 0,
        requires_approval,
        blocked: false,
        foreign_mint: foreign_mint.map(str::to_string),
    }
}

/// Registry used across the integration tests: ICP is the home-side
/// intermediary, ckUSDC a home token behind the approval pattern, SOL
/// and USDC live on the foreign chain.
pub fn registry() -> Arc<AssetRegistry> {
    let mut assets = HashMap::new();
    assets.insert("ICP".into(), asset("ICP", 8, AssetOrigin::Home, false, None));
    assets.insert(
        "ckUSDC".into(),
        asset("ckUSDC", 6, AssetOrigin::Home, true, None),
    );
    assets.insert(
        "SOL".into(),
        asset("SOL", 9, AssetOrigin::ForeignNative, false, None),
    );
    assets.insert(
        "USDC".into(),
        asset(
            "USDC",
            6,
            AssetOrigin::ForeignToken,
            false,
            Some("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
        ),
    );
    Arc::new(AssetRegistry::new(
        assets,
        "ICP".to_string(),
        parse_amount("0.00000001").unwrap(),
        parse_amount("1000000000000").unwrap(),
    ))
}

/// Scriptable home-ledger fake
pub struct MockLedger {
    pub pools: Mutex<Vec<PoolInfo>>,
    pub pools_calls: AtomicU32,
    /// Balances by asset symbol; owner is ignored
    pub balances: Mutex<HashMap<String, u128>>,
    pub allowances: Mutex<HashMap<String, u128>>,
    pub approvals: Mutex<Vec<(String, u128)>>,
    /// Result of the read-only quote primitive; Err strings become
    /// network errors
    pub ledger_quote: Mutex<Result<LedgerQuote, String>>,
    pub execute_results: Mutex<VecDeque<Result<ExecuteOutcome, String>>>,
    pub execute_params: Mutex<Vec<ExecuteParams>>,
    /// Scripted poll results; once drained the last `Some` repeats
    pub job_polls: Mutex<VecDeque<Result<Option<SwapJob>, String>>>,
    last_job: Mutex<Option<SwapJob>>,
    pub lookup_calls: AtomicU32,
    /// Number of empty lookups before the foreign tx is "found"
    pub lookup_found_after: AtomicU32,
}

impl MockLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pools: Mutex::new(Vec::new()),
            pools_calls: AtomicU32::new(0),
            balances: Mutex::new(HashMap::new()),
            allowances: Mutex::new(HashMap::new()),
            approvals: Mutex::new(Vec::new()),
            ledger_quote: Mutex::new(Err("quote primitive unavailable".to_string())),
            execute_results: Mutex::new(VecDeque::new()),
            execute_params: Mutex::new(Vec::new()),
            job_polls: Mutex::new(VecDeque::new()),
            last_job: Mutex::new(None),
            lookup_calls: AtomicU32::new(0),
            lookup_found_after: AtomicU32::new(NEVER),
        })
    }

    pub fn set_pools(&self, pools: Vec<PoolInfo>) {
        *self.pools.lock().unwrap() = pools;
    }

    pub fn set_balance(&self, symbol: &str, amount: u128) {
        self.balances.lock().unwrap().insert(symbol.to_string(), amount);
    }

    pub fn push_execute(&self, result: Result<ExecuteOutcome, String>) {
        self.execute_results.lock().unwrap().push_back(result);
    }

    pub fn push_job_poll(&self, result: Result<Option<SwapJob>, String>) {
        self.job_polls.lock().unwrap().push_back(result);
    }

    pub fn execute_count(&self) -> usize {
        self.execute_params.lock().unwrap().len()
    }
}

#[async_trait]
impl HomeLedger for MockLedger {
    async fn balance_of(&self, _owner: &str, asset: &str) -> SwapResult<u128> {
        Ok(*self.balances.lock().unwrap().get(asset).unwrap_or(&0))
    }

    async fn allowance(&self, _owner: &str, _spender: &str, asset: &str) -> SwapResult<u128> {
        Ok(*self.allowances.lock().unwrap().get(asset).unwrap_or(&0))
    }

    async fn approve(&self, _spender: &str, amount: u128, asset: &str) -> SwapResult<()> {
        self.approvals
            .lock()
            .unwrap()
            .push((asset.to_string(), amount));
        self.allowances
            .lock()
            .unwrap()
            .insert(asset.to_string(), amount);
        Ok(())
    }

    async fn pools(&self) -> SwapResult<Vec<PoolInfo>> {
        self.pools_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pools.lock().unwrap().clone())
    }

    async fn quote(&self, _pay: &str, _amount: u128, _receive: &str) -> SwapResult<LedgerQuote> {
        match &*self.ledger_quote.lock().unwrap() {
            Ok(quote) => Ok(LedgerQuote {
                receive_amount: quote.receive_amount,
                fees: quote.fees.clone(),
            }),
            Err(msg) => Err(SwapError::Network(msg.clone())),
        }
    }

    async fn execute(&self, params: ExecuteParams) -> SwapResult<ExecuteOutcome> {
        self.execute_params.lock().unwrap().push(params);
        match self.execute_results.lock().unwrap().pop_front() {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(msg)) => Err(SwapError::Execution(msg)),
            None => Err(SwapError::Execution("no scripted outcome".to_string())),
        }
    }

    async fn job_status(&self, _job_id: u64) -> SwapResult<Option<SwapJob>> {
        let next = self.job_polls.lock().unwrap().pop_front();
        match next {
            Some(Ok(job)) => {
                if job.is_some() {
                    *self.last_job.lock().unwrap() = job.clone();
                }
                Ok(job)
            }
            Some(Err(msg)) => Err(SwapError::Network(msg)),
            None => Ok(self.last_job.lock().unwrap().clone()),
        }
    }

    async fn lookup_foreign_transaction(
        &self,
        signature: &str,
    ) -> SwapResult<Option<ForeignTxRecord>> {
        let calls = self.lookup_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let threshold = self.lookup_found_after.load(Ordering::SeqCst);
        if threshold != NEVER && calls > threshold {
            Ok(Some(ForeignTxRecord {
                signature: signature.to_string(),
                amount: 1_000_000_000,
                seen_at_millis: 0,
            }))
        } else {
            Ok(None)
        }
    }
}

/// Foreign wallet fake recording what it sent and signed
pub struct MockWallet {
    pub caps: Mutex<WalletCapabilities>,
    pub native_sends: Mutex<Vec<(String, u128)>>,
    pub token_sends: Mutex<Vec<(String, String, u128)>>,
    pub signed_payloads: Mutex<Vec<Vec<u8>>>,
}

impl MockWallet {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            caps: Mutex::new(WalletCapabilities {
                can_send_native: true,
                can_send_token: true,
                can_sign_message: true,
            }),
            native_sends: Mutex::new(Vec::new()),
            token_sends: Mutex::new(Vec::new()),
            signed_payloads: Mutex::new(Vec::new()),
        })
    }

    pub fn set_caps(&self, caps: WalletCapabilities) {
        *self.caps.lock().unwrap() = caps;
    }
}

#[async_trait]
impl ForeignWallet for MockWallet {
    fn capabilities(&self) -> WalletCapabilities {
        *self.caps.lock().unwrap()
    }

    fn address(&self) -> String {
        "FqN1walletaddress".to_string()
    }

    async fn send_native(&self, to: &str, amount: u128) -> SwapResult<String> {
        self.native_sends
            .lock()
            .unwrap()
            .push((to.to_string(), amount));
        Ok(format!("native-sig-{}", self.native_sends.lock().unwrap().len()))
    }

    async fn send_token(&self, mint: &str, to: &str, amount: u128) -> SwapResult<String> {
        self.token_sends
            .lock()
            .unwrap()
            .push((mint.to_string(), to.to_string(), amount));
        Ok(format!("token-sig-{}", self.token_sends.lock().unwrap().len()))
    }

    async fn sign_message(&self, payload: &[u8]) -> SwapResult<String> {
        self.signed_payloads.lock().unwrap().push(payload.to_vec());
        Ok("signed-payload".to_string())
    }
}

/// What a notification sink was asked to show
#[derive(Debug, Clone, PartialEq)]
pub enum NoteEvent {
    Info(String),
    Success(String),
    Error(String),
    Dismissed(NotifyHandle),
}

pub struct RecordingNotifications {
    pub events: Mutex<Vec<NoteEvent>>,
    next_handle: AtomicU64,
}

impl RecordingNotifications {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            next_handle: AtomicU64::new(1),
        })
    }

    pub fn success_count(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, NoteEvent::Success(_)))
            .count()
    }

    pub fn dismissed_count(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, NoteEvent::Dismissed(_)))
            .count()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                NoteEvent::Info(m) | NoteEvent::Success(m) | NoteEvent::Error(m) => {
                    Some(m.clone())
                }
                NoteEvent::Dismissed(_) => None,
            })
            .collect()
    }
}

impl NotificationSink for RecordingNotifications {
    fn info(&self, message: &str, _duration_ms: Option<u64>) -> NotifyHandle {
        self.events
            .lock()
            .unwrap()
            .push(NoteEvent::Info(message.to_string()));
        self.next_handle.fetch_add(1, Ordering::SeqCst)
    }

    fn success(&self, message: &str, _duration_ms: Option<u64>) -> NotifyHandle {
        self.events
            .lock()
            .unwrap()
            .push(NoteEvent::Success(message.to_string()));
        self.next_handle.fetch_add(1, Ordering::SeqCst)
    }

    fn error(&self, message: &str, _duration_ms: Option<u64>) -> NotifyHandle {
        self.events
            .lock()
            .unwrap()
            .push(NoteEvent::Error(message.to_string()));
        self.next_handle.fetch_add(1, Ordering::SeqCst)
    }

    fn dismiss(&self, handle: NotifyHandle) {
        self.events.lock().unwrap().push(NoteEvent::Dismissed(handle));
    }
}

pub struct RecordingBalances {
    pub refresh_all_calls: AtomicU32,
    pub refresh_foreign_calls: AtomicU32,
}

impl RecordingBalances {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            refresh_all_calls: AtomicU32::new(0),
            refresh_foreign_calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl BalanceSink for RecordingBalances {
    async fn refresh_all(&self) {
        self.refresh_all_calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn refresh_foreign(&self) {
        self.refresh_foreign_calls.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct RecordingAnalytics {
    pub events: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingAnalytics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn track(&self, event: &str, payload: serde_json::Value) {
        self.events
            .lock()
            .unwrap()
            .push((event.to_string(), payload));
    }
}

pub struct StaticOracle {
    pub prices: HashMap<String, f64>,
    pub calls: AtomicU32,
}

impl StaticOracle {
    pub fn new(prices: &[(&str, f64)]) -> Arc<Self> {
        Arc::new(Self {
            prices: prices
                .iter()
                .map(|(s, p)| (s.to_string(), *p))
                .collect(),
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl PriceOracle for StaticOracle {
    async fn usd_price(&self, symbol: &str) -> SwapResult<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| SwapError::Network(format!("no reference price for {}", symbol)))
    }
}

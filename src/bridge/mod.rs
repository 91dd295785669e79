//! Cross-ledger coordination
//!
//! Detects whether a swap crosses ledgers, submits the pay-side
//! transaction on the foreign chain when required, builds and
//! optionally signs the canonical message, and polls the home ledger
//! until it registers the foreign transaction. This polling is the
//! bridge between "the user's money left their wallet" and "the home
//! ledger acknowledges it" and has no authoritative fallback.

pub mod message;
pub mod mode;

pub use message::{CanonicalSwapMessage, SignedMessage};
pub use mode::{swap_mode, SwapMode};

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::asset::{self, AssetOrigin, AssetRegistry};
use crate::error::{SwapError, SwapResult};
use crate::ledger::{
    ExecuteOutcome, ExecuteParams, ForeignWallet, HomeLedger, PriceOracle,
};
use crate::metrics;

/// Coarse progress checkpoints while waiting for the home ledger to
/// register a foreign transaction; lets the caller surface a changing
/// status message without polling the coordinator itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyProgress {
    /// First poll issued
    Started,
    /// Still looking after ~1.5s
    Scanning,
    /// Still looking after ~4.5s
    StillScanning,
    /// Still looking after ~10s
    Delayed,
}

/// Where a bridge quote came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteSource {
    Ledger,
    ReferencePrice,
}

/// Quote for a cross-ledger pair
#[derive(Debug, Clone)]
pub struct BridgeQuote {
    pub receive_amount: u128,
    /// Units of receive asset per unit of pay asset, display terms
    pub exchange_rate: f64,
    pub fees: Vec<crate::ledger::FeeCharge>,
    pub source: QuoteSource,
}

/// Everything needed to run one cross-ledger swap
#[derive(Debug, Clone)]
pub struct BridgeSwapRequest {
    pub pay_symbol: String,
    pub pay_amount_atomic: u128,
    pub receive_symbol: String,
    pub receive_amount_atomic: u128,
    pub max_slippage_pct: f64,
    /// Home-ledger account on the user's side of the swap
    pub home_address: String,
    /// Foreign-chain destination, required for home-to-foreign swaps
    pub foreign_address: Option<String>,
}

/// Ledger-facing arguments assembled by the mode-specific flows
#[derive(Debug, Clone)]
pub struct BridgeSwapArgs {
    pub pay_symbol: String,
    pub pay_amount_atomic: u128,
    pub receive_symbol: String,
    pub receive_amount_atomic: u128,
    pub max_slippage_pct: f64,
    pub receive_address: String,
    /// Proof of the already-landed foreign pay transaction
    pub pay_tx_id: Option<String>,
    pub signed_message: Option<SignedMessage>,
}

/// Static coordinator configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Home-ledger account foreign deposits are sent to
    pub home_deposit_address: String,
    /// Account approved to pull funds for allowance-pattern assets
    pub spender_address: String,
    pub referral_code: Option<String>,
    pub price_cache_ttl: Duration,
    pub verify_max_retries: u32,
    pub verify_delay: Duration,
}

pub struct CrossLedgerCoordinator {
    ledger: Arc<dyn HomeLedger>,
    wallet: Arc<dyn ForeignWallet>,
    oracle: Arc<dyn PriceOracle>,
    registry: Arc<AssetRegistry>,
    config: BridgeConfig,
    /// Reference prices from the oracle, cached briefly
    price_cache: DashMap<String, (f64, Instant)>,
}

impl CrossLedgerCoordinator {
    pub fn new(
        ledger: Arc<dyn HomeLedger>,
        wallet: Arc<dyn ForeignWallet>,
        oracle: Arc<dyn PriceOracle>,
        registry: Arc<AssetRegistry>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            ledger,
            wallet,
            oracle,
            registry,
            config,
            price_cache: DashMap::new(),
        }
    }

    /// Detect the swap mode for a configured pair
    pub fn mode_for(&self, pay: &str, receive: &str) -> SwapResult<Option<SwapMode>> {
        let pay_origin = self.registry.get(pay)?.origin;
        let receive_origin = self.registry.get(receive)?.origin;
        Ok(swap_mode(pay_origin, receive_origin))
    }

    /// Quote a cross-ledger pair: the ledger's read-only quote primitive
    /// first, reference prices as the fallback
    pub async fn quote(&self, pay: &str, amount: u128, receive: &str) -> SwapResult<BridgeQuote> {
        let pay_asset = self.registry.get(pay)?.clone();
        let receive_asset = self.registry.get(receive)?.clone();

        match self.ledger.quote(pay, amount, receive).await {
            Ok(ledger_quote) => {
                let pay_display = asset::from_atomic(amount, pay_asset.decimals);
                let receive_display =
                    asset::from_atomic(ledger_quote.receive_amount, receive_asset.decimals);
                let exchange_rate = match (
                    num_traits::ToPrimitive::to_f64(&receive_display),
                    num_traits::ToPrimitive::to_f64(&pay_display),
                ) {
                    (Some(r), Some(p)) if p > 0.0 => r / p,
                    _ => 0.0,
                };
                Ok(BridgeQuote {
                    receive_amount: ledger_quote.receive_amount,
                    exchange_rate,
                    fees: ledger_quote.fees,
                    source: QuoteSource::Ledger,
                })
            }
            Err(e) => {
                debug!("Ledger quote unavailable ({}), using reference prices", e);
                let (pay_usd, receive_usd) = futures::future::try_join(
                    self.cached_usd_price(pay),
                    self.cached_usd_price(receive),
                )
                .await?;
                if receive_usd <= 0.0 {
                    return Err(SwapError::Internal(format!(
                        "reference price for {} is zero",
                        receive
                    )));
                }

                let exchange_rate = pay_usd / receive_usd;
                let pay_display = asset::from_atomic(amount, pay_asset.decimals);
                let pay_f64 = num_traits::ToPrimitive::to_f64(&pay_display).unwrap_or(0.0);
                let receive_display = pay_f64 * exchange_rate;
                let receive_amount =
                    (receive_display * 10f64.powi(receive_asset.decimals as i32)) as u128;

                Ok(BridgeQuote {
                    receive_amount,
                    exchange_rate,
                    fees: Vec::new(),
                    source: QuoteSource::ReferencePrice,
                })
            }
        }
    }

    async fn cached_usd_price(&self, symbol: &str) -> SwapResult<f64> {
        if let Some(entry) = self.price_cache.get(symbol) {
            let (price, fetched_at) = *entry;
            if fetched_at.elapsed() < self.config.price_cache_ttl {
                return Ok(price);
            }
        }

        let price = self.oracle.usd_price(symbol).await?;
        self.price_cache
            .insert(symbol.to_string(), (price, Instant::now()));
        Ok(price)
    }

    /// Poll the home ledger until it has registered the foreign
    /// transaction. Returns `true` on the first non-empty lookup,
    /// `false` after exhausting `max_retries` — a result, not an error:
    /// the caller decides how to surface a timeout.
    pub async fn verify_foreign_deposit(
        &self,
        signature: &str,
        mut on_progress: impl FnMut(VerifyProgress) + Send,
        max_retries: u32,
        retry_delay: Duration,
    ) -> bool {
        let mut reported = VerifyProgress::Started;
        on_progress(VerifyProgress::Started);

        for attempt in 1..=max_retries {
            let elapsed = retry_delay.saturating_mul(attempt.saturating_sub(1));
            let stage = stage_for(elapsed);
            if stage != reported {
                reported = stage;
                on_progress(stage);
            }

            metrics::record_verify_poll();
            match self.ledger.lookup_foreign_transaction(signature).await {
                Ok(Some(record)) => {
                    info!(
                        "Foreign transaction {} registered after {} polls (amount {})",
                        signature, attempt, record.amount
                    );
                    return true;
                }
                Ok(None) => {}
                Err(e) => {
                    // A failed lookup is indistinguishable from "not
                    // yet indexed"; keep polling
                    warn!("Foreign tx lookup failed on attempt {}: {}", attempt, e);
                }
            }

            if attempt < max_retries {
                tokio::time::sleep(retry_delay).await;
            }
        }

        warn!(
            "Foreign transaction {} not registered after {} polls",
            signature, max_retries
        );
        metrics::record_verify_timeout();
        false
    }

    /// Submit a cross-ledger swap to the home ledger. A supplied
    /// `pay_tx_id` is verified first.
    pub async fn execute_swap(
        &self,
        args: BridgeSwapArgs,
        on_progress: impl FnMut(VerifyProgress) + Send,
    ) -> SwapResult<u64> {
        if let Some(signature) = &args.pay_tx_id {
            let registered = self
                .verify_foreign_deposit(
                    signature,
                    on_progress,
                    self.config.verify_max_retries,
                    self.config.verify_delay,
                )
                .await;
            if !registered {
                return Err(SwapError::Execution(
                    "foreign transaction was not registered in time".to_string(),
                ));
            }
        }

        let params = ExecuteParams {
            correlation_id: Uuid::new_v4(),
            pay_symbol: args.pay_symbol.clone(),
            pay_amount: args.pay_amount_atomic,
            receive_symbol: args.receive_symbol.clone(),
            min_receive_amount: args.receive_amount_atomic,
            max_slippage_pct: args.max_slippage_pct,
            fees: Vec::new(),
            pay_tx_id: args.pay_tx_id.clone(),
            signed_message: args.signed_message.clone(),
            receive_address: Some(args.receive_address.clone()),
        };

        match self.ledger.execute(params).await? {
            ExecuteOutcome::Accepted { job_id } => {
                info!(
                    "Cross-ledger swap accepted: {} -> {} as job {}",
                    args.pay_symbol, args.receive_symbol, job_id
                );
                Ok(job_id)
            }
            ExecuteOutcome::Completed { tx_id } => Err(SwapError::Internal(format!(
                "ledger settled synchronously ({}) where a job was expected",
                tx_id
            ))),
        }
    }

    /// Foreign-to-home flow: send the pay asset from the foreign
    /// wallet, wait for the home ledger to register it, then submit the
    /// swap with the deposit as proof.
    pub async fn execute_foreign_to_home(
        &self,
        request: &BridgeSwapRequest,
        on_progress: impl FnMut(VerifyProgress) + Send,
    ) -> SwapResult<u64> {
        let pay_asset = self.registry.get(&request.pay_symbol)?.clone();
        self.require_mode(request, SwapMode::ForeignToHome)?;

        // Capability check: a wallet that cannot send means the user
        // must transfer manually, which this flow does not cover
        let caps = self.wallet.capabilities();
        let signature = match pay_asset.origin {
            AssetOrigin::ForeignNative => {
                if !caps.can_send_native {
                    return Err(SwapError::Wallet(
                        "wallet cannot send the native asset; manual transfer required"
                            .to_string(),
                    ));
                }
                self.wallet
                    .send_native(&self.config.home_deposit_address, request.pay_amount_atomic)
                    .await?
            }
            AssetOrigin::ForeignToken => {
                if !caps.can_send_token {
                    return Err(SwapError::Wallet(
                        "wallet cannot send tokens; manual transfer required".to_string(),
                    ));
                }
                let mint = pay_asset.foreign_mint.as_deref().ok_or_else(|| {
                    SwapError::Internal(format!("{} has no mint configured", pay_asset.symbol))
                })?;
                self.wallet
                    .send_token(
                        mint,
                        &self.config.home_deposit_address,
                        request.pay_amount_atomic,
                    )
                    .await?
            }
            AssetOrigin::Home => {
                return Err(SwapError::Validation(
                    "pay asset is not a foreign asset".to_string(),
                ))
            }
        };
        info!(
            "Foreign pay transaction sent: {} ({} {})",
            signature, request.pay_amount_atomic, request.pay_symbol
        );

        let signed_message = self
            .build_signed_message(request, self.wallet.address(), request.home_address.clone())
            .await?;

        self.execute_swap(
            BridgeSwapArgs {
                pay_symbol: request.pay_symbol.clone(),
                pay_amount_atomic: request.pay_amount_atomic,
                receive_symbol: request.receive_symbol.clone(),
                receive_amount_atomic: request.receive_amount_atomic,
                max_slippage_pct: request.max_slippage_pct,
                receive_address: request.home_address.clone(),
                pay_tx_id: Some(signature),
                signed_message,
            },
            on_progress,
        )
        .await
    }

    /// Home-to-foreign flow: approval handling on the home side, then a
    /// job that pays out on the foreign chain.
    pub async fn execute_home_to_foreign(
        &self,
        request: &BridgeSwapRequest,
        on_progress: impl FnMut(VerifyProgress) + Send,
    ) -> SwapResult<u64> {
        let pay_asset = self.registry.get(&request.pay_symbol)?.clone();
        self.require_mode(request, SwapMode::HomeToForeign)?;

        let foreign_address = request.foreign_address.clone().ok_or_else(|| {
            SwapError::Validation("destination address on the foreign chain is required".into())
        })?;

        if pay_asset.requires_approval {
            let required = request
                .pay_amount_atomic
                .saturating_add(pay_asset.approval_fee);
            let allowance = self
                .ledger
                .allowance(
                    &request.home_address,
                    &self.config.spender_address,
                    &pay_asset.symbol,
                )
                .await?;
            if allowance < required {
                self.ledger
                    .approve(&self.config.spender_address, required, &pay_asset.symbol)
                    .await?;
            }
        }

        let signed_message = self
            .build_signed_message(request, request.home_address.clone(), foreign_address.clone())
            .await?;

        self.execute_swap(
            BridgeSwapArgs {
                pay_symbol: request.pay_symbol.clone(),
                pay_amount_atomic: request.pay_amount_atomic,
                receive_symbol: request.receive_symbol.clone(),
                receive_amount_atomic: request.receive_amount_atomic,
                max_slippage_pct: request.max_slippage_pct,
                receive_address: foreign_address,
                pay_tx_id: None,
                signed_message,
            },
            on_progress,
        )
        .await
    }

    fn require_mode(&self, request: &BridgeSwapRequest, expected: SwapMode) -> SwapResult<()> {
        match self.mode_for(&request.pay_symbol, &request.receive_symbol)? {
            Some(mode) if mode == expected => Ok(()),
            other => Err(SwapError::Validation(format!(
                "pair {} -> {} resolves to {:?}, not {:?}",
                request.pay_symbol, request.receive_symbol, other, expected
            ))),
        }
    }

    /// Build the canonical message and sign it if the wallet can
    async fn build_signed_message(
        &self,
        request: &BridgeSwapRequest,
        pay_address: String,
        receive_address: String,
    ) -> SwapResult<Option<SignedMessage>> {
        let message = CanonicalSwapMessage {
            pay_symbol: request.pay_symbol.clone(),
            pay_amount_atomic: request.pay_amount_atomic,
            pay_address,
            receive_symbol: request.receive_symbol.clone(),
            receive_amount_atomic: request.receive_amount_atomic,
            receive_address,
            max_slippage_pct: request.max_slippage_pct,
            timestamp_millis: chrono::Utc::now().timestamp_millis() as u64,
            referred_by: self.config.referral_code.clone(),
        };

        if !self.wallet.capabilities().can_sign_message {
            debug!("Wallet cannot sign messages; submitting unsigned");
            return Ok(None);
        }

        let signature = self.wallet.sign_message(&message.digest()).await?;
        Ok(Some(SignedMessage { message, signature }))
    }
}

fn stage_for(elapsed: Duration) -> VerifyProgress {
    if elapsed >= Duration::from_millis(10_000) {
        VerifyProgress::Delayed
    } else if elapsed >= Duration::from_millis(4_500) {
        VerifyProgress::StillScanning
    } else if elapsed >= Duration::from_millis(1_500) {
        VerifyProgress::Scanning
    } else {
        VerifyProgress::Started
    }
}

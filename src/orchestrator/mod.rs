//! End-to-end swap execution pipeline
//!
//! Composes the validator and quote engine into `execute_swap`:
//! validation, authentication and balance gates, freshness and slippage
//! re-checks, analytics events, and bounded retry around the ledger
//! execute call. The orchestrator has no mutual exclusion of its own;
//! callers must not run two executions concurrently for one session.

pub mod retry;

pub use retry::{execute_with_retry, Backoff, RetryPolicy};

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::asset::{self, AssetRegistry};
use crate::error::{SwapError, SwapResult};
use crate::ledger::{AnalyticsSink, ExecuteOutcome, ExecuteParams, HomeLedger};
use crate::metrics;
use crate::models::{SwapRequest, SwapReceipt, UserContext};
use crate::quote::{CancelToken, Quote, QuoteEngine};
use crate::validate::{self, SlippageVerdict, QUOTE_MAX_AGE_MS};

pub struct SwapOrchestrator {
    ledger: Arc<dyn HomeLedger>,
    quotes: Arc<QuoteEngine>,
    analytics: Arc<dyn AnalyticsSink>,
    registry: Arc<AssetRegistry>,
    retry_policy: RetryPolicy,
    /// Account approved to pull funds for allowance-pattern assets
    spender_address: String,
}

impl SwapOrchestrator {
    pub fn new(
        ledger: Arc<dyn HomeLedger>,
        quotes: Arc<QuoteEngine>,
        analytics: Arc<dyn AnalyticsSink>,
        registry: Arc<AssetRegistry>,
        retry_policy: RetryPolicy,
        spender_address: String,
    ) -> Self {
        Self {
            ledger,
            quotes,
            analytics,
            registry,
            retry_policy,
            spender_address,
        }
    }

    /// Execute a swap end to end. Short-circuits on the first failing
    /// gate; failures are normalized for presentation via
    /// [`SwapError::user_message`].
    pub async fn execute_swap(
        &self,
        request: &SwapRequest,
        user: Option<&UserContext>,
    ) -> SwapResult<SwapReceipt> {
        let started = Instant::now();
        let result = self.run_pipeline(request, user, started).await;

        if let Err(e) = &result {
            // Cancellation is not a failure, and validation failures are
            // returned without side effects
            if !matches!(e, SwapError::Cancelled | SwapError::Validation(_)) {
                warn!("Swap failed: {}", e);
                metrics::record_swap_failed();
                self.analytics.track(
                    "swap_failed",
                    json!({
                        "pay_symbol": request.pay_symbol,
                        "receive_symbol": request.receive_symbol,
                        "error": e.user_message(),
                    }),
                );
            }
        }

        result
    }

    async fn run_pipeline(
        &self,
        request: &SwapRequest,
        user: Option<&UserContext>,
        started: Instant,
    ) -> SwapResult<SwapReceipt> {
        // 1. Format and business validation, no side effects on failure
        let report = validate::validate_request(request, &self.registry);
        if !report.is_valid {
            return Err(SwapError::Validation(report.errors.join("; ")));
        }

        // 2. Authentication gate
        let user = user.ok_or(SwapError::Unauthorized)?;

        // 3. Balance sufficiency including the approval-fee buffer
        let pay_asset = self.registry.get(&request.pay_symbol)?.clone();
        let pay_amount = asset::parse_amount(&request.pay_amount)?;
        let pay_atomic = asset::to_atomic(&pay_amount, pay_asset.decimals)?;
        let balance = self
            .ledger
            .balance_of(&user.address, &pay_asset.symbol)
            .await?;
        validate::validate_balance(pay_atomic, balance, &pay_asset, true)?;

        // 4. Fresh quote (may hit cache)
        let quote = self.quotes.quote(request, &CancelToken::new()).await?;
        if !quote.is_usable() {
            return Err(SwapError::NoRoute {
                pay: request.pay_symbol.clone(),
                receive: request.receive_symbol.clone(),
            });
        }

        // 5. Freshness and slippage re-checks
        validate::validate_quote_freshness(quote.created_at, QUOTE_MAX_AGE_MS)?;
        match validate::validate_slippage(request.slippage_pct, quote.price_impact_pct) {
            SlippageVerdict::Exceeded(_) => {
                return Err(SwapError::SlippageExceeded {
                    impact_pct: quote.price_impact_pct,
                    tolerance_pct: request.slippage_pct,
                });
            }
            SlippageVerdict::Warning(msg) => warn!("{}", msg),
            SlippageVerdict::Ok => {}
        }

        // 6. Initiated event
        metrics::record_swap_initiated();
        self.analytics.track(
            "swap_initiated",
            json!({
                "pay_symbol": request.pay_symbol,
                "pay_amount": request.pay_amount,
                "receive_symbol": request.receive_symbol,
                "price_impact_pct": quote.price_impact_pct,
            }),
        );

        // 7. Execute with bounded retry
        let receipt = execute_with_retry(&self.retry_policy, || {
            self.execute_once(&user.address, pay_atomic, request, &quote)
        })
        .await?;

        // 8. Completed event with realized amounts and duration
        let duration = started.elapsed();
        metrics::record_swap_completed(duration.as_secs_f64());
        self.analytics.track(
            "swap_completed",
            json!({
                "pay_symbol": request.pay_symbol,
                "pay_amount": receipt.pay_amount.to_string(),
                "receive_symbol": request.receive_symbol,
                "receive_amount": receipt.receive_amount.to_string(),
                "duration_ms": duration.as_millis() as u64,
                "tx_hash": receipt.tx_hash,
            }),
        );
        info!(
            "Swap completed: {} {} -> {} {} in {:?}",
            receipt.pay_amount,
            request.pay_symbol,
            receipt.receive_amount,
            request.receive_symbol,
            duration
        );

        Ok(receipt)
    }

    /// One execution attempt: allowance handling, parameter
    /// construction, ledger execute, and result interpretation
    async fn execute_once(
        &self,
        owner: &str,
        pay_atomic: u128,
        request: &SwapRequest,
        quote: &Quote,
    ) -> SwapResult<SwapReceipt> {
        let pay_asset = self.registry.get(&request.pay_symbol)?;

        if pay_asset.requires_approval {
            let required = pay_atomic.saturating_add(pay_asset.approval_fee);
            let allowance = self
                .ledger
                .allowance(owner, &self.spender_address, &pay_asset.symbol)
                .await?;
            if allowance < required {
                info!(
                    "Approving {} {} for {}",
                    required, pay_asset.symbol, self.spender_address
                );
                self.ledger
                    .approve(&self.spender_address, required, &pay_asset.symbol)
                    .await?;
            }
        }

        let receive_asset = self.registry.get(&request.receive_symbol)?;
        let min_receive = asset::to_atomic(&quote.receive_amount, receive_asset.decimals)?;

        let correlation_id = Uuid::new_v4();
        let params = ExecuteParams {
            correlation_id,
            pay_symbol: request.pay_symbol.clone(),
            pay_amount: pay_atomic,
            receive_symbol: request.receive_symbol.clone(),
            min_receive_amount: min_receive,
            max_slippage_pct: request.slippage_pct,
            fees: quote
                .gas_fees
                .iter()
                .chain(quote.lp_fees.iter())
                .cloned()
                .collect(),
            pay_tx_id: None,
            signed_message: None,
            receive_address: None,
        };

        let outcome = self.ledger.execute(params).await?;
        let tx_hash = match outcome {
            ExecuteOutcome::Completed { tx_id } => {
                // The ledger reports settled swaps with a numeric
                // transaction reference; anything else is a failure
                // message in disguise
                if tx_id.is_empty() || !tx_id.chars().all(|c| c.is_ascii_digit()) {
                    return Err(SwapError::Execution(tx_id));
                }
                tx_id
            }
            ExecuteOutcome::Accepted { job_id } => {
                return Err(SwapError::Execution(format!(
                    "expected settled swap, ledger queued job {}",
                    job_id
                )));
            }
        };

        Ok(SwapReceipt {
            tx_hash,
            pay_amount: quote.pay_amount.clone(),
            receive_amount: quote.receive_amount.clone(),
            correlation_id,
            timestamp: Utc::now(),
        })
    }
}

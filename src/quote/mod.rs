//! Quote engine: priced quotes with a TTL cache and cooperative
//! cancellation
//!
//! Pricing uses direct pools when available and falls back to a two-hop
//! route through the configured intermediary, weighted by pool
//! liquidity. Results are cached by (pay, receive, amount); the cache is
//! advisory and does not de-duplicate in-flight fetches.

pub mod cache;
pub mod cancel;
pub mod pricing;

pub use cache::{CacheStats, QuoteCache, QuoteKey};
pub use cancel::CancelToken;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use num_traits::{FromPrimitive, ToPrimitive};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::asset::{self, AssetRegistry};
use crate::error::{SwapError, SwapResult};
use crate::ledger::{FeeCharge, FeeKind, HomeLedger};
use crate::metrics;
use crate::models::SwapRequest;
use crate::validate;

/// One hop of the routing path
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RouteHop {
    pub pay_symbol: String,
    pub receive_symbol: String,
    /// Number of parallel pools contributing to this hop's price
    pub pools_used: usize,
}

/// A priced quote for a swap request
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub pay_symbol: String,
    pub pay_amount: BigDecimal,
    pub receive_symbol: String,
    pub receive_amount: BigDecimal,
    /// Units of receive asset per unit of pay asset
    pub price: f64,
    pub price_impact_pct: f64,
    pub gas_fees: Vec<FeeCharge>,
    pub lp_fees: Vec<FeeCharge>,
    pub route: Vec<RouteHop>,
    pub created_at: Instant,
    pub created_at_utc: DateTime<Utc>,
}

impl Quote {
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.age() > ttl
    }

    /// A zero-priced quote means no route was found; callers must not
    /// execute against it
    pub fn is_usable(&self) -> bool {
        self.price > 0.0
    }
}

/// Quote engine owning the process-wide quote cache
pub struct QuoteEngine {
    ledger: Arc<dyn HomeLedger>,
    registry: Arc<AssetRegistry>,
    cache: QuoteCache,
}

impl QuoteEngine {
    pub fn new(ledger: Arc<dyn HomeLedger>, registry: Arc<AssetRegistry>, ttl: Duration) -> Self {
        Self {
            ledger,
            registry,
            cache: QuoteCache::new(ttl),
        }
    }

    /// Produce a priced quote for the request, hitting the cache when a
    /// live entry exists. Cancellation fails distinctly and never caches
    /// a partial result.
    pub async fn quote(
        &self,
        request: &SwapRequest,
        cancel: &CancelToken,
    ) -> SwapResult<Arc<Quote>> {
        let report = validate::validate_request(request, &self.registry);
        if !report.is_valid {
            return Err(SwapError::Validation(report.errors.join("; ")));
        }

        let key = QuoteKey {
            pay_symbol: request.pay_symbol.clone(),
            receive_symbol: request.receive_symbol.clone(),
            pay_amount: request.pay_amount.clone(),
        };

        if let Some(hit) = self.cache.get(&key) {
            debug!(
                "Quote cache hit for {} -> {} ({})",
                key.pay_symbol, key.receive_symbol, key.pay_amount
            );
            metrics::record_quote_served(true);
            return Ok(hit);
        }

        cancel.check()?;
        let pools = self.ledger.pools().await?;
        cancel.check()?;

        let pay_asset = self.registry.get(&request.pay_symbol)?;
        let receive_asset = self.registry.get(&request.receive_symbol)?;
        let pay_amount = asset::parse_amount(&request.pay_amount)?;

        // Deeper consistency check now that pool state is in hand
        let priced = validate::validate_route(
            &pools,
            &request.pay_symbol,
            &request.receive_symbol,
            self.registry.intermediary(),
        )
        .ok()
        .and_then(|_| {
            pricing::price_route(
                &pools,
                &request.pay_symbol,
                &request.receive_symbol,
                self.registry.intermediary(),
            )
        });

        let quote = match priced {
            Some(route) if route.price.is_finite() && route.price > 0.0 => {
                let price_bd = BigDecimal::from_f64(route.price).ok_or_else(|| {
                    SwapError::Internal(format!("unrepresentable price {}", route.price))
                })?;
                let receive_amount =
                    (&pay_amount * &price_bd).with_scale(receive_asset.decimals as i64);
                let receive_atomic = asset::to_atomic(&receive_amount, receive_asset.decimals)?;

                let lp_fee_bps = route
                    .legs
                    .iter()
                    .map(|(_, _, leg)| leg.lp_fee_bps)
                    .max()
                    .unwrap_or(0) as u128;
                let lp_fees = vec![FeeCharge {
                    kind: FeeKind::Lp,
                    asset: receive_asset.symbol.clone(),
                    amount: receive_atomic * lp_fee_bps / 10_000,
                }];
                let gas_fees = vec![FeeCharge {
                    kind: FeeKind::Gas,
                    asset: receive_asset.symbol.clone(),
                    amount: receive_asset.transfer_fee * route.legs.len() as u128,
                }];

                let impact = pricing::price_impact_pct(
                    &route,
                    pay_amount.to_f64().unwrap_or(0.0),
                );

                Quote {
                    pay_symbol: pay_asset.symbol.clone(),
                    pay_amount,
                    receive_symbol: receive_asset.symbol.clone(),
                    receive_amount,
                    price: route.price,
                    price_impact_pct: impact,
                    gas_fees,
                    lp_fees,
                    route: route
                        .legs
                        .iter()
                        .map(|(pay, receive, leg)| RouteHop {
                            pay_symbol: pay.clone(),
                            receive_symbol: receive.clone(),
                            pools_used: leg.pool_count,
                        })
                        .collect(),
                    created_at: Instant::now(),
                    created_at_utc: Utc::now(),
                }
            }
            _ => {
                debug!(
                    "No route from {} to {}: returning unusable quote",
                    request.pay_symbol, request.receive_symbol
                );
                Quote {
                    pay_symbol: pay_asset.symbol.clone(),
                    pay_amount,
                    receive_symbol: receive_asset.symbol.clone(),
                    receive_amount: BigDecimal::from(0u32),
                    price: 0.0,
                    price_impact_pct: 0.0,
                    gas_fees: Vec::new(),
                    lp_fees: Vec::new(),
                    route: Vec::new(),
                    created_at: Instant::now(),
                    created_at_utc: Utc::now(),
                }
            }
        };

        cancel.check()?;

        let quote = Arc::new(quote);
        if quote.is_usable() {
            self.cache.insert(key, quote.clone());
        }
        metrics::record_quote_served(false);
        Ok(quote)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

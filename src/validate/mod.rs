//! Request validation: schema checks, business rules, and the
//! independent balance/slippage/freshness checks the orchestrator runs
//!
//! Format and business failures are returned as structured reports,
//! never as errors, so callers can render field-level messages.

use tokio::time::Instant;
use tracing::debug;

use crate::asset::{self, Asset, AssetRegistry};
use crate::error::{SwapError, SwapResult};
use crate::ledger::PoolInfo;
use crate::models::SwapRequest;

/// Price impact above this is flagged even when within tolerance
pub const HIGH_IMPACT_PCT: f64 = 5.0;

/// Maximum age of a quote before it must be refreshed
pub const QUOTE_MAX_AGE_MS: u64 = 30_000;

/// Outcome of request validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn ok() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    fn failed(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

/// Validate a swap request: format first, then business rules
pub fn validate_request(request: &SwapRequest, registry: &AssetRegistry) -> ValidationReport {
    let mut errors = Vec::new();

    // Format layer
    if request.pay_symbol.is_empty() {
        errors.push("Pay token is required".to_string());
    }
    if request.receive_symbol.is_empty() {
        errors.push("Receive token is required".to_string());
    }

    let pay_asset = match registry.get(&request.pay_symbol) {
        Ok(asset) => Some(asset),
        Err(e) => {
            if !request.pay_symbol.is_empty() {
                errors.push(e.user_message());
            }
            None
        }
    };
    if let Err(e) = registry.get(&request.receive_symbol) {
        if !request.receive_symbol.is_empty() {
            errors.push(e.user_message());
        }
    }

    let amount = match asset::parse_amount(&request.pay_amount) {
        Ok(amount) => Some(amount),
        Err(e) => {
            errors.push(e.user_message());
            None
        }
    };

    if let (Some(asset), Some(amount)) = (pay_asset, amount.as_ref()) {
        let digits = asset::fractional_digits(amount);
        if digits > asset.decimals as i64 {
            errors.push(format!(
                "Amount has {} decimal places but {} supports at most {}",
                digits, asset.symbol, asset.decimals
            ));
        }

        let minimum = registry.minimum_for(asset);
        if amount < minimum {
            errors.push(format!(
                "Amount is below the minimum of {} {}",
                minimum, asset.symbol
            ));
        }

        if amount > registry.max_amount() {
            errors.push("Amount exceeds the maximum supported size".to_string());
        }
    }

    if !errors.is_empty() {
        return ValidationReport::failed(errors);
    }

    // Business rules
    if request.pay_symbol == request.receive_symbol {
        errors.push("Cannot swap a token for the same token".to_string());
    }

    for symbol in [&request.pay_symbol, &request.receive_symbol] {
        if let Ok(asset) = registry.get(symbol) {
            if asset.blocked {
                errors.push(format!("Token {} is currently disabled", symbol));
            }
        }
    }

    if errors.is_empty() {
        ValidationReport::ok()
    } else {
        ValidationReport::failed(errors)
    }
}

/// Deeper consistency check run once pool state is available: a route
/// must exist either directly or through the intermediary
pub fn validate_route(
    pools: &[PoolInfo],
    pay: &str,
    receive: &str,
    intermediary: &str,
) -> SwapResult<()> {
    let direct = pools.iter().any(|p| p.trades(pay, receive));
    if direct {
        return Ok(());
    }

    let first_leg = pools.iter().any(|p| p.trades(pay, intermediary));
    let second_leg = pools.iter().any(|p| p.trades(intermediary, receive));
    if first_leg && second_leg {
        return Ok(());
    }

    Err(SwapError::NoRoute {
        pay: pay.to_string(),
        receive: receive.to_string(),
    })
}

/// Balance sufficiency, including the second-approval fee buffer for
/// assets that use the allowance pattern
pub fn validate_balance(
    pay_amount_atomic: u128,
    balance_atomic: u128,
    asset: &Asset,
    include_approval_fee: bool,
) -> SwapResult<()> {
    let mut required = pay_amount_atomic;
    if include_approval_fee && asset.requires_approval {
        required = required.saturating_add(asset.approval_fee);
    }

    if balance_atomic < required {
        return Err(SwapError::InsufficientBalance {
            have: asset::from_atomic(balance_atomic, asset.decimals).to_string(),
            need: asset::from_atomic(required, asset.decimals).to_string(),
        });
    }

    debug!(
        "Balance check passed for {}: have {}, need {}",
        asset.symbol, balance_atomic, required
    );
    Ok(())
}

/// Slippage verdict: invalid above tolerance, flagged above the fixed
/// high-impact threshold
#[derive(Debug, Clone, PartialEq)]
pub enum SlippageVerdict {
    Ok,
    /// Valid, but impact is high enough to warn about
    Warning(String),
    Exceeded(String),
}

pub fn validate_slippage(tolerance_pct: f64, impact_pct: f64) -> SlippageVerdict {
    if impact_pct > tolerance_pct {
        return SlippageVerdict::Exceeded(format!(
            "Price impact of {:.2}% exceeds your slippage tolerance of {:.2}%",
            impact_pct, tolerance_pct
        ));
    }
    if impact_pct > HIGH_IMPACT_PCT {
        return SlippageVerdict::Warning(format!(
            "High price impact: {:.2}%. Consider a smaller amount.",
            impact_pct
        ));
    }
    SlippageVerdict::Ok
}

/// Reject quotes older than `max_age_ms`
pub fn validate_quote_freshness(created_at: Instant, max_age_ms: u64) -> SwapResult<()> {
    let age_ms = created_at.elapsed().as_millis() as u64;
    if age_ms > max_age_ms {
        return Err(SwapError::QuoteExpired {
            age_ms,
            max_age_ms,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{parse_amount, AssetOrigin};
    use std::collections::HashMap;
    use std::time::Duration;

    fn test_asset(symbol: &str, decimals: u8, blocked: bool) -> Asset {
        Asset {
            symbol: symbol.to_string(),
            decimals,
            origin: AssetOrigin::Home,
            minimum_amount: None,
            approval_fee: 10_000,
            transfer_fee: 0,
            requires_approval: symbol == "USDT",
            blocked,
            foreign_mint: None,
        }
    }

    fn registry() -> AssetRegistry {
        let mut assets = HashMap::new();
        assets.insert("ICP".to_string(), test_asset("ICP", 8, false));
        assets.insert("SOL".to_string(), test_asset("SOL", 9, false));
        assets.insert("USDT".to_string(), test_asset("USDT", 6, false));
        assets.insert("RUG".to_string(), test_asset("RUG", 8, true));
        AssetRegistry::new(
            assets,
            "ICP".to_string(),
            parse_amount("0.00000001").unwrap(),
            parse_amount("1000000000000").unwrap(),
        )
    }

    fn request(pay: &str, amount: &str, receive: &str) -> SwapRequest {
        SwapRequest {
            pay_symbol: pay.to_string(),
            pay_amount: amount.to_string(),
            receive_symbol: receive.to_string(),
            receive_amount: None,
            slippage_pct: 1.0,
            user_address: None,
        }
    }

    #[test]
    fn rejects_same_token() {
        let report = validate_request(&request("ICP", "1", "ICP"), &registry());
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|e| e.contains("same token")));
    }

    #[test]
    fn accepts_smallest_unit_of_eight_decimal_asset() {
        let report = validate_request(&request("ICP", "0.00000001", "SOL"), &registry());
        assert!(report.is_valid, "errors: {:?}", report.errors);
    }

    #[test]
    fn rejects_nine_fractional_digits_on_eight_decimal_asset() {
        let report = validate_request(&request("ICP", "0.000000001", "SOL"), &registry());
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|e| e.contains("decimal places")));
    }

    #[test]
    fn rejects_blocked_and_unknown_assets() {
        let report = validate_request(&request("RUG", "1", "ICP"), &registry());
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|e| e.contains("disabled")));

        let report = validate_request(&request("DOGE", "1", "ICP"), &registry());
        assert!(!report.is_valid);
    }

    #[test]
    fn rejects_zero_negative_and_oversized_amounts() {
        assert!(!validate_request(&request("ICP", "0", "SOL"), &registry()).is_valid);
        assert!(!validate_request(&request("ICP", "-5", "SOL"), &registry()).is_valid);
        assert!(
            !validate_request(&request("ICP", "10000000000000", "SOL"), &registry()).is_valid
        );
    }

    #[test]
    fn route_check_direct_and_two_hop() {
        let pools = vec![
            PoolInfo {
                base: "SOL".into(),
                quote: "ICP".into(),
                base_reserve: 100.0,
                quote_reserve: 1_000.0,
                lp_fee_bps: 30,
            },
            PoolInfo {
                base: "ICP".into(),
                quote: "USDT".into(),
                base_reserve: 1_000.0,
                quote_reserve: 8_000.0,
                lp_fee_bps: 30,
            },
        ];

        assert!(validate_route(&pools, "SOL", "ICP", "ICP").is_ok());
        assert!(validate_route(&pools, "SOL", "USDT", "ICP").is_ok());
        assert!(matches!(
            validate_route(&pools, "SOL", "BTC", "ICP"),
            Err(SwapError::NoRoute { .. })
        ));
    }

    #[test]
    fn balance_check_includes_approval_fee() {
        let usdt = test_asset("USDT", 6, false);

        // Exactly enough for the amount but not the approval fee
        assert!(validate_balance(1_000_000, 1_000_000, &usdt, true).is_err());
        assert!(validate_balance(1_000_000, 1_010_000, &usdt, true).is_ok());
        // Without the fee buffer, the bare amount suffices
        assert!(validate_balance(1_000_000, 1_000_000, &usdt, false).is_ok());
    }

    #[test]
    fn slippage_exceeding_tolerance_is_invalid() {
        match validate_slippage(1.0, 5.0) {
            SlippageVerdict::Exceeded(msg) => {
                assert!(msg.contains("exceeds your slippage tolerance"))
            }
            other => panic!("expected Exceeded, got {:?}", other),
        }
    }

    #[test]
    fn high_impact_within_tolerance_warns() {
        assert!(matches!(
            validate_slippage(10.0, 6.0),
            SlippageVerdict::Warning(_)
        ));
        assert_eq!(validate_slippage(10.0, 0.5), SlippageVerdict::Ok);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_quotes_are_rejected() {
        let created = Instant::now();
        assert!(validate_quote_freshness(created, QUOTE_MAX_AGE_MS).is_ok());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(matches!(
            validate_quote_freshness(created, QUOTE_MAX_AGE_MS),
            Err(SwapError::QuoteExpired { .. })
        ));
    }
}

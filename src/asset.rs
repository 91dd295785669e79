//! Asset registry and decimal-amount helpers
//!
//! Amounts cross the API boundary as decimal strings and live on the
//! ledgers as atomic integer units. Everything in between goes through
//! `BigDecimal` so no user input is ever parsed as a float.

use bigdecimal::BigDecimal;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{SwapError, SwapResult};

/// Where an asset is native. Closed set: swap-mode detection matches on
/// pairs of origins exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetOrigin {
    /// Native to the home ledger
    Home,
    /// The foreign chain's native asset
    ForeignNative,
    /// A token hosted on the foreign chain
    ForeignToken,
}

/// A tradable asset as configured in the registry
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub symbol: String,
    pub decimals: u8,
    pub origin: AssetOrigin,
    /// Per-asset minimum swap amount; falls back to the registry default
    pub minimum_amount: Option<BigDecimal>,
    /// Flat fee charged by the second approval step, in atomic units
    pub approval_fee: u128,
    /// Flat transfer/gas fee on the home ledger, in atomic units
    pub transfer_fee: u128,
    /// Asset uses the two-step allowance/approve transfer pattern
    pub requires_approval: bool,
    pub blocked: bool,
    /// Token mint address on the foreign chain, when applicable
    pub foreign_mint: Option<String>,
}

impl Asset {
    pub fn is_foreign(&self) -> bool {
        matches!(
            self.origin,
            AssetOrigin::ForeignNative | AssetOrigin::ForeignToken
        )
    }
}

/// Process-wide asset registry built from configuration
#[derive(Debug, Clone)]
pub struct AssetRegistry {
    assets: HashMap<String, Asset>,
    intermediary: String,
    default_minimum: BigDecimal,
    /// Overflow guard: amounts above this are rejected outright
    max_amount: BigDecimal,
}

impl AssetRegistry {
    pub fn new(
        assets: HashMap<String, Asset>,
        intermediary: String,
        default_minimum: BigDecimal,
        max_amount: BigDecimal,
    ) -> Self {
        Self {
            assets,
            intermediary,
            default_minimum,
            max_amount,
        }
    }

    /// Look up an asset by symbol
    pub fn get(&self, symbol: &str) -> SwapResult<&Asset> {
        self.assets
            .get(symbol)
            .ok_or_else(|| SwapError::UnknownAsset(symbol.to_string()))
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.assets.contains_key(symbol)
    }

    /// Symbol of the designated two-hop routing intermediary
    pub fn intermediary(&self) -> &str {
        &self.intermediary
    }

    /// Minimum amount for an asset, falling back to the registry default
    pub fn minimum_for<'a>(&'a self, asset: &'a Asset) -> &'a BigDecimal {
        asset.minimum_amount.as_ref().unwrap_or(&self.default_minimum)
    }

    pub fn max_amount(&self) -> &BigDecimal {
        &self.max_amount
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Parse a user-entered amount string into a positive, finite decimal
pub fn parse_amount(raw: &str) -> SwapResult<BigDecimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SwapError::Validation("Amount is required".to_string()));
    }

    let parsed = BigDecimal::from_str(trimmed)
        .map_err(|_| SwapError::Validation(format!("Invalid amount: {}", raw)))?;

    if parsed <= BigDecimal::from(0u32) {
        return Err(SwapError::Validation(
            "Amount must be greater than zero".to_string(),
        ));
    }

    Ok(parsed)
}

/// Count of fractional digits as entered. "0.100000000" has nine: the
/// scale is preserved from the input, trailing zeros included.
pub fn fractional_digits(amount: &BigDecimal) -> i64 {
    let (_, scale) = amount.as_bigint_and_exponent();
    scale.max(0)
}

/// Scale a display-unit amount into atomic ledger units
pub fn to_atomic(amount: &BigDecimal, decimals: u8) -> SwapResult<u128> {
    let factor = BigDecimal::from(10u128.pow(decimals as u32));
    (amount * factor)
        .normalized()
        .to_u128()
        .ok_or_else(|| SwapError::Validation("Amount out of range".to_string()))
}

/// Scale atomic ledger units back into display units
pub fn from_atomic(atomic: u128, decimals: u8) -> BigDecimal {
    BigDecimal::from(atomic) / BigDecimal::from(10u128.pow(decimals as u32))
}

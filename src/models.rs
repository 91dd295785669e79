//! Shared request and result types used across components

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's intent to swap one asset for another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub pay_symbol: String,
    /// Decimal string as entered by the user
    pub pay_amount: String,
    pub receive_symbol: String,
    /// Expected receive amount, when the caller already holds a quote
    pub receive_amount: Option<String>,
    /// Maximum tolerated price impact, in percent
    pub slippage_pct: f64,
    pub user_address: Option<String>,
}

/// An authenticated user context. Absence means no wallet is connected.
#[derive(Debug, Clone, PartialEq)]
pub struct UserContext {
    pub address: String,
}

/// Outcome of a successfully executed swap
#[derive(Debug, Clone, Serialize)]
pub struct SwapReceipt {
    pub tx_hash: String,
    #[serde(serialize_with = "serialize_decimal")]
    pub pay_amount: BigDecimal,
    #[serde(serialize_with = "serialize_decimal")]
    pub receive_amount: BigDecimal,
    /// Correlation id carried through the execution parameters, for
    /// joining host-side logs with ledger records
    pub correlation_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

fn serialize_decimal<S>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&value.to_string())
}

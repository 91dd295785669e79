//! Error types for the swap engine

use thiserror::Error;

/// Main error type for swap operations
#[derive(Error, Debug)]
pub enum SwapError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: String, need: String },

    #[error("Quote expired ({age_ms}ms old, max {max_age_ms}ms)")]
    QuoteExpired { age_ms: u64, max_age_ms: u64 },

    #[error("Price impact {impact_pct:.2}% exceeds your slippage tolerance {tolerance_pct:.2}%")]
    SlippageExceeded { impact_pct: f64, tolerance_pct: f64 },

    #[error("Wallet not connected")]
    Unauthorized,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Execution rejected: {0}")]
    Execution(String),

    #[error("Failed after {attempts} attempts: {source}")]
    ExhaustedRetries {
        attempts: u32,
        #[source]
        source: Box<SwapError>,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("No route from {pay} to {receive}")]
    NoRoute { pay: String, receive: String },

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Message fragments that mark an error as permanently failed. Retrying
/// an attempt that matched one of these can only burn the user's funds
/// or time, never succeed.
const NON_RETRYABLE_FRAGMENTS: &[&str] = &[
    "insufficient balance",
    "insufficient funds",
    "insufficientfunds",
    "wallet not connected",
    "user rejected",
    "cancelled",
    "invalid token",
    "same token",
];

impl SwapError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            SwapError::Validation(_)
            | SwapError::InsufficientBalance { .. }
            | SwapError::SlippageExceeded { .. }
            | SwapError::Unauthorized
            | SwapError::Cancelled
            | SwapError::UnknownAsset(_)
            | SwapError::NoRoute { .. }
            | SwapError::ExhaustedRetries { .. }
            | SwapError::QuoteExpired { .. } => false,

            SwapError::Network(_) => true,

            SwapError::Execution(msg)
            | SwapError::Wallet(msg)
            | SwapError::Signing(msg)
            | SwapError::Internal(msg) => !matches_non_retryable(msg),
        }
    }

    /// Normalize into a user-presentable message. Known causes map to
    /// curated copy; unknown causes fall back to the raw message.
    pub fn user_message(&self) -> String {
        match self {
            SwapError::Validation(msg) => msg.clone(),
            SwapError::InsufficientBalance { .. } => {
                "Insufficient funds to complete the swap".to_string()
            }
            SwapError::QuoteExpired { .. } => {
                "Quote expired, please refresh and try again".to_string()
            }
            SwapError::SlippageExceeded { .. } => self.to_string(),
            SwapError::Unauthorized => "Please connect your wallet first".to_string(),
            SwapError::Network(_) => "Network error, please try again".to_string(),
            SwapError::Cancelled => "Swap cancelled".to_string(),
            SwapError::UnknownAsset(symbol) => format!("Unsupported token: {}", symbol),
            SwapError::NoRoute { pay, receive } => {
                format!("No trading route from {} to {}", pay, receive)
            }
            SwapError::ExhaustedRetries { source, .. } => source.user_message(),
            other => {
                let raw = other.to_string();
                let lower = raw.to_lowercase();
                if lower.contains("insufficientfunds") || lower.contains("insufficient funds") {
                    "Insufficient funds to complete the swap".to_string()
                } else if lower.contains("user rejected") {
                    "Transaction was rejected in the wallet".to_string()
                } else if lower.contains("network") || lower.contains("timeout") {
                    "Network error, please try again".to_string()
                } else {
                    raw
                }
            }
        }
    }
}

fn matches_non_retryable(msg: &str) -> bool {
    let lower = msg.to_lowercase();
    NON_RETRYABLE_FRAGMENTS.iter().any(|f| lower.contains(f))
}

/// Result type for swap operations
pub type SwapResult<T> = Result<T, SwapError>;

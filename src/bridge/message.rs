//! Canonical swap message
//!
//! The one wire-format contract the engine owns: the fixed, ordered
//! field list a foreign wallet signs to authorize a cross-ledger swap.
//! Serialization is deterministic; any reordering or type change breaks
//! signature verification on the receiving side and must be versioned
//! explicitly.

use sha3::{Digest, Keccak256};

/// Fields signed by the foreign wallet, in canonical order
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalSwapMessage {
    pub pay_symbol: String,
    pub pay_amount_atomic: u128,
    pub pay_address: String,
    pub receive_symbol: String,
    pub receive_amount_atomic: u128,
    pub receive_address: String,
    pub max_slippage_pct: f64,
    pub timestamp_millis: u64,
    pub referred_by: Option<String>,
}

impl CanonicalSwapMessage {
    /// Serialize to the canonical byte layout: fields in declaration
    /// order, strings length-prefixed (u32 BE), integers big-endian,
    /// the slippage as IEEE-754 bits, the optional referrer tagged with
    /// a presence byte.
    pub fn to_signable_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(128);
        push_str(&mut out, &self.pay_symbol);
        out.extend_from_slice(&self.pay_amount_atomic.to_be_bytes());
        push_str(&mut out, &self.pay_address);
        push_str(&mut out, &self.receive_symbol);
        out.extend_from_slice(&self.receive_amount_atomic.to_be_bytes());
        push_str(&mut out, &self.receive_address);
        out.extend_from_slice(&self.max_slippage_pct.to_bits().to_be_bytes());
        out.extend_from_slice(&self.timestamp_millis.to_be_bytes());
        match &self.referred_by {
            Some(code) => {
                out.push(1);
                push_str(&mut out, code);
            }
            None => out.push(0),
        }
        out
    }

    /// Keccak-256 digest of the canonical bytes; this is what gets
    /// handed to the wallet's signer
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        hasher.update(self.to_signable_bytes());
        hasher.finalize().into()
    }
}

fn push_str(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(&(value.len() as u32).to_be_bytes());
    out.extend_from_slice(value.as_bytes());
}

/// A canonical message together with the wallet's signature over its
/// digest
#[derive(Debug, Clone, PartialEq)]
pub struct SignedMessage {
    pub message: CanonicalSwapMessage,
    pub signature: String,
}

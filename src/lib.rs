//! Swapbridge - cross-ledger swap orchestration engine
//!
//! Turns a single swap intent into the sequence of independently
//! failable steps behind it: price discovery with a TTL quote cache,
//! request validation, a session state machine for UI callers, an
//! execution pipeline with bounded retry, a cross-ledger coordinator
//! that submits the pay-side transaction and polls for confirmation,
//! and a job monitor that tracks in-flight swaps to settlement.
//!
//! Ledgers, wallets and UI surfaces are consumed through the traits in
//! [`ledger`]; the engine owns no transport.

pub mod api;
pub mod asset;
pub mod bridge;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod models;
pub mod monitor;
pub mod orchestrator;
pub mod quote;
pub mod session;
pub mod validate;

pub use asset::{Asset, AssetOrigin, AssetRegistry};
pub use bridge::{BridgeConfig, CrossLedgerCoordinator, SwapMode, VerifyProgress};
pub use config::Settings;
pub use error::{SwapError, SwapResult};
pub use models::{SwapReceipt, SwapRequest, UserContext};
pub use monitor::{JobMonitor, MonitorConfig, MonitorParams};
pub use orchestrator::{Backoff, RetryPolicy, SwapOrchestrator};
pub use quote::{CancelToken, Quote, QuoteEngine};
pub use session::{SessionContext, SessionEffect, SessionEvent, SessionState};

/// Initialize tracing for hosts that do not bring their own subscriber
pub fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,swapbridge=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}

//! Swap session state machine
//!
//! A pure transition function over one user interaction's lifecycle.
//! The machine performs no I/O: transitions return the next state, the
//! next context, and a list of effects for the caller to run. Execution
//! is only reachable through the confirming state.

use std::sync::Arc;

use crate::quote::Quote;

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Quoting,
    Ready,
    Confirming,
    Executing,
    Complete,
    Error,
}

/// Events driving the session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Connect,
    Connected,
    ConnectFailed(String),
    /// Amount changed; always triggers a re-quote
    UpdateAmount { pay_amount: String },
    QuoteSuccess(Arc<Quote>),
    QuoteFailed(String),
    InitiateSwap,
    Confirm,
    Cancel,
    ExecuteSucceeded { tx_hash: String },
    ExecuteFailed(String),
    Retry,
    Reset,
}

/// Side effects for the caller to run after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    FetchQuote,
    SubmitSwap,
}

/// Form values captured from the user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwapForm {
    pub pay_symbol: String,
    pub pay_amount: String,
    pub receive_symbol: String,
    pub slippage_pct: f64,
}

/// Per-session context carried alongside the state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionContext {
    pub form: SwapForm,
    pub quote: Option<Arc<Quote>>,
    pub error: Option<String>,
    pub tx_hash: Option<String>,
}

/// Apply an event to the session, returning the next state, context and
/// effects. Unknown combinations are no-ops.
pub fn transition(
    state: SessionState,
    mut ctx: SessionContext,
    event: SessionEvent,
) -> (SessionState, SessionContext, Vec<SessionEffect>) {
    use SessionEffect::*;
    use SessionEvent::*;
    use SessionState::*;

    match (state, event) {
        (Idle, Connect) => (Connecting, ctx, vec![]),
        (Connecting, Connected) => (Idle, ctx, vec![]),
        (Connecting, ConnectFailed(reason)) => {
            ctx.error = Some(reason);
            (Error, ctx, vec![])
        }

        // Amount changes always force a fresh quote
        (Idle | Quoting | Ready, UpdateAmount { pay_amount }) => {
            ctx.form.pay_amount = pay_amount;
            ctx.quote = None;
            (Quoting, ctx, vec![FetchQuote])
        }

        (Quoting, QuoteSuccess(quote)) => {
            ctx.quote = Some(quote);
            ctx.error = None;
            (Ready, ctx, vec![])
        }
        (Quoting, QuoteFailed(reason)) => {
            ctx.error = Some(reason);
            (Error, ctx, vec![])
        }

        // A refreshed quote while ready replaces the held one
        (Ready, QuoteSuccess(quote)) => {
            ctx.quote = Some(quote);
            (Ready, ctx, vec![])
        }

        (Ready, InitiateSwap) => (Confirming, ctx, vec![]),
        (Confirming, Confirm) => (Executing, ctx, vec![SubmitSwap]),
        (Confirming, Cancel) => (Ready, ctx, vec![]),

        (Executing, ExecuteSucceeded { tx_hash }) => {
            ctx.tx_hash = Some(tx_hash);
            ctx.error = None;
            (Complete, ctx, vec![])
        }
        (Executing, ExecuteFailed(reason)) => {
            ctx.error = Some(reason);
            (Error, ctx, vec![])
        }

        (Error, Retry) => {
            ctx.error = None;
            (Idle, ctx, vec![])
        }
        (Complete | Error, Reset) => (Idle, SessionContext::default(), vec![]),

        // Anything else is a no-op
        (state, _) => (state, ctx, vec![]),
    }
}

//! Optional observability helpers for cache lookups, exchanges, and forwards.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `crm_relay.flow` with the `flow` and
//!   `stage` (call site) fields, plus debug events for cache decisions.
//! - Enable `metrics` to increment `crm_relay_flow_total` for every attempt/success/failure,
//!   labeled by `flow` + `outcome`, and `crm_relay_cache_total` labeled by `event`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Relay operations observed by the instrumentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Credential cache lookup, including any refresh it triggers.
	TokenLookup,
	/// Client-credentials exchange with the authorization server.
	TokenExchange,
	/// Authenticated forward to the downstream API.
	Forward,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::TokenLookup => "token_lookup",
			FlowKind::TokenExchange => "token_exchange",
			FlowKind::Forward => "forward",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to an instrumented operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Credential cache decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheEvent {
	/// A fresh token was served without network calls.
	Hit,
	/// No fresh token was present; a refresh follows.
	Miss,
	/// A freshly exchanged token was stored.
	Stored,
	/// A freshly exchanged token was too short-lived to store.
	Uncacheable,
}
impl CacheEvent {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheEvent::Hit => "hit",
			CacheEvent::Miss => "miss",
			CacheEvent::Stored => "stored",
			CacheEvent::Uncacheable => "uncacheable",
		}
	}
}
impl Display for CacheEvent {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

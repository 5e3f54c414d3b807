// self
use crate::{
	_prelude::*,
	obs::{CacheEvent, FlowKind},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by relay operations.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind, stage, and environment.
	pub fn new(kind: FlowKind, stage: &'static str, environment: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"crm_relay.flow",
				flow = kind.as_str(),
				stage,
				environment
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage, environment);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event describing a cache decision for `environment`.
pub fn trace_cache_event(event: CacheEvent, environment: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(event = event.as_str(), environment, "credential cache decision");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (event, environment);
	}
}

/// Emits a warning for an error converted into a boundary response.
pub fn trace_boundary_error(error: &Error, status: u16) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			kind = error.kind(),
			status,
			retryable = error.is_retryable(),
			%error,
			"request failed"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (error, status);
	}
}

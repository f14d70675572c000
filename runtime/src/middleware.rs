//! Cross-cutting concerns wrapped around each transition.
//!
//! A [`Store`](crate::Store) runs a fixed chain of [`Middleware`] built at
//! construction time. For every event, `before` hooks run in registration
//! order while the state lock is held, then the reducer, then `after` hooks
//! in reverse order with the outcome.
//!
//! Middleware observe; they cannot veto or alter a transition.
//!
//! # Example
//!
//! ```ignore
//! let reporter: Arc<dyn CrashReporter> = Arc::new(LoggingCrashReporter::new(logger.clone()));
//!
//! let store = Store::builder(state, reducer, env, executor)
//!     .middleware(TracingMiddleware)
//!     .middleware(AnalyticsMiddleware::new(analytics, Arc::clone(&reporter)))
//!     .middleware(CrashReportingMiddleware::new(reporter))
//!     .build();
//! ```

use single_entry_core::event::{AnalyticsRecord, Describe};
use single_entry_core::{DerivationError, HandlerError};
use std::fmt;
use std::sync::Arc;

/// A hook around the reducer's single entry point
pub trait Middleware<Ev>: Send + Sync {
    /// Called with the event before it is reduced
    fn before(&self, _event: &Ev) {}

    /// Called after the reducer ran
    ///
    /// `outcome` is the number of effects requested, or the rejection.
    fn after(&self, _event: &'static str, _outcome: &Result<usize, HandlerError>) {}
}

/// Something worth a crash/error report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incident {
    /// The reducer rejected an event
    Handler(HandlerError),
    /// An event could not be turned into an analytics record
    Derivation(DerivationError),
}

impl fmt::Display for Incident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler(error) => write!(f, "handler error: {error}"),
            Self::Derivation(error) => write!(f, "derivation error: {error}"),
        }
    }
}

/// Receives one analytics record per processed event
pub trait AnalyticsSink: Send + Sync {
    /// Record a processed event
    fn track(&self, record: AnalyticsRecord);
}

/// Receives error reports
pub trait CrashReporter: Send + Sync {
    /// Report an incident
    fn report(&self, incident: Incident);
}

/// Sends an [`AnalyticsRecord`] for every event
///
/// A [`DerivationError`] goes to the crash reporter as a separate incident;
/// the transition itself runs either way.
pub struct AnalyticsMiddleware {
    sink: Arc<dyn AnalyticsSink>,
    reporter: Arc<dyn CrashReporter>,
}

impl AnalyticsMiddleware {
    /// Create the middleware
    #[must_use]
    pub fn new(sink: Arc<dyn AnalyticsSink>, reporter: Arc<dyn CrashReporter>) -> Self {
        Self { sink, reporter }
    }
}

impl<Ev: Describe> Middleware<Ev> for AnalyticsMiddleware {
    fn before(&self, event: &Ev) {
        match event.describe() {
            Ok(record) => self.sink.track(record),
            Err(error) => {
                tracing::warn!(event = error.event, reason = %error.reason, "Analytics derivation failed");
                metrics::counter!("store.analytics.derivation_failed").increment(1);
                self.reporter.report(Incident::Derivation(error));
            },
        }
    }
}

/// Reports every rejected event to a [`CrashReporter`]
pub struct CrashReportingMiddleware {
    reporter: Arc<dyn CrashReporter>,
}

impl CrashReportingMiddleware {
    /// Create the middleware
    #[must_use]
    pub fn new(reporter: Arc<dyn CrashReporter>) -> Self {
        Self { reporter }
    }
}

impl<Ev> Middleware<Ev> for CrashReportingMiddleware {
    fn after(&self, _event: &'static str, outcome: &Result<usize, HandlerError>) {
        if let Err(error) = outcome {
            self.reporter.report(Incident::Handler(error.clone()));
        }
    }
}

/// Emits a `tracing` event per transition
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMiddleware;

impl<Ev: fmt::Debug> Middleware<Ev> for TracingMiddleware {
    fn before(&self, event: &Ev) {
        tracing::debug!(?event, "Handling event");
    }

    fn after(&self, event: &'static str, outcome: &Result<usize, HandlerError>) {
        match outcome {
            Ok(effects) => tracing::debug!(event, effects, "Event handled"),
            Err(error) => tracing::warn!(event, error = %error, "Event rejected"),
        }
    }
}

//! Observability and telemetry.
//!
//! Logging goes through `tracing` with an `EnvFilter`; counters go through
//! the `metrics` facade. Fallback events additionally feed
//! [`FallbackCounters`] so tests can assert on them without installing a
//! metrics recorder.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{Error, Result};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output for terminals.
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
}

impl LogFormat {
    /// Parses a format label, defaulting to `Pretty` on anything
    /// unrecognized.
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

static LOGGING_INIT: OnceLock<()> = OnceLock::new();

/// Initializes process-wide logging.
///
/// The filter comes from `RUST_LOG` when set, otherwise `debug` with
/// `verbose` and `info` without. `MATHMENTOR_LOG_FORMAT=json` switches to
/// line-delim JSON output.
///
/// # Errors
///
/// Returns an error if logging has already been initialized.
pub fn init_logging(verbose: bool) -> Result<()> {
    if LOGGING_INIT.get().is_some() {
        return Err(Error::OperationFailed {
            operation: "logging_init".to_string(),
            cause: "logging already initialized".to_string(),
        });
    }

    let default_directive = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    let format = std::env::var("MATHMENTOR_LOG_FORMAT")
        .map(|value| LogFormat::parse(&value))
        .unwrap_or_default();

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_writer(std::io::stderr),
                )
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        },
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(true)
                        .with_writer(std::io::stderr),
                )
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        },
    }

    LOGGING_INIT
        .set(())
        .map_err(|()| Error::OperationFailed {
            operation: "logging_init".to_string(),
            cause: "failed to mark logging initialized".to_string(),
        })?;

    Ok(())
}

fn init_error(e: tracing_subscriber::util::TryInitError) -> Error {
    Error::OperationFailed {
        operation: "logging_init".to_string(),
        cause: e.to_string(),
    }
}

/// A degraded-path event the pipeline survives instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackKind {
    /// Parser reply could not be decoded, fallback record used.
    Parser,
    /// Knowledge index unavailable, solving proceeded without context.
    Retrieval,
    /// Narrative generation failed, error text shipped as the solution.
    Generation,
    /// Judge reply could not be decoded, optimistic verdict used.
    Verifier,
    /// Explainer failed, placeholder explanation used.
    Explainer,
}

impl FallbackKind {
    /// Label used for the `stage` dimension on the fallback counter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parser => "parser",
            Self::Retrieval => "retrieval",
            Self::Generation => "generation",
            Self::Verifier => "verifier",
            Self::Explainer => "explainer",
        }
    }
}

impl std::fmt::Display for FallbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts of fallback events, one slot per [`FallbackKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FallbackSnapshot {
    /// Parser structure fallbacks.
    pub parser: u64,
    /// Retrieval fallbacks.
    pub retrieval: u64,
    /// Narrative generation fallbacks.
    pub generation: u64,
    /// Verifier verdict fallbacks.
    pub verifier: u64,
    /// Explainer fallbacks.
    pub explainer: u64,
}

impl FallbackSnapshot {
    /// Sum across all kinds.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.parser + self.retrieval + self.generation + self.verifier + self.explainer
    }
}

/// Process-local tallies of degraded-path events.
///
/// Each `record` also increments the `pipeline_fallback_total` counter on
/// the `metrics` facade. The local atomics exist so the pipeline can report
/// its own fallback counts and tests can observe them directly.
#[derive(Debug, Default)]
pub struct FallbackCounters {
    parser: AtomicU64,
    retrieval: AtomicU64,
    generation: AtomicU64,
    verifier: AtomicU64,
    explainer: AtomicU64,
}

impl FallbackCounters {
    /// Creates zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            parser: AtomicU64::new(0),
            retrieval: AtomicU64::new(0),
            generation: AtomicU64::new(0),
            verifier: AtomicU64::new(0),
            explainer: AtomicU64::new(0),
        }
    }

    /// Records one fallback event of the given kind.
    pub fn record(&self, kind: FallbackKind) {
        self.slot(kind).fetch_add(1, Ordering::Relaxed);
        metrics::counter!("pipeline_fallback_total", "stage" => kind.as_str()).increment(1);
    }

    /// Current count for one kind.
    #[must_use]
    pub fn count(&self, kind: FallbackKind) -> u64 {
        self.slot(kind).load(Ordering::Relaxed)
    }

    /// Copy of all counts for reporting.
    #[must_use]
    pub fn snapshot(&self) -> FallbackSnapshot {
        FallbackSnapshot {
            parser: self.parser.load(Ordering::Relaxed),
            retrieval: self.retrieval.load(Ordering::Relaxed),
            generation: self.generation.load(Ordering::Relaxed),
            verifier: self.verifier.load(Ordering::Relaxed),
            explainer: self.explainer.load(Ordering::Relaxed),
        }
    }

    const fn slot(&self, kind: FallbackKind) -> &AtomicU64 {
        match kind {
            FallbackKind::Parser => &self.parser,
            FallbackKind::Retrieval => &self.retrieval,
            FallbackKind::Generation => &self.generation,
            FallbackKind::Verifier => &self.verifier,
            FallbackKind::Explainer => &self.explainer,
        }
    }
}

impl std::fmt::Display for FallbackSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "parser={} retrieval={} generation={} verifier={} explainer={}",
            self.parser, self.retrieval, self.generation, self.verifier, self.explainer
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Pretty);
    }

    #[test]
    fn test_counters_start_at_zero() {
        let counters = FallbackCounters::new();
        assert_eq!(counters.snapshot(), FallbackSnapshot::default());
        assert_eq!(counters.snapshot().total(), 0);
    }

    #[test]
    fn test_record_increments_only_its_kind() {
        let counters = FallbackCounters::new();
        counters.record(FallbackKind::Parser);
        counters.record(FallbackKind::Parser);
        counters.record(FallbackKind::Verifier);

        assert_eq!(counters.count(FallbackKind::Parser), 2);
        assert_eq!(counters.count(FallbackKind::Verifier), 1);
        assert_eq!(counters.count(FallbackKind::Retrieval), 0);
        assert_eq!(counters.count(FallbackKind::Generation), 0);
        assert_eq!(counters.count(FallbackKind::Explainer), 0);
        assert_eq!(counters.snapshot().total(), 3);
    }

    #[test]
    fn test_snapshot_display() {
        let counters = FallbackCounters::new();
        counters.record(FallbackKind::Retrieval);
        let rendered = counters.snapshot().to_string();
        assert!(rendered.contains("retrieval=1"));
        assert!(rendered.contains("parser=0"));
    }

    #[test]
    fn test_fallback_kind_labels_are_distinct() {
        let kinds = [
            FallbackKind::Parser,
            FallbackKind::Retrieval,
            FallbackKind::Generation,
            FallbackKind::Verifier,
            FallbackKind::Explainer,
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in kinds.iter().skip(i + 1) {
                assert_ne!(a.as_str(), b.as_str());
            }
        }
    }
}

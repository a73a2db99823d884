//! Logging setup and run counters

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second init (tests, embedding) is not an error worth surfacing.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Counters for one CLI run
#[derive(Debug, Default)]
pub struct Metrics {
    resolutions: AtomicU64,
    items_accepted: AtomicU64,
    items_failed: AtomicU64,
    clones_created: AtomicU64,
    clones_failed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolution(&self) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "resolutions", "Metric incremented");
    }

    pub fn item_accepted(&self) {
        self.items_accepted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "items_accepted", "Metric incremented");
    }

    pub fn item_failed(&self) {
        self.items_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "items_failed", "Metric incremented");
    }

    pub fn clone_created(&self) {
        self.clones_created.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "clones_created", "Metric incremented");
    }

    pub fn clone_failed(&self) {
        self.clones_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "clones_failed", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            resolutions: self.resolutions.load(Ordering::Relaxed),
            items_accepted: self.items_accepted.load(Ordering::Relaxed),
            items_failed: self.items_failed.load(Ordering::Relaxed),
            clones_created: self.clones_created.load(Ordering::Relaxed),
            clones_failed: self.clones_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub resolutions: u64,
    pub items_accepted: u64,
    pub items_failed: u64,
    pub clones_created: u64,
    pub clones_failed: u64,
}

impl MetricsSnapshot {
    pub fn any_failed(&self) -> bool {
        self.items_failed > 0 || self.clones_failed > 0
    }
}

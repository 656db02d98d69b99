//! Sync metrics and observability module.
//!
//! This module provides metrics tracking for synchronization runs, including
//! provider calls, field routing outcomes, and item writes. Metrics are plain
//! instances shared via `Arc` rather than process globals, so embedders can
//! scope them per engine or per test.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters describing synchronization activity.
#[derive(Debug, Default)]
pub struct SyncMetrics {
    /// Number of calls made to translation providers
    provider_calls: AtomicUsize,

    /// Number of provider calls that failed
    provider_failures: AtomicUsize,

    /// Number of metadata fields routed through translation
    fields_translated: AtomicUsize,

    /// Number of metadata fields left untouched or copied verbatim
    fields_skipped: AtomicUsize,

    /// Number of fields whose handler reported a hard error
    field_errors: AtomicUsize,

    /// Number of target items created
    items_created: AtomicUsize,

    /// Number of target items updated in place
    items_updated: AtomicUsize,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call to a translation provider.
    pub fn record_provider_call(&self) {
        self.provider_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed provider call.
    pub fn record_provider_failure(&self) {
        self.provider_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a field routed through translation.
    pub fn record_field_translated(&self) {
        self.fields_translated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a field skipped or copied verbatim.
    pub fn record_field_skipped(&self) {
        self.fields_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a field-level handler error.
    pub fn record_field_error(&self) {
        self.field_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a newly created target item.
    pub fn record_item_created(&self) {
        self.items_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an in-place target item update.
    pub fn record_item_updated(&self) {
        self.items_updated.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current provider call count.
    pub fn provider_calls(&self) -> usize {
        self.provider_calls.load(Ordering::Relaxed)
    }

    /// Get the current provider failure count.
    pub fn provider_failures(&self) -> usize {
        self.provider_failures.load(Ordering::Relaxed)
    }

    /// Get the current translated-field count.
    pub fn fields_translated(&self) -> usize {
        self.fields_translated.load(Ordering::Relaxed)
    }

    /// Get the current skipped-field count.
    pub fn fields_skipped(&self) -> usize {
        self.fields_skipped.load(Ordering::Relaxed)
    }

    /// Get the current field-error count.
    pub fn field_errors(&self) -> usize {
        self.field_errors.load(Ordering::Relaxed)
    }

    /// Get the number of created target items.
    pub fn items_created(&self) -> usize {
        self.items_created.load(Ordering::Relaxed)
    }

    /// Get the number of updated target items.
    pub fn items_updated(&self) -> usize {
        self.items_updated.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let calls = self.provider_calls();
        let failures = self.provider_failures();
        let provider_success_rate = if calls > 0 {
            ((calls - failures) as f64 / calls as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            provider_calls: calls,
            provider_failures: failures,
            provider_success_rate,
            fields_translated: self.fields_translated(),
            fields_skipped: self.fields_skipped(),
            field_errors: self.field_errors(),
            items_created: self.items_created(),
            items_updated: self.items_updated(),
        }
    }
}

/// Metrics report containing current synchronization statistics.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    /// Number of provider calls made
    pub provider_calls: usize,

    /// Number of provider failures
    pub provider_failures: usize,

    /// Provider success rate as a percentage (0-100)
    pub provider_success_rate: f64,

    /// Number of fields routed through translation
    pub fields_translated: usize,

    /// Number of fields skipped or copied verbatim
    pub fields_skipped: usize,

    /// Number of field-level handler errors
    pub field_errors: usize,

    /// Number of target items created
    pub items_created: usize,

    /// Number of target items updated in place
    pub items_updated: usize,
}

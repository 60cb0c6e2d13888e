//! Decision counters

use crate::reconciler::{Decision, NoOpReason};
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals of reconcile decisions, shared by all tasks
#[derive(Debug, Default)]
pub struct ReconcileStats {
    evaluated: AtomicU64,
    deleted: AtomicU64,
    dry_run_deleted: AtomicU64,
    skipped_exists: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of [`ReconcileStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub evaluated: u64,
    pub deleted: u64,
    pub dry_run_deleted: u64,
    pub skipped_exists: u64,
    pub errors: u64,
}

impl ReconcileStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, decision: &Decision) {
        self.evaluated.fetch_add(1, Ordering::Relaxed);

        let counter = match decision {
            Decision::NoOp(NoOpReason::InstanceExists) => &self.skipped_exists,
            Decision::NoOp(_) => return,
            Decision::DeleteRequested { dry_run: true } => &self.dry_run_deleted,
            Decision::DeleteRequested { dry_run: false } => &self.deleted,
            Decision::Failed(_) => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            evaluated: self.evaluated.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            dry_run_deleted: self.dry_run_deleted.load(Ordering::Relaxed),
            skipped_exists: self.skipped_exists.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Render in the Prometheus text exposition format
    pub fn to_prometheus(&self) -> String {
        let counters = [
            (
                "skuttle_nodes_evaluated_total",
                "Total number of node events evaluated",
                self.evaluated,
            ),
            (
                "skuttle_node_deletions_total",
                "Total number of stale nodes deleted",
                self.deleted,
            ),
            (
                "skuttle_dry_run_deletions_total",
                "Total number of deletions skipped because of dry run mode",
                self.dry_run_deleted,
            ),
            (
                "skuttle_node_deletion_skips_total",
                "Total number of stale nodes kept because the instance still exists",
                self.skipped_exists,
            ),
            (
                "skuttle_node_errors_total",
                "Total number of node events that failed to reconcile",
                self.errors,
            ),
        ];

        let mut out = String::new();
        for (name, help, value) in counters {
            // Writing to a String cannot fail
            let _ = writeln!(out, "# HELP {} {}", name, help);
            let _ = writeln!(out, "# TYPE {} counter", name);
            let _ = writeln!(out, "{} {}", name, value);
        }
        out
    }
}

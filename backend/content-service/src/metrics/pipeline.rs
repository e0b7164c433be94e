use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec,
};

lazy_static! {
    /// Automatic moderation decisions segmented by resulting status.
    pub static ref MODERATION_DECISIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "moderation_decisions_total",
        "Automatic moderation decisions segmented by resulting status",
        &["status"]
    )
    .expect("failed to register moderation_decisions_total");

    /// Pipeline job outcomes (processed, retried, dead_letter).
    pub static ref PIPELINE_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "pipeline_jobs_total",
        "Moderation pipeline job outcomes",
        &["outcome"]
    )
    .expect("failed to register pipeline_jobs_total");

    /// Paid classifier calls refused because the rolling budget was exhausted.
    pub static ref BUDGET_BLOCKS_TOTAL: IntCounter = register_int_counter!(
        "budget_blocks_total",
        "Classifier calls routed to the local fallback because spend hit the budget limit"
    )
    .expect("failed to register budget_blocks_total");

    /// Audit log writes that failed (the primary state change is kept).
    pub static ref AUDIT_WRITE_FAILURES_TOTAL: IntCounter = register_int_counter!(
        "audit_write_failures_total",
        "Audit log writes that failed and were surfaced instead of rolled back"
    )
    .expect("failed to register audit_write_failures_total");

    /// Cache events (hit/miss/invalidate) segmented by cache name.
    pub static ref CACHE_EVENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "content_cache_events_total",
        "In-memory cache events segmented by cache and outcome",
        &["cache", "event"]
    )
    .expect("failed to register content_cache_events_total");

    /// Trending recompute runs segmented by result (success/error/skipped).
    pub static ref TRENDING_RUNS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "trending_runs_total",
        "Trending recompute runs segmented by result",
        &["result"]
    )
    .expect("failed to register trending_runs_total");
}

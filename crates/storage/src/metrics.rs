//! Prometheus metrics for the storage module.

use chainkv_metrics::TimingGuard;

pub fn set_catalog_tables(catalog: &str, count: usize) {
    static CHAINKV_CATALOG_TABLES: std::sync::LazyLock<prometheus::IntGaugeVec> =
        std::sync::LazyLock::new(|| {
            prometheus::register_int_gauge_vec!(
                "chainkv_catalog_tables",
                "Number of active tables in a finalized catalog",
                &["catalog"]
            )
            .unwrap()
        });
    CHAINKV_CATALOG_TABLES
        .with_label_values(&[catalog])
        .set(count.try_into().unwrap());
}

pub fn inc_dupsort_rejections(table: &str) {
    static CHAINKV_DUPSORT_REJECTIONS_TOTAL: std::sync::LazyLock<prometheus::IntCounterVec> =
        std::sync::LazyLock::new(|| {
            prometheus::register_int_counter_vec!(
                "chainkv_dupsort_rejections_total",
                "Count of pairs rejected by the DupSort key conversion",
                &["table"]
            )
            .unwrap()
        });
    CHAINKV_DUPSORT_REJECTIONS_TOTAL
        .with_label_values(&[table])
        .inc();
}

pub fn inc_consistency_violations(check: &str, count: usize) {
    static CHAINKV_CONSISTENCY_VIOLATIONS_TOTAL: std::sync::LazyLock<
        prometheus::IntCounterVec,
    > = std::sync::LazyLock::new(|| {
        prometheus::register_int_counter_vec!(
            "chainkv_consistency_violations_total",
            "Count of layout violations found by consistency checks",
            &["check"]
        )
        .unwrap()
    });
    CHAINKV_CONSISTENCY_VIOLATIONS_TOTAL
        .with_label_values(&[check])
        .inc_by(count.try_into().unwrap());
}

/// Start timing a consistency check. Records duration when the guard is dropped.
pub fn time_consistency_check(check: &str) -> TimingGuard {
    static CHAINKV_CONSISTENCY_CHECK_SECONDS: std::sync::LazyLock<prometheus::HistogramVec> =
        std::sync::LazyLock::new(|| {
            prometheus::register_histogram_vec!(
                "chainkv_consistency_check_seconds",
                "Duration of a consistency check over one table",
                &["check"],
                vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]
            )
            .unwrap()
        });
    TimingGuard::new(&CHAINKV_CONSISTENCY_CHECK_SECONDS.with_label_values(&[check]))
}

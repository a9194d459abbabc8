//! Timing utilities for histogram metrics.

use std::time::Instant;

use crate::Histogram;

/// A guard that records elapsed time to a histogram when dropped.
pub struct TimingGuard {
    histogram: Histogram,
    start: Instant,
}

impl TimingGuard {
    /// Starts timing. Accepts a plain histogram or one resolved from a
    /// `HistogramVec` via `with_label_values`.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: Instant::now(),
        }
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::HistogramOpts;

    #[test]
    fn guard_observes_on_drop() {
        let histogram =
            Histogram::with_opts(HistogramOpts::new("test_timing_guard", "test")).unwrap();
        {
            let _guard = TimingGuard::new(&histogram);
        }
        assert_eq!(histogram.get_sample_count(), 1);
    }
}

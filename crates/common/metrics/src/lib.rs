//! Metrics utilities and prometheus re-exports for chainkv.

mod gather;
mod timing;

pub use gather::{GatherError, gather_default_metrics};
pub use timing::TimingGuard;

pub use prometheus::{Encoder, Error as PrometheusError, Histogram, TextEncoder, gather};

//! Text exposition of the default registry.

use crate::{Encoder, PrometheusError, TextEncoder, gather};

#[derive(Debug, thiserror::Error)]
pub enum GatherError {
    #[error("failed to encode metrics: {0}")]
    Encode(#[from] PrometheusError),
    #[error("encoded metrics are not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Renders every metric of Prometheus' default registry in the text format.
///
/// The storage crate registers its collectors there on first use.
pub fn gather_default_metrics() -> Result<String, GatherError> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

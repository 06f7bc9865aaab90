use rust_decimal::Decimal;
use thiserror::Error;

/// Failures raised by the normalization and rebalancing core.
///
/// Every invalid input fails immediately with one of these kinds; the core
/// never retries, never suppresses, and never returns a partial result. A
/// trade computed against a zero price must never reach the swap router.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RebalanceError {
    #[error("amount must be non-negative, got {0}")]
    InvalidAmount(Decimal),

    #[error("price for {asset} must be positive, got {price}")]
    InvalidPrice { asset: String, price: Decimal },

    #[error("asset {0} is missing from positions or targets")]
    MissingAsset(String),

    #[error("total portfolio value must be positive to derive weights, got {0}")]
    InvalidPortfolio(Decimal),

    #[error("raw amount {0} is outside the representable decimal range")]
    AmountOutOfRange(String),

    #[error("target weight for {asset} must be non-negative, got {weight}")]
    InvalidWeight { asset: String, weight: Decimal },

    #[error("tolerance must lie in [0, 1], got {0}")]
    InvalidTolerance(Decimal),
}

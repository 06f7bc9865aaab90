//! Portfolio rebalancing math.
//!
//! Given current balances, prices and target weight fractions for a pair of
//! assets, [`compute_trades`] returns the signed amount of each asset to
//! acquire (positive) or dispose of (negative) so that the resulting value
//! shares match the targets. [`needs_rebalancing`] is the decision rule: has
//! any asset drifted from its target weight beyond a tolerance band?
//!
//! All arithmetic is `rust_decimal::Decimal`. On-chain amounts are integers
//! and the precision loss of binary floats at the normalize/denormalize
//! boundary is a real correctness risk, so the calculator works in exact
//! decimal space and callers convert to integers only at the final
//! [`crate::units::denormalize`] step.
//!
//! Both functions are pure and stateless: same inputs, same outputs, no
//! locking needed from concurrent callers.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::error::RebalanceError;

/// One asset's contribution to the portfolio at a point in time.
///
/// `balance` is in the asset's natural (human-readable) unit, `price` in the
/// common quote currency per unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetPosition {
    pub balance: Decimal,
    pub price: Decimal,
}

impl AssetPosition {
    pub fn new(balance: Decimal, price: Decimal) -> Self {
        Self { balance, price }
    }

    /// Current value of the position in the quote currency.
    pub fn value(&self) -> Decimal {
        self.balance * self.price
    }
}

/// Signed quantity of one asset to trade, in the asset's natural unit.
/// Positive means acquire, negative means dispose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeInstruction {
    pub signed_amount: Decimal,
}

/// Compute the signed trade amounts that move the portfolio to its target
/// allocation.
///
/// The trades are a valuation-neutral reallocation: the value deltas across
/// all assets sum to exactly zero, and applying the trades at the same
/// prices reproduces the target weights.
///
/// Target weights are taken literally as value fractions. Negative weights
/// are rejected; a weight sum other than 1 is honored as given (a 0.8 sum
/// deliberately leaves 20% of value unallocated).
pub fn compute_trades(
    positions: &HashMap<String, AssetPosition>,
    targets: &HashMap<String, Decimal>,
) -> Result<HashMap<String, TradeInstruction>, RebalanceError> {
    validate_asset_sets(positions, targets)?;
    validate_positions(positions)?;
    validate_targets(targets)?;

    let total_value: Decimal = positions.values().map(AssetPosition::value).sum();

    let mut trades = HashMap::with_capacity(positions.len());
    for (asset, position) in positions {
        let weight = targets[asset];
        let target_value = total_value * weight;
        let value_delta = target_value - position.value();
        let signed_amount = value_delta / position.price;
        trades.insert(asset.clone(), TradeInstruction { signed_amount });
    }
    Ok(trades)
}

/// Each asset's share of total portfolio value.
///
/// Weights are undefined for a valueless portfolio, so a non-positive total
/// fails with `InvalidPortfolio`.
pub fn actual_weights(
    positions: &HashMap<String, AssetPosition>,
) -> Result<HashMap<String, Decimal>, RebalanceError> {
    validate_positions(positions)?;

    let total_value: Decimal = positions.values().map(AssetPosition::value).sum();
    if total_value <= Decimal::ZERO {
        return Err(RebalanceError::InvalidPortfolio(total_value));
    }

    Ok(positions
        .iter()
        .map(|(asset, position)| (asset.clone(), position.value() / total_value))
        .collect())
}

/// Decide whether the portfolio has drifted from its target allocation
/// beyond `tolerance`.
///
/// Returns true iff any asset's actual weight deviates from its target by
/// strictly more than `tolerance`; a deviation exactly equal to the
/// tolerance does not trigger.
pub fn needs_rebalancing(
    positions: &HashMap<String, AssetPosition>,
    targets: &HashMap<String, Decimal>,
    tolerance: Decimal,
) -> Result<bool, RebalanceError> {
    if tolerance < Decimal::ZERO || tolerance > Decimal::ONE {
        return Err(RebalanceError::InvalidTolerance(tolerance));
    }
    validate_asset_sets(positions, targets)?;
    validate_targets(targets)?;

    let weights = actual_weights(positions)?;
    for (asset, actual_weight) in &weights {
        let deviation = (actual_weight - targets[asset]).abs();
        if deviation > tolerance {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Positions and targets must cover exactly the same assets.
fn validate_asset_sets(
    positions: &HashMap<String, AssetPosition>,
    targets: &HashMap<String, Decimal>,
) -> Result<(), RebalanceError> {
    for asset in positions.keys() {
        if !targets.contains_key(asset) {
            return Err(RebalanceError::MissingAsset(asset.clone()));
        }
    }
    for asset in targets.keys() {
        if !positions.contains_key(asset) {
            return Err(RebalanceError::MissingAsset(asset.clone()));
        }
    }
    Ok(())
}

fn validate_positions(
    positions: &HashMap<String, AssetPosition>,
) -> Result<(), RebalanceError> {
    for (asset, position) in positions {
        if position.price <= Decimal::ZERO {
            return Err(RebalanceError::InvalidPrice {
                asset: asset.clone(),
                price: position.price,
            });
        }
        if position.balance < Decimal::ZERO {
            return Err(RebalanceError::InvalidAmount(position.balance));
        }
    }
    Ok(())
}

fn validate_targets(targets: &HashMap<String, Decimal>) -> Result<(), RebalanceError> {
    for (asset, weight) in targets {
        if *weight < Decimal::ZERO {
            return Err(RebalanceError::InvalidWeight {
                asset: asset.clone(),
                weight: *weight,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    fn positions(
        usdc_balance: Decimal,
        usdc_price: Decimal,
        weth_balance: Decimal,
        weth_price: Decimal,
    ) -> HashMap<String, AssetPosition> {
        HashMap::from([
            ("usdc".to_string(), AssetPosition::new(usdc_balance, usdc_price)),
            ("weth".to_string(), AssetPosition::new(weth_balance, weth_price)),
        ])
    }

    fn targets_30_70() -> HashMap<String, Decimal> {
        HashMap::from([
            ("usdc".to_string(), dec!(0.3)),
            ("weth".to_string(), dec!(0.7)),
        ])
    }

    #[test]
    fn balanced_portfolio_needs_no_trades() {
        // $300 USDC vs $700 WETH against 30/70 targets: already balanced
        let positions = positions(dec!(300), dec!(1.0), dec!(0.2), dec!(3500));
        let trades = compute_trades(&positions, &targets_30_70()).unwrap();

        assert!(trades["usdc"].signed_amount.abs() < dec!(10));
        assert!(trades["weth"].signed_amount.abs() < dec!(0.01));
    }

    #[test]
    fn all_usdc_portfolio_sells_usdc_buys_weth() {
        // 100% in USDC, rebalance to 30/70
        let positions = positions(dec!(1000), dec!(1.0), dec!(0), dec!(3500));
        let trades = compute_trades(&positions, &targets_30_70()).unwrap();

        let usdc = trades["usdc"].signed_amount;
        let weth = trades["weth"].signed_amount;
        assert!(usdc < Decimal::ZERO, "should sell USDC, got {usdc}");
        assert!(weth > Decimal::ZERO, "should buy WETH, got {weth}");
        assert!(dec!(-750) < usdc && usdc < dec!(-650), "usdc trade {usdc}");
        assert!(dec!(0.15) < weth && weth < dec!(0.25), "weth trade {weth}");
    }

    #[test]
    fn trades_preserve_total_value() {
        // $600 + $400 = $1000 total; trades must be valuation-neutral
        let positions = positions(dec!(600), dec!(1.0), dec!(0.1), dec!(4000));
        let trades = compute_trades(&positions, &targets_30_70()).unwrap();

        let new_usdc_value = (dec!(600) + trades["usdc"].signed_amount) * dec!(1.0);
        let new_weth_value = (dec!(0.1) + trades["weth"].signed_amount) * dec!(4000);
        let new_total = new_usdc_value + new_weth_value;
        assert!(
            (new_total - dec!(1000)).abs() < dec!(1),
            "total value drifted to {new_total}"
        );
    }

    #[test]
    fn value_deltas_sum_to_zero() {
        let positions = positions(dec!(123.45), dec!(0.9997), dec!(0.731), dec!(2841.07));
        let trades = compute_trades(&positions, &targets_30_70()).unwrap();

        let delta_sum = trades["usdc"].signed_amount * dec!(0.9997)
            + trades["weth"].signed_amount * dec!(2841.07);
        assert!(
            delta_sum.abs() < dec!(0.000000001),
            "value deltas should cancel, got {delta_sum}"
        );
    }

    #[test]
    fn applying_trades_reaches_target_weights() {
        let positions = positions(dec!(850), dec!(1.0), dec!(0.05), dec!(3000));
        let trades = compute_trades(&positions, &targets_30_70()).unwrap();

        let new_usdc_value = (dec!(850) + trades["usdc"].signed_amount) * dec!(1.0);
        let new_weth_value = (dec!(0.05) + trades["weth"].signed_amount) * dec!(3000);
        let total = new_usdc_value + new_weth_value;
        let usdc_weight = new_usdc_value / total;
        let weth_weight = new_weth_value / total;

        assert!((usdc_weight - dec!(0.3)).abs() < dec!(0.000000001));
        assert!((weth_weight - dec!(0.7)).abs() < dec!(0.000000001));
    }

    #[test]
    fn exact_target_allocation_is_idempotent() {
        // $30 USDC + $70 WETH at 30/70: every trade is exactly zero
        let positions = positions(dec!(30), dec!(1.0), dec!(0.02), dec!(3500));
        let trades = compute_trades(&positions, &targets_30_70()).unwrap();

        assert_eq!(trades["usdc"].signed_amount, Decimal::ZERO);
        assert_eq!(trades["weth"].signed_amount, Decimal::ZERO);
    }

    #[test]
    fn two_asset_trades_have_opposite_signs() {
        // With weights summing to 1, one side buys iff the other sells
        let positions = positions(dec!(900), dec!(1.0), dec!(0.01), dec!(2500));
        let trades = compute_trades(&positions, &targets_30_70()).unwrap();

        let usdc = trades["usdc"].signed_amount;
        let weth = trades["weth"].signed_amount;
        assert!(
            (usdc > Decimal::ZERO) != (weth > Decimal::ZERO),
            "expected opposite signs, got usdc={usdc} weth={weth}"
        );
    }

    #[test]
    fn weights_below_one_leave_value_unallocated() {
        // Weight sum 0.8 is honored literally, not renormalized
        let positions = positions(dec!(500), dec!(1.0), dec!(0.125), dec!(4000));
        let targets = HashMap::from([
            ("usdc".to_string(), dec!(0.4)),
            ("weth".to_string(), dec!(0.4)),
        ]);
        let trades = compute_trades(&positions, &targets).unwrap();

        // Total value 1000; each side targets 400
        assert_eq!(trades["usdc"].signed_amount, dec!(-100));
        assert_eq!(trades["weth"].signed_amount, dec!(-0.025));
    }

    #[test]
    fn zero_price_is_rejected() {
        let positions = positions(dec!(100), dec!(1.0), dec!(1), dec!(0));
        let err = compute_trades(&positions, &targets_30_70()).unwrap_err();
        assert_eq!(
            err,
            RebalanceError::InvalidPrice { asset: "weth".to_string(), price: dec!(0) }
        );
    }

    #[test]
    fn negative_price_is_rejected() {
        let positions = positions(dec!(100), dec!(-1.0), dec!(1), dec!(3500));
        assert!(matches!(
            compute_trades(&positions, &targets_30_70()),
            Err(RebalanceError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn negative_balance_is_rejected() {
        let positions = positions(dec!(-5), dec!(1.0), dec!(1), dec!(3500));
        assert_eq!(
            compute_trades(&positions, &targets_30_70()).unwrap_err(),
            RebalanceError::InvalidAmount(dec!(-5))
        );
    }

    #[test]
    fn negative_weight_is_rejected() {
        let positions = positions(dec!(100), dec!(1.0), dec!(1), dec!(3500));
        let targets = HashMap::from([
            ("usdc".to_string(), dec!(-0.3)),
            ("weth".to_string(), dec!(1.3)),
        ]);
        assert!(matches!(
            compute_trades(&positions, &targets),
            Err(RebalanceError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn position_without_target_is_rejected() {
        let positions = positions(dec!(100), dec!(1.0), dec!(1), dec!(3500));
        let targets = HashMap::from([("usdc".to_string(), dec!(1))]);
        assert_eq!(
            compute_trades(&positions, &targets).unwrap_err(),
            RebalanceError::MissingAsset("weth".to_string())
        );
    }

    #[test]
    fn target_without_position_is_rejected() {
        let positions = HashMap::from([
            ("usdc".to_string(), AssetPosition::new(dec!(100), dec!(1.0))),
        ]);
        let err = compute_trades(&positions, &targets_30_70()).unwrap_err();
        assert_eq!(err, RebalanceError::MissingAsset("weth".to_string()));
    }

    #[test]
    fn on_target_allocation_within_tolerance() {
        // Actual weights exactly 0.3/0.7 with tolerance 0.1
        let positions = positions(dec!(300), dec!(1.0), dec!(0.2), dec!(3500));
        let triggered = needs_rebalancing(&positions, &targets_30_70(), dec!(0.1)).unwrap();
        assert!(!triggered);
    }

    #[test]
    fn deviation_equal_to_tolerance_does_not_trigger() {
        // Actual weights 0.4/0.6 vs targets 0.3/0.7: deviation exactly 0.1
        let positions = positions(dec!(400), dec!(1.0), dec!(0.6), dec!(1000));
        let triggered = needs_rebalancing(&positions, &targets_30_70(), dec!(0.1)).unwrap();
        assert!(!triggered, "a tie must not trigger a rebalance");
    }

    #[test]
    fn deviation_just_over_tolerance_triggers() {
        // Actual weights 0.4001/0.5999: deviation 0.1001 > 0.1
        let positions = positions(dec!(400.1), dec!(1.0), dec!(0.5999), dec!(1000));
        let triggered = needs_rebalancing(&positions, &targets_30_70(), dec!(0.1)).unwrap();
        assert!(triggered, "any positive excess over the band must trigger");
    }

    #[test]
    fn zero_tolerance_triggers_on_any_drift() {
        let positions = positions(dec!(301), dec!(1.0), dec!(0.2), dec!(3500));
        assert!(needs_rebalancing(&positions, &targets_30_70(), dec!(0)).unwrap());
    }

    #[test]
    fn empty_portfolio_cannot_derive_weights() {
        let positions = positions(dec!(0), dec!(1.0), dec!(0), dec!(3500));
        assert_eq!(
            needs_rebalancing(&positions, &targets_30_70(), dec!(0.1)).unwrap_err(),
            RebalanceError::InvalidPortfolio(dec!(0))
        );
    }

    #[test]
    fn tolerance_outside_unit_interval_is_rejected() {
        let positions = positions(dec!(300), dec!(1.0), dec!(0.2), dec!(3500));
        assert_eq!(
            needs_rebalancing(&positions, &targets_30_70(), dec!(1.5)).unwrap_err(),
            RebalanceError::InvalidTolerance(dec!(1.5))
        );
        assert_eq!(
            needs_rebalancing(&positions, &targets_30_70(), dec!(-0.1)).unwrap_err(),
            RebalanceError::InvalidTolerance(dec!(-0.1))
        );
    }

    #[test]
    fn actual_weights_sum_to_one() {
        let positions = positions(dec!(321), dec!(1.0), dec!(0.5), dec!(2900));
        let weights = actual_weights(&positions).unwrap();
        let sum: Decimal = weights.values().copied().sum();
        assert!((sum - Decimal::ONE).abs() < dec!(0.000000001), "weights sum {sum}");
    }

    #[test]
    fn identical_inputs_give_identical_outputs() {
        let positions = positions(dec!(412.7), dec!(1.0001), dec!(0.33), dec!(3117.42));
        let first = compute_trades(&positions, &targets_30_70()).unwrap();
        let second = compute_trades(&positions, &targets_30_70()).unwrap();
        assert_eq!(first["usdc"], second["usdc"]);
        assert_eq!(first["weth"], second["weth"]);
    }
}

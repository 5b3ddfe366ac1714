#![deny(warnings)]

//! Upgrade economy for Overhead.
//!
//! This crate provides:
//! - Flat and doubling upgrade cost curves
//! - The wallet holding the shared currency balance
//! - Purchase errors shared by every module
//! - Piecewise progress-bar math over the unlock levels

use overhead_core::{CurrencyDelta, Thresholds};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Reasons a purchase is refused. A refused purchase never changes state.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PurchaseError {
    /// Balance is below the cost.
    #[error("not enough funds: costs {cost}, balance is {balance}")]
    InsufficientFunds { cost: Decimal, balance: Decimal },
    /// One-time upgrade already owned.
    #[error("upgrade already purchased")]
    AlreadyOwned,
    /// Every stakeholder in the pool already signs documents.
    #[error("no stakeholders left to add")]
    PoolExhausted,
    /// The module has not been started yet.
    #[error("module not started")]
    NotStarted,
}

/// Cost function of an upgrade.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum CostCurve {
    /// Same price every time.
    Flat(Decimal),
    /// `base * 2^count`.
    Doubling(Decimal),
}

impl CostCurve {
    /// Price of the next purchase after `count` previous ones.
    pub fn cost_at(self, count: u32) -> Decimal {
        match self {
            CostCurve::Flat(base) => base,
            CostCurve::Doubling(base) => doubling_cost(base, count),
        }
    }
}

/// `base * 2^count`, saturating at `Decimal::MAX`.
///
/// Example:
/// assert_eq!(doubling_cost(Decimal::new(200, 0), 3), Decimal::new(1600, 0));
pub fn doubling_cost(base: Decimal, count: u32) -> Decimal {
    let two = Decimal::TWO;
    let mut cost = base;
    for _ in 0..count {
        if cost.is_zero() {
            break;
        }
        match cost.checked_mul(two) {
            Some(next) => cost = next,
            None => return Decimal::MAX,
        }
    }
    cost
}

/// Check `balance` against `cost` and return the debit to apply.
pub fn charge(balance: Decimal, cost: Decimal) -> Result<CurrencyDelta, PurchaseError> {
    if balance < cost {
        return Err(PurchaseError::InsufficientFunds { cost, balance });
    }
    Ok(CurrencyDelta::debit(cost))
}

/// The shared currency balance. Never negative.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    balance: Decimal,
}

impl Wallet {
    pub fn new(starting: Decimal) -> Self {
        Self {
            balance: starting.max(Decimal::ZERO),
        }
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn can_afford(&self, cost: Decimal) -> bool {
        self.balance >= cost
    }

    /// Apply a module's currency event. A debit larger than the balance is
    /// clamped to zero.
    pub fn apply(&mut self, delta: CurrencyDelta) {
        let next = self.balance.saturating_add(delta.amount());
        if next < Decimal::ZERO {
            warn!(balance = %self.balance, delta = %delta.amount(), "debit exceeds balance");
            self.balance = Decimal::ZERO;
        } else {
            self.balance = next;
        }
    }

    /// Check and deduct in one step.
    pub fn spend(&mut self, cost: Decimal) -> Result<(), PurchaseError> {
        let delta = charge(self.balance, cost)?;
        self.apply(delta);
        Ok(())
    }
}

/// Lower and upper output bounds of the level the player is in.
///
/// The first level runs up to the Corporation threshold, the second up to the
/// World threshold, the last up to the win threshold.
pub fn level_bounds(t: &Thresholds, module2_unlocked: bool, module3_unlocked: bool) -> (f64, f64) {
    if module3_unlocked {
        (t.module3, t.win)
    } else if module2_unlocked {
        (t.module2, t.module3)
    } else {
        (0.0, t.module2)
    }
}

/// Percentage of `value` through `[floor, ceiling]`, clamped to `[0, 100]`.
pub fn level_progress(value: f64, floor: f64, ceiling: f64) -> f64 {
    let span = ceiling - floor;
    if !(span.is_finite() && span > 0.0) || !value.is_finite() {
        return 0.0;
    }
    ((value - floor) / span * 100.0).clamp(0.0, 100.0)
}

/// Counter step scaled by a uniform factor in `[1 - pct, 1 + pct]`.
pub fn fluctuated_step<R: Rng + ?Sized>(step: f64, pct: f64, rng: &mut R) -> f64 {
    if pct <= 0.0 {
        return step;
    }
    let u: f64 = rng.gen_range(-pct..=pct);
    step * (1.0 + u)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn doubling_cost_doubles() {
        let base = Decimal::new(200, 0);
        assert_eq!(doubling_cost(base, 0), base);
        assert_eq!(doubling_cost(base, 3), Decimal::new(1600, 0));
    }

    #[test]
    fn doubling_cost_saturates() {
        assert_eq!(doubling_cost(Decimal::new(1, 0), 500), Decimal::MAX);
    }

    #[test]
    fn flat_curve_ignores_count() {
        let c = CostCurve::Flat(Decimal::new(50, 0));
        assert_eq!(c.cost_at(0), c.cost_at(9));
    }

    #[test]
    fn spend_exact_balance() {
        let mut w = Wallet::new(Decimal::new(1000, 0));
        w.spend(Decimal::new(1000, 0)).unwrap();
        assert_eq!(w.balance(), Decimal::ZERO);
        let err = w.spend(Decimal::new(1, 0)).unwrap_err();
        assert_eq!(
            err,
            PurchaseError::InsufficientFunds {
                cost: Decimal::new(1, 0),
                balance: Decimal::ZERO
            }
        );
        assert_eq!(w.balance(), Decimal::ZERO);
    }

    #[test]
    fn oversized_debit_clamps_to_zero() {
        let mut w = Wallet::new(Decimal::new(5, 0));
        w.apply(CurrencyDelta::debit(Decimal::new(10, 0)));
        assert_eq!(w.balance(), Decimal::ZERO);
    }

    #[test]
    fn level_bounds_follow_unlocks() {
        let t = Thresholds::default();
        assert_eq!(level_bounds(&t, false, false), (0.0, t.module2));
        assert_eq!(level_bounds(&t, true, false), (t.module2, t.module3));
        assert_eq!(level_bounds(&t, true, true), (t.module3, t.win));
    }

    #[test]
    fn level_progress_midpoint() {
        assert_eq!(level_progress(150.0, 100.0, 200.0), 50.0);
    }

    #[test]
    fn zero_fluctuation_is_exact() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(fluctuated_step(4.0, 0.0, &mut rng), 4.0);
    }

    proptest! {
        #[test]
        fn nth_purchase_costs_base_times_two_pow_n_minus_one(base in 1i64..1_000_000, n in 1u32..40) {
            let b = Decimal::new(base, 0);
            let expected = b * Decimal::from(1u64 << (n - 1));
            prop_assert_eq!(CostCurve::Doubling(b).cost_at(n - 1), expected);
        }

        #[test]
        fn spend_deducts_exactly_or_nothing(balance in 0i64..100_000, cost in 0i64..100_000) {
            let mut w = Wallet::new(Decimal::new(balance, 0));
            let before = w.balance();
            match w.spend(Decimal::new(cost, 0)) {
                Ok(()) => prop_assert_eq!(w.balance(), before - Decimal::new(cost, 0)),
                Err(_) => {
                    prop_assert!(balance < cost);
                    prop_assert_eq!(w.balance(), before);
                }
            }
        }

        #[test]
        fn progress_is_clamped(v in -1e12f64..1e12, floor in 0.0f64..1e6, span in 1.0f64..1e9) {
            let p = level_progress(v, floor, floor + span);
            prop_assert!((0.0..=100.0).contains(&p));
        }

        #[test]
        fn fluctuation_stays_in_band(seed in any::<u64>(), step in 0.0f64..1000.0, pct in 0.0f64..0.99) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let s = fluctuated_step(step, pct, &mut rng);
            prop_assert!(s >= step * (1.0 - pct) - 1e-9);
            prop_assert!(s <= step * (1.0 + pct) + 1e-9);
        }
    }
}

//! Legacy buy-counter surface.
//!
//! Counters tick on their own and are shown to the player, but they never
//! feed the output value.

use overhead_core::CounterConfig;
use overhead_econ::{fluctuated_step, PurchaseError, Wallet};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Stream id kept clear of the gameplay modules' streams.
const COUNTER_STREAM: u64 = 4;

/// Serializable snapshot for hosts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CountersView {
    pub values: Vec<f64>,
    pub step: f64,
}

pub struct LegacyCounters {
    cfg: CounterConfig,
    values: Vec<f64>,
    step: f64,
    since_tick: Duration,
    rng: ChaCha8Rng,
}

impl LegacyCounters {
    pub fn new(cfg: CounterConfig, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(COUNTER_STREAM);
        let step = cfg.base_step;
        Self {
            cfg,
            values: Vec::new(),
            step,
            since_tick: Duration::ZERO,
            rng,
        }
    }

    fn tick(&self) -> Duration {
        Duration::from_millis(self.cfg.tick_ms.max(1))
    }

    /// Buy a new counter. Returns its index.
    pub fn buy(&mut self, wallet: &mut Wallet) -> Result<usize, PurchaseError> {
        wallet.spend(self.cfg.counter_cost)?;
        self.values.push(0.0);
        debug!(count = self.values.len(), "counter bought");
        Ok(self.values.len() - 1)
    }

    /// Double the step of every counter. Returns the new step.
    pub fn upgrade_step(&mut self, wallet: &mut Wallet) -> Result<f64, PurchaseError> {
        wallet.spend(self.cfg.step_cost)?;
        self.step *= 2.0;
        debug!(step = self.step, "counter step doubled");
        Ok(self.step)
    }

    pub fn advance(&mut self, dt: Duration) {
        self.since_tick += dt;
        let tick = self.tick();
        while self.since_tick >= tick {
            self.since_tick -= tick;
            for v in &mut self.values {
                *v += fluctuated_step(self.step, self.cfg.fluctuation_pct, &mut self.rng);
            }
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn view(&self) -> CountersView {
        CountersView {
            values: self.values.clone(),
            step: self.step,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn buying_needs_funds() {
        let mut c = LegacyCounters::new(CounterConfig::default(), 1);
        let mut wallet = Wallet::new(Decimal::new(99, 0));
        assert!(matches!(
            c.buy(&mut wallet),
            Err(PurchaseError::InsufficientFunds { .. })
        ));
        assert!(c.values().is_empty());
        assert_eq!(wallet.balance(), Decimal::new(99, 0));
    }

    #[test]
    fn counters_fluctuate_within_bounds() {
        let mut c = LegacyCounters::new(CounterConfig::default(), 1);
        let mut wallet = Wallet::new(Decimal::new(700, 0));
        c.buy(&mut wallet).unwrap();
        assert_eq!(c.upgrade_step(&mut wallet).unwrap(), 2.0);
        assert_eq!(wallet.balance(), Decimal::new(100, 0));
        c.advance(Duration::from_millis(1_000));
        // 100 ticks of 2 +/- 20%
        let v = c.values()[0];
        assert!((160.0..=240.0).contains(&v), "value {v}");
    }

    #[test]
    fn partial_ticks_carry_over() {
        let cfg = CounterConfig {
            fluctuation_pct: 0.0,
            ..CounterConfig::default()
        };
        let mut c = LegacyCounters::new(cfg, 1);
        let mut wallet = Wallet::new(Decimal::new(100, 0));
        c.buy(&mut wallet).unwrap();
        for _ in 0..4 {
            c.advance(Duration::from_millis(5));
        }
        assert_eq!(c.values()[0], 2.0);
    }
}

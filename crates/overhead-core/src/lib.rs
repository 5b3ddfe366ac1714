#![deny(warnings)]

//! Core domain types and invariants for Overhead.
//!
//! This crate defines the pieces every game module shares: the module
//! capability trait, metrics reported to the aggregator, the currency event
//! modules emit, configuration with validation, and the static reference
//! pools the modules sample from.

pub mod config;
pub mod opm;
pub mod pools;

pub use config::{
    validate_config, validate_with_pools, CorporationConfig, CounterConfig, DebugConfig,
    GameConfig, MailboxConfig, Thresholds, ValidationError, WorldConfig,
};
pub use opm::OpmTracker;
pub use pools::{validate_pools, Mail, Pools};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Deterministic RNG used by every module.
pub type GameRng = ChaCha8Rng;

/// Build an RNG for one module. Each module draws from its own stream of the
/// same seed so modules never perturb each other's sequences.
pub fn module_rng(seed: u64, kind: ModuleKind) -> GameRng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(kind.stream_id());
    rng
}

/// The three gameplay modules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModuleKind {
    /// Inbox minigame, always unlocked.
    Mailbox,
    /// Document-signing loop.
    Corporation,
    /// Email cascade accrual.
    World,
}

impl ModuleKind {
    /// All modules in display order.
    pub const ALL: [ModuleKind; 3] = [ModuleKind::Mailbox, ModuleKind::Corporation, ModuleKind::World];

    fn stream_id(self) -> u64 {
        match self {
            ModuleKind::Mailbox => 1,
            ModuleKind::Corporation => 2,
            ModuleKind::World => 3,
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModuleKind::Mailbox => "Mailbox",
            ModuleKind::Corporation => "Corporation",
            ModuleKind::World => "World",
        };
        f.write_str(name)
    }
}

/// Read-only metrics a module exposes to the aggregator and to hosts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModuleMetrics {
    /// Display name of the module.
    pub name: String,
    /// Overhead contributed by this module; summed into the output value.
    pub primary_value: f64,
    /// Human-readable status line.
    pub label: String,
    /// Smoothed overhead per minute.
    pub opm: f64,
    /// Current production multiplier.
    pub multiplier: f64,
}

/// Signed change to the shared currency balance, emitted by modules and
/// applied by the aggregator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyDelta(pub Decimal);

impl CurrencyDelta {
    /// A credit of `amount`.
    pub fn credit(amount: Decimal) -> Self {
        CurrencyDelta(amount)
    }

    /// A debit of `amount`.
    pub fn debit(amount: Decimal) -> Self {
        CurrencyDelta(-amount)
    }

    pub fn amount(self) -> Decimal {
        self.0
    }
}

/// Capability shared by every gameplay module.
///
/// Modules own their state exclusively. They never touch the wallet: any
/// currency change is pushed into `deltas` and applied by the caller.
pub trait GameModule {
    /// Which module this is.
    fn kind(&self) -> ModuleKind;

    /// Current metrics for aggregation and display.
    fn metrics(&self) -> ModuleMetrics;

    /// Consume `dt` of simulated time, running every transition that falls
    /// inside it in order.
    fn advance(&mut self, dt: Duration, deltas: &mut Vec<CurrencyDelta>);

    /// Whether the module is visible to the player.
    fn is_unlocked(&self) -> bool;

    /// Make the module visible. Unlocking is permanent.
    fn unlock(&mut self);
}

/// `2^exponent` as a float multiplier, saturating to infinity for absurd
/// exponents.
pub fn pow2(exponent: u32) -> f64 {
    2f64.powi(exponent.min(i32::MAX as u32) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn module_streams_differ_for_same_seed() {
        let mut a = module_rng(7, ModuleKind::Mailbox);
        let mut b = module_rng(7, ModuleKind::Corporation);
        let xs: Vec<u32> = (0..4).map(|_| a.gen()).collect();
        let ys: Vec<u32> = (0..4).map(|_| b.gen()).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn module_rng_is_reproducible() {
        let mut a = module_rng(42, ModuleKind::World);
        let mut b = module_rng(42, ModuleKind::World);
        assert_eq!(a.gen::<u64>(), b.gen::<u64>());
    }

    #[test]
    fn currency_delta_signs() {
        assert_eq!(CurrencyDelta::debit(Decimal::new(5, 0)).amount(), Decimal::new(-5, 0));
        assert_eq!(CurrencyDelta::credit(Decimal::new(5, 0)).amount(), Decimal::new(5, 0));
    }

    #[test]
    fn pow2_matches_shift() {
        assert_eq!(pow2(0), 1.0);
        assert_eq!(pow2(10), 1024.0);
    }

    #[test]
    fn metrics_serde_roundtrip() {
        let m = ModuleMetrics {
            name: "Mailbox".into(),
            primary_value: 10.0,
            label: "Mails handled: 1".into(),
            opm: 0.0,
            multiplier: 10.0,
        };
        let s = serde_json::to_string(&m).unwrap();
        let back: ModuleMetrics = serde_json::from_str(&s).unwrap();
        assert_eq!(back, m);
    }
}

//! Game configuration with defaults and validation.
//!
//! Every numeric constant of the game is a tuning value, so all of them live
//! here and can be overridden from a YAML file. Missing keys fall back to the
//! defaults below.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

use crate::pools::Pools;

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seed for deterministic RNG.
    pub rng_seed: u64,
    /// Balance at game start.
    pub starting_money: Decimal,
    /// Interval between UI ticks (output recompute and unlock checks).
    pub ui_tick_ms: u64,
    /// Interval between chart delta samples.
    pub chart_interval_ms: u64,
    /// Maximum points retained in the chart series.
    pub chart_max_points: usize,
    /// Unlock and win thresholds on the output value.
    pub thresholds: Thresholds,
    pub mailbox: MailboxConfig,
    pub corporation: CorporationConfig,
    pub world: WorldConfig,
    pub counters: CounterConfig,
    pub debug: DebugConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rng_seed: 42,
            starting_money: Decimal::ZERO,
            ui_tick_ms: 100,
            chart_interval_ms: 10_000,
            chart_max_points: 30,
            thresholds: Thresholds::default(),
            mailbox: MailboxConfig::default(),
            corporation: CorporationConfig::default(),
            world: WorldConfig::default(),
            counters: CounterConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl GameConfig {
    /// Parse a YAML document and validate it.
    pub fn from_yaml_str(text: &str) -> Result<Self, ValidationError> {
        let cfg: GameConfig =
            serde_yaml::from_str(text).map_err(|e| ValidationError::Parse(e.to_string()))?;
        validate_config(&cfg)?;
        Ok(cfg)
    }

    pub fn ui_tick(&self) -> Duration {
        Duration::from_millis(self.ui_tick_ms)
    }

    pub fn chart_interval(&self) -> Duration {
        Duration::from_millis(self.chart_interval_ms)
    }
}

/// Output-value thresholds. Each must be strictly greater than the previous.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Corporation unlocks at this aggregate overhead.
    pub module2: f64,
    /// World unlocks at this aggregate overhead.
    pub module3: f64,
    /// Reaching this ends the game.
    pub win: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            module2: 200_000.0,
            module3: 2_000_000.0,
            win: 100_000_000_000.0,
        }
    }
}

/// Mailbox tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    /// Items per cycle before the mailbox upgrade.
    pub mail_total: usize,
    /// Items per cycle once the mailbox upgrade is owned.
    pub mail_total_upgraded: usize,
    /// Length of the post-reply countdown, in whole seconds.
    pub sync_seconds: u32,
    /// Per-item delay of the automation.
    pub auto_check_delay_ms: u64,
    /// Delay before automation restarts after a reset.
    pub auto_start_delay_ms: u64,
    /// Overhead per reply before doublings.
    pub base_multiplier: f64,
    pub auto_mail_cost: Decimal,
    pub instant_sync_cost: Decimal,
    pub faster_auto_mail_cost: Decimal,
    pub select_all_cost: Decimal,
    pub increase_mailbox_cost: Decimal,
    pub double_mailbox_base_cost: Decimal,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            mail_total: 5,
            mail_total_upgraded: 10,
            sync_seconds: 10,
            auto_check_delay_ms: 50,
            auto_start_delay_ms: 500,
            base_multiplier: 10.0,
            auto_mail_cost: Decimal::new(100, 0),
            instant_sync_cost: Decimal::new(200, 0),
            faster_auto_mail_cost: Decimal::new(150, 0),
            select_all_cost: Decimal::new(750, 0),
            increase_mailbox_cost: Decimal::new(1000, 0),
            double_mailbox_base_cost: Decimal::new(200, 0),
        }
    }
}

/// Corporation tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorporationConfig {
    /// Delay per signature at speed multiplier 1.
    pub signature_delay_ms: u64,
    /// Scope creep added per completed revision.
    pub scope_creep_increment: u32,
    /// Scope creep added when a stakeholder joins.
    pub stakeholder_scope_creep: u32,
    /// Scope creep at which a document completes.
    pub scope_creep_max: u32,
    /// Hours wasted per signatory on completion, before doublings.
    pub hours_per_signatory: f64,
    /// Currency granted per completed document.
    pub completion_reward: Decimal,
    /// How long the hours-wasted banner stays up.
    pub banner_ms: u64,
    pub stakeholder_cost: Decimal,
    pub comm_officer_base_cost: Decimal,
    pub double_corporation_base_cost: Decimal,
    /// Signers every document starts with.
    pub initial_stakeholders: Vec<String>,
    /// Names a stakeholder purchase can draw from.
    pub stakeholder_pool: Vec<String>,
}

impl Default for CorporationConfig {
    fn default() -> Self {
        let pool = [
            "CEO",
            "CFO",
            "CTO",
            "Legal",
            "HR",
            "Marketing",
            "Sales",
            "External Auditor",
            "Board Member",
            "Compliance Officer",
            "Regional Manager",
            "Department Head",
            "Project Lead",
        ];
        Self {
            signature_delay_ms: 200,
            scope_creep_increment: 5,
            stakeholder_scope_creep: 10,
            scope_creep_max: 100,
            hours_per_signatory: 100.0,
            completion_reward: Decimal::new(1000, 0),
            banner_ms: 2000,
            stakeholder_cost: Decimal::new(50, 0),
            comm_officer_base_cost: Decimal::new(500, 0),
            double_corporation_base_cost: Decimal::new(1000, 0),
            initial_stakeholders: vec!["CEO".into(), "CFO".into(), "Legal".into()],
            stakeholder_pool: pool.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// World tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub mail_base_cost: Decimal,
    pub contact_base_cost: Decimal,
    /// Overhead per email sent.
    pub emails_multiplier: f64,
    pub initial_mails_per_second: u32,
    pub initial_contacts: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            mail_base_cost: Decimal::new(100, 0),
            contact_base_cost: Decimal::new(200, 0),
            emails_multiplier: 1_000_000.0,
            initial_mails_per_second: 0,
            initial_contacts: 1,
        }
    }
}

/// Legacy counter tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    pub counter_cost: Decimal,
    pub step_cost: Decimal,
    pub tick_ms: u64,
    pub base_step: f64,
    /// Each increment is scaled by a factor in `[1 - pct, 1 + pct]`.
    pub fluctuation_pct: f64,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            counter_cost: Decimal::new(100, 0),
            step_cost: Decimal::new(500, 0),
            tick_ms: 10,
            base_step: 1.0,
            fluctuation_pct: 0.2,
        }
    }
}

/// Debug surface tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// One-time bonus granted when debug mode is first enabled.
    pub money_bonus: Decimal,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            money_bonus: Decimal::new(1_000_000_000_000, 0),
        }
    }
}

/// Validation errors for configuration and static data.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// The document could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
    /// A duration that drives a timer must be > 0.
    #[error("{0} must be > 0")]
    ZeroDuration(&'static str),
    /// Numeric field must be finite and non-negative.
    #[error("{0} must be finite and >= 0")]
    InvalidNumber(&'static str),
    /// Price or cost must be non-negative.
    #[error("negative monetary value: {0}")]
    NegativeMoney(&'static str),
    /// Thresholds must strictly increase.
    #[error("thresholds must satisfy 0 < module2 < module3 < win")]
    ThresholdOrder,
    /// Mailbox sizes must be > 0 and the upgrade must not shrink it.
    #[error("invalid mailbox size: {normal} normal, {upgraded} upgraded")]
    MailboxSize { normal: usize, upgraded: usize },
    /// A pool cannot satisfy a draw without replacement.
    #[error("{pool} pool has {available} entries, needs {needed}")]
    PoolTooSmall {
        pool: &'static str,
        needed: usize,
        available: usize,
    },
    /// Stakeholder names must be unique.
    #[error("duplicate stakeholder: {0}")]
    DuplicateStakeholder(String),
    /// The scope creep meter needs a positive range and increment.
    #[error("scope creep increment and max must be > 0")]
    ScopeCreep,
}

fn non_negative(value: f64, field: &'static str) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::InvalidNumber(field));
    }
    Ok(())
}

fn money(value: Decimal, field: &'static str) -> Result<(), ValidationError> {
    if value < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney(field));
    }
    Ok(())
}

fn unique_names(names: &[String]) -> Result<(), ValidationError> {
    let mut seen = BTreeSet::new();
    for n in names {
        if !seen.insert(n.as_str()) {
            return Err(ValidationError::DuplicateStakeholder(n.clone()));
        }
    }
    Ok(())
}

/// Validate thresholds.
pub fn validate_thresholds(t: &Thresholds) -> Result<(), ValidationError> {
    let ordered = t.module2.is_finite()
        && t.module3.is_finite()
        && t.win.is_finite()
        && t.module2 > 0.0
        && t.module2 < t.module3
        && t.module3 < t.win;
    if !ordered {
        return Err(ValidationError::ThresholdOrder);
    }
    Ok(())
}

/// Validate mailbox settings.
pub fn validate_mailbox(m: &MailboxConfig) -> Result<(), ValidationError> {
    if m.mail_total == 0 || m.mail_total_upgraded < m.mail_total {
        return Err(ValidationError::MailboxSize {
            normal: m.mail_total,
            upgraded: m.mail_total_upgraded,
        });
    }
    if m.auto_check_delay_ms == 0 {
        return Err(ValidationError::ZeroDuration("mailbox.auto_check_delay_ms"));
    }
    non_negative(m.base_multiplier, "mailbox.base_multiplier")?;
    money(m.auto_mail_cost, "mailbox.auto_mail_cost")?;
    money(m.instant_sync_cost, "mailbox.instant_sync_cost")?;
    money(m.faster_auto_mail_cost, "mailbox.faster_auto_mail_cost")?;
    money(m.select_all_cost, "mailbox.select_all_cost")?;
    money(m.increase_mailbox_cost, "mailbox.increase_mailbox_cost")?;
    money(m.double_mailbox_base_cost, "mailbox.double_mailbox_base_cost")?;
    Ok(())
}

/// Validate corporation settings, including the stakeholder pool.
pub fn validate_corporation(c: &CorporationConfig) -> Result<(), ValidationError> {
    if c.signature_delay_ms == 0 {
        return Err(ValidationError::ZeroDuration("corporation.signature_delay_ms"));
    }
    if c.scope_creep_increment == 0 || c.scope_creep_max == 0 {
        return Err(ValidationError::ScopeCreep);
    }
    non_negative(c.hours_per_signatory, "corporation.hours_per_signatory")?;
    money(c.completion_reward, "corporation.completion_reward")?;
    money(c.stakeholder_cost, "corporation.stakeholder_cost")?;
    money(c.comm_officer_base_cost, "corporation.comm_officer_base_cost")?;
    money(
        c.double_corporation_base_cost,
        "corporation.double_corporation_base_cost",
    )?;
    if c.initial_stakeholders.is_empty() {
        return Err(ValidationError::PoolTooSmall {
            pool: "initial stakeholder",
            needed: 1,
            available: 0,
        });
    }
    unique_names(&c.initial_stakeholders)?;
    unique_names(&c.stakeholder_pool)?;
    Ok(())
}

/// Validate world settings.
pub fn validate_world(w: &WorldConfig) -> Result<(), ValidationError> {
    money(w.mail_base_cost, "world.mail_base_cost")?;
    money(w.contact_base_cost, "world.contact_base_cost")?;
    non_negative(w.emails_multiplier, "world.emails_multiplier")?;
    if w.initial_contacts == 0 {
        return Err(ValidationError::InvalidNumber("world.initial_contacts"));
    }
    Ok(())
}

/// Validate the whole configuration.
pub fn validate_config(cfg: &GameConfig) -> Result<(), ValidationError> {
    if cfg.ui_tick_ms == 0 {
        return Err(ValidationError::ZeroDuration("ui_tick_ms"));
    }
    if cfg.chart_interval_ms == 0 {
        return Err(ValidationError::ZeroDuration("chart_interval_ms"));
    }
    if cfg.counters.tick_ms == 0 {
        return Err(ValidationError::ZeroDuration("counters.tick_ms"));
    }
    money(cfg.starting_money, "starting_money")?;
    money(cfg.debug.money_bonus, "debug.money_bonus")?;
    money(cfg.counters.counter_cost, "counters.counter_cost")?;
    money(cfg.counters.step_cost, "counters.step_cost")?;
    non_negative(cfg.counters.base_step, "counters.base_step")?;
    if !(0.0..1.0).contains(&cfg.counters.fluctuation_pct) {
        return Err(ValidationError::InvalidNumber("counters.fluctuation_pct"));
    }
    validate_thresholds(&cfg.thresholds)?;
    validate_mailbox(&cfg.mailbox)?;
    validate_corporation(&cfg.corporation)?;
    validate_world(&cfg.world)?;
    Ok(())
}

/// Validate a configuration together with the pools it will sample from.
pub fn validate_with_pools(cfg: &GameConfig, pools: &Pools) -> Result<(), ValidationError> {
    validate_config(cfg)?;
    crate::pools::validate_pools(pools, cfg.mailbox.mail_total_upgraded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn defaults_are_valid() {
        validate_config(&GameConfig::default()).unwrap();
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let cfg = GameConfig::from_yaml_str(
            "rng_seed: 7\nmailbox:\n  sync_seconds: 2\nthresholds:\n  win: 100000000\n",
        )
        .unwrap();
        assert_eq!(cfg.rng_seed, 7);
        assert_eq!(cfg.mailbox.sync_seconds, 2);
        assert_eq!(cfg.mailbox.mail_total, 5);
        assert_eq!(cfg.thresholds.module2, 200_000.0);
        assert_eq!(cfg.thresholds.win, 100_000_000.0);
    }

    #[test]
    fn yaml_money_accepts_plain_numbers() {
        let cfg = GameConfig::from_yaml_str("starting_money: 1000\n").unwrap();
        assert_eq!(cfg.starting_money, Decimal::new(1000, 0));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = GameConfig::from_yaml_str("rng_seed: [").unwrap_err();
        assert!(matches!(err, ValidationError::Parse(_)));
    }

    #[test]
    fn unordered_thresholds_rejected() {
        let mut cfg = GameConfig::default();
        cfg.thresholds.module3 = cfg.thresholds.module2;
        assert_eq!(validate_config(&cfg), Err(ValidationError::ThresholdOrder));
    }

    #[test]
    fn shrinking_mailbox_upgrade_rejected() {
        let mut cfg = GameConfig::default();
        cfg.mailbox.mail_total_upgraded = 3;
        assert!(matches!(
            validate_config(&cfg),
            Err(ValidationError::MailboxSize { .. })
        ));
    }

    #[test]
    fn duplicate_stakeholders_rejected() {
        let mut cfg = GameConfig::default();
        cfg.corporation.initial_stakeholders = vec!["CEO".into(), "CEO".into()];
        assert_eq!(
            validate_config(&cfg),
            Err(ValidationError::DuplicateStakeholder("CEO".into()))
        );
    }

    #[test]
    fn negative_cost_rejected() {
        let mut cfg = GameConfig::default();
        cfg.world.mail_base_cost = Decimal::new(-1, 0);
        assert_eq!(
            validate_config(&cfg),
            Err(ValidationError::NegativeMoney("world.mail_base_cost"))
        );
    }

    proptest! {
        #[test]
        fn ordered_thresholds_accepted(a in 1.0f64..1e6, b in 1.0f64..1e6, c in 1.0f64..1e6) {
            let t = Thresholds { module2: a, module3: a + b, win: a + b + c };
            prop_assert!(validate_thresholds(&t).is_ok());
        }
    }
}

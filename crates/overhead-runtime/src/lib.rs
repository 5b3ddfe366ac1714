#![deny(warnings)]

//! Game loop for Overhead.
//!
//! [`Game`] owns the wallet and the three modules. Hosts drive it with
//! [`Game::advance`] and the action methods, and read it back through
//! [`Game::view`]. Every UI tick the output value is recomputed, unlock
//! thresholds are checked and the progress bar is refreshed.

pub mod chart;
pub mod counters;

pub use chart::{clock_label, ChartPoint, DeltaSeries};
pub use counters::{CountersView, LegacyCounters};

use overhead_core::{
    validate_with_pools, CurrencyDelta, GameConfig, GameModule, ModuleKind, ModuleMetrics, Pools,
    ValidationError,
};
use overhead_econ::{level_bounds, level_progress, PurchaseError, Wallet};
use overhead_modules::{
    CorporationModule, CorporationUpgrade, CorporationView, MailboxModule, MailboxUpgrade,
    MailboxView, ModuleError, WorldModule, WorldUpgrade, WorldView,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Longest slice handed to the modules in one step; below the world's
/// frame guard so long UI ticks still accrue.
pub const MAX_SLICE: Duration = Duration::from_millis(500);

/// Unlock flags. Each flips from false to true at most once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unlocks {
    /// Corporation unlocked.
    pub module2: bool,
    /// World unlocked.
    pub module3: bool,
    /// Goal reached; the game is over.
    pub win: bool,
}

/// Threshold events, in the order they happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Milestone {
    CorporationUnlocked,
    WorldUnlocked,
    Won,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneReached {
    pub milestone: Milestone,
    /// Simulated time of the UI tick that saw the threshold crossed.
    pub at_ms: u64,
}

/// State shared across modules.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GameState {
    pub wallet: Wallet,
    /// Aggregate overhead as of the last UI tick.
    pub output_value: f64,
    /// Progress through the current level, in percent.
    pub progress: f64,
    pub unlocks: Unlocks,
    pub milestones: Vec<MilestoneReached>,
}

/// Any upgrade the player can buy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Upgrade {
    Mailbox(MailboxUpgrade),
    Corporation(CorporationUpgrade),
    World(WorldUpgrade),
}

impl Upgrade {
    /// Every upgrade, module by module.
    pub fn all() -> impl Iterator<Item = Upgrade> {
        MailboxUpgrade::ALL
            .into_iter()
            .map(Upgrade::Mailbox)
            .chain(CorporationUpgrade::ALL.into_iter().map(Upgrade::Corporation))
            .chain(WorldUpgrade::ALL.into_iter().map(Upgrade::World))
    }

    pub fn module(self) -> ModuleKind {
        match self {
            Upgrade::Mailbox(_) => ModuleKind::Mailbox,
            Upgrade::Corporation(_) => ModuleKind::Corporation,
            Upgrade::World(_) => ModuleKind::World,
        }
    }
}

/// Reasons a player action is refused. A refused action changes nothing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActionError {
    #[error(transparent)]
    Purchase(#[from] PurchaseError),
    #[error("{0} is locked")]
    ModuleLocked(ModuleKind),
    #[error("{0}")]
    InvalidState(ModuleError),
    #[error("the game is over")]
    GameOver,
}

impl From<ModuleError> for ActionError {
    fn from(e: ModuleError) -> Self {
        match e {
            ModuleError::Purchase(p) => ActionError::Purchase(p),
            ModuleError::Locked(kind) => ActionError::ModuleLocked(kind),
            other => ActionError::InvalidState(other),
        }
    }
}

/// An upgrade currently on sale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpgradeOffer {
    pub upgrade: Upgrade,
    pub cost: Decimal,
    pub affordable: bool,
}

/// Serializable snapshot of everything a host renders.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameView {
    pub clock_ms: u64,
    pub money: Decimal,
    pub output_value: f64,
    pub progress: f64,
    pub unlocks: Unlocks,
    pub milestones: Vec<MilestoneReached>,
    pub modules: Vec<ModuleMetrics>,
    pub mailbox: MailboxView,
    pub corporation: CorporationView,
    pub world: WorldView,
    pub counters: CountersView,
    pub chart: Vec<ChartPoint>,
    pub offers: Vec<UpgradeOffer>,
}

/// Sum of every module's primary value.
pub fn compute_output_value(modules: &[&dyn GameModule]) -> f64 {
    modules.iter().map(|m| m.metrics().primary_value).sum()
}

/// The aggregator: wallet, modules and the UI and chart ticks.
pub struct Game {
    cfg: GameConfig,
    state: GameState,
    mailbox: MailboxModule,
    corporation: CorporationModule,
    world: WorldModule,
    counters: LegacyCounters,
    chart: DeltaSeries,
    clock: Duration,
    since_ui_tick: Duration,
    since_chart: Duration,
    deltas: Vec<CurrencyDelta>,
    #[cfg(feature = "debug-tools")]
    debug_enabled: bool,
}

impl Game {
    /// Build a game. Invalid configuration or pools are rejected up front.
    pub fn new(cfg: GameConfig, pools: Pools) -> Result<Self, ValidationError> {
        validate_with_pools(&cfg, &pools)?;
        let seed = cfg.rng_seed;
        let mut game = Self {
            state: GameState {
                wallet: Wallet::new(cfg.starting_money),
                ..GameState::default()
            },
            mailbox: MailboxModule::new(cfg.mailbox.clone(), pools.clone(), seed),
            corporation: CorporationModule::new(cfg.corporation.clone(), pools, seed),
            world: WorldModule::new(cfg.world.clone()),
            counters: LegacyCounters::new(cfg.counters.clone(), seed),
            chart: DeltaSeries::new(cfg.chart_max_points),
            clock: Duration::ZERO,
            since_ui_tick: Duration::ZERO,
            since_chart: Duration::ZERO,
            deltas: Vec::new(),
            #[cfg(feature = "debug-tools")]
            debug_enabled: false,
            cfg,
        };
        game.ui_tick();
        info!(seed, "game created");
        Ok(game)
    }

    pub fn config(&self) -> &GameConfig {
        &self.cfg
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn money(&self) -> Decimal {
        self.state.wallet.balance()
    }

    pub fn output_value(&self) -> f64 {
        self.state.output_value
    }

    pub fn progress(&self) -> f64 {
        self.state.progress
    }

    pub fn unlocks(&self) -> Unlocks {
        self.state.unlocks
    }

    pub fn is_over(&self) -> bool {
        self.state.unlocks.win
    }

    /// Simulated time since the game was created.
    pub fn clock(&self) -> Duration {
        self.clock
    }

    pub fn mailbox(&self) -> &MailboxModule {
        &self.mailbox
    }

    pub fn corporation(&self) -> &CorporationModule {
        &self.corporation
    }

    pub fn world(&self) -> &WorldModule {
        &self.world
    }

    pub fn counters(&self) -> &LegacyCounters {
        &self.counters
    }

    pub fn chart(&self) -> &DeltaSeries {
        &self.chart
    }

    fn modules(&self) -> [&dyn GameModule; 3] {
        [&self.mailbox, &self.corporation, &self.world]
    }

    pub fn compute_output_value(&self) -> f64 {
        compute_output_value(&self.modules())
    }

    /// Advance simulated time by `dt`.
    ///
    /// Time is consumed in slices that end on UI tick boundaries and never
    /// exceed [`MAX_SLICE`], so a single large `dt` behaves like many small
    /// frames. After the win the game no longer moves.
    pub fn advance(&mut self, dt: Duration) {
        let ui_tick = self.cfg.ui_tick();
        let chart_interval = self.cfg.chart_interval();
        let mut left = dt;
        while !left.is_zero() && !self.is_over() {
            let step = left.min(ui_tick - self.since_ui_tick).min(MAX_SLICE);
            left -= step;
            self.step_modules(step);
            self.counters.advance(step);
            self.clock += step;
            self.since_ui_tick += step;
            self.since_chart += step;
            if self.since_ui_tick >= ui_tick {
                self.since_ui_tick = Duration::ZERO;
                self.ui_tick();
            }
            if self.since_chart >= chart_interval {
                self.since_chart -= chart_interval;
                let value = self.compute_output_value();
                self.chart.sample(self.clock, value);
            }
        }
    }

    fn step_modules(&mut self, step: Duration) {
        self.mailbox.advance(step, &mut self.deltas);
        self.corporation.advance(step, &mut self.deltas);
        self.world.advance(step, &mut self.deltas);
        self.apply_deltas();
    }

    fn apply_deltas(&mut self) {
        for delta in self.deltas.drain(..) {
            self.state.wallet.apply(delta);
        }
    }

    fn ui_tick(&mut self) {
        self.state.output_value = self.compute_output_value();
        self.check_unlocks();
        let (floor, ceiling) = level_bounds(
            &self.cfg.thresholds,
            self.state.unlocks.module2,
            self.state.unlocks.module3,
        );
        self.state.progress = level_progress(self.state.output_value, floor, ceiling);
    }

    fn check_unlocks(&mut self) {
        let output = self.state.output_value;
        let t = self.cfg.thresholds.clone();
        if !self.state.unlocks.module2 && output >= t.module2 {
            self.unlock_corporation();
        }
        if !self.state.unlocks.module3 && output >= t.module3 {
            self.unlock_world();
        }
        if !self.state.unlocks.win && output >= t.win {
            self.state.unlocks.win = true;
            self.record(Milestone::Won);
            info!(output, "overhead goal reached");
        }
    }

    fn unlock_corporation(&mut self) {
        self.state.unlocks.module2 = true;
        self.corporation.unlock();
        self.record(Milestone::CorporationUnlocked);
    }

    fn unlock_world(&mut self) {
        self.state.unlocks.module3 = true;
        self.world.unlock();
        self.record(Milestone::WorldUnlocked);
    }

    fn record(&mut self, milestone: Milestone) {
        self.state.milestones.push(MilestoneReached {
            milestone,
            at_ms: self.clock.as_millis() as u64,
        });
    }

    fn ensure_running(&self) -> Result<(), ActionError> {
        if self.is_over() {
            return Err(ActionError::GameOver);
        }
        Ok(())
    }

    fn ensure_unlocked(&self, kind: ModuleKind) -> Result<(), ActionError> {
        let unlocked = match kind {
            ModuleKind::Mailbox => true,
            ModuleKind::Corporation => self.corporation.is_unlocked(),
            ModuleKind::World => self.world.is_unlocked(),
        };
        if unlocked {
            Ok(())
        } else {
            Err(ActionError::ModuleLocked(kind))
        }
    }

    /// Current price of an upgrade.
    pub fn cost(&self, upgrade: Upgrade) -> Decimal {
        match upgrade {
            Upgrade::Mailbox(u) => self.mailbox.cost(u),
            Upgrade::Corporation(u) => self.corporation.cost(u),
            Upgrade::World(u) => self.world.cost(u),
        }
    }

    /// Whether the upgrade is on sale right now, ignoring funds.
    pub fn is_available(&self, upgrade: Upgrade) -> bool {
        if self.is_over() || self.ensure_unlocked(upgrade.module()).is_err() {
            return false;
        }
        match upgrade {
            Upgrade::Mailbox(u) => self.mailbox.is_available(u),
            Upgrade::Corporation(u) => self.corporation.is_available(u),
            Upgrade::World(u) => self.world.is_available(u),
        }
    }

    /// Upgrades on sale with their prices.
    pub fn offers(&self) -> Vec<UpgradeOffer> {
        Upgrade::all()
            .filter(|u| self.is_available(*u))
            .map(|upgrade| {
                let cost = self.cost(upgrade);
                UpgradeOffer {
                    upgrade,
                    cost,
                    affordable: self.state.wallet.can_afford(cost),
                }
            })
            .collect()
    }

    /// Buy an upgrade. The balance check and the deduction happen together;
    /// on failure nothing changes.
    pub fn purchase(&mut self, upgrade: Upgrade) -> Result<(), ActionError> {
        self.ensure_running()?;
        self.ensure_unlocked(upgrade.module())?;
        let balance = self.state.wallet.balance();
        let delta = match upgrade {
            Upgrade::Mailbox(u) => self.mailbox.purchase(u, balance)?,
            Upgrade::Corporation(u) => self.corporation.purchase(u, balance)?,
            Upgrade::World(u) => self.world.purchase(u, balance)?,
        };
        self.state.wallet.apply(delta);
        debug!(?upgrade, money = %self.money(), "purchase applied");
        Ok(())
    }

    /// Buy a legacy counter. Returns its index.
    pub fn buy_counter(&mut self) -> Result<usize, ActionError> {
        self.ensure_running()?;
        Ok(self.counters.buy(&mut self.state.wallet)?)
    }

    /// Double the legacy counter step. Returns the new step.
    pub fn upgrade_step(&mut self) -> Result<f64, ActionError> {
        self.ensure_running()?;
        Ok(self.counters.upgrade_step(&mut self.state.wallet)?)
    }

    /// Flip a mail checkbox. Returns the new checked state.
    pub fn toggle_mail(&mut self, index: usize) -> Result<bool, ActionError> {
        self.ensure_running()?;
        let checked = self.mailbox.toggle_mail(index, &mut self.deltas)?;
        self.apply_deltas();
        Ok(checked)
    }

    pub fn select_all_mail(&mut self) -> Result<(), ActionError> {
        self.ensure_running()?;
        self.mailbox.select_all(&mut self.deltas)?;
        self.apply_deltas();
        Ok(())
    }

    pub fn reply_all(&mut self) -> Result<(), ActionError> {
        self.ensure_running()?;
        self.mailbox.reply_all(&mut self.deltas)?;
        self.apply_deltas();
        Ok(())
    }

    pub fn start_corporation(&mut self) -> Result<(), ActionError> {
        self.ensure_running()?;
        Ok(self.corporation.start()?)
    }

    pub fn start_world(&mut self) -> Result<(), ActionError> {
        self.ensure_running()?;
        Ok(self.world.start()?)
    }

    pub fn view(&self) -> GameView {
        GameView {
            clock_ms: self.clock.as_millis() as u64,
            money: self.money(),
            output_value: self.state.output_value,
            progress: self.state.progress,
            unlocks: self.state.unlocks,
            milestones: self.state.milestones.clone(),
            modules: self.modules().iter().map(|m| m.metrics()).collect(),
            mailbox: self.mailbox.view(),
            corporation: self.corporation.view(),
            world: self.world.view(),
            counters: self.counters.view(),
            chart: self.chart.points().cloned().collect(),
            offers: self.offers(),
        }
    }
}

#[cfg(feature = "debug-tools")]
impl Game {
    /// Turn on debug mode. The money bonus is granted only the first time;
    /// returns whether it was.
    pub fn enable_debug(&mut self) -> Result<bool, ActionError> {
        self.ensure_running()?;
        if self.debug_enabled {
            return Ok(false);
        }
        self.debug_enabled = true;
        let bonus = self.cfg.debug.money_bonus;
        self.state.wallet.apply(CurrencyDelta::credit(bonus));
        info!(%bonus, "debug mode enabled");
        Ok(true)
    }

    /// Unlock a module regardless of the output value.
    pub fn force_unlock(&mut self, kind: ModuleKind) -> Result<(), ActionError> {
        self.ensure_running()?;
        match kind {
            ModuleKind::Mailbox => {}
            ModuleKind::Corporation if !self.state.unlocks.module2 => self.unlock_corporation(),
            ModuleKind::World if !self.state.unlocks.module3 => self.unlock_world(),
            ModuleKind::Corporation | ModuleKind::World => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overhead_core::Thresholds;
    use proptest::prelude::*;

    fn game_with(f: impl FnOnce(&mut GameConfig)) -> Game {
        let mut cfg = GameConfig::default();
        f(&mut cfg);
        Game::new(cfg, Pools::default()).unwrap()
    }

    fn reply_once(g: &mut Game) {
        for i in 0..g.mailbox().mails().len() {
            g.toggle_mail(i).unwrap();
        }
        g.reply_all().unwrap();
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = GameConfig {
            ui_tick_ms: 0,
            ..GameConfig::default()
        };
        assert_eq!(
            Game::new(cfg, Pools::default()).err(),
            Some(ValidationError::ZeroDuration("ui_tick_ms"))
        );
    }

    #[test]
    fn output_updates_only_on_ui_tick() {
        let mut g = game_with(|_| {});
        reply_once(&mut g);
        assert_eq!(g.output_value(), 0.0);
        g.advance(Duration::from_millis(99));
        assert_eq!(g.output_value(), 0.0);
        g.advance(Duration::from_millis(1));
        assert_eq!(g.output_value(), 10.0);
        assert_eq!(g.money(), Decimal::new(10, 0));
    }

    #[test]
    fn locked_modules_refuse_actions() {
        let mut g = game_with(|_| {});
        assert_eq!(
            g.start_corporation(),
            Err(ActionError::ModuleLocked(ModuleKind::Corporation))
        );
        assert_eq!(
            g.purchase(Upgrade::World(WorldUpgrade::Mail)),
            Err(ActionError::ModuleLocked(ModuleKind::World))
        );
        assert!(g
            .offers()
            .iter()
            .all(|o| o.upgrade.module() == ModuleKind::Mailbox));
    }

    #[test]
    fn failed_purchase_changes_nothing() {
        let mut g = game_with(|c| c.starting_money = Decimal::new(99, 0));
        let err = g.purchase(Upgrade::Mailbox(MailboxUpgrade::AutoMail));
        assert!(matches!(
            err,
            Err(ActionError::Purchase(PurchaseError::InsufficientFunds { .. }))
        ));
        assert_eq!(g.money(), Decimal::new(99, 0));
        assert!(!g.mailbox().upgrades().auto_mail);
    }

    #[test]
    fn mailbox_state_errors_surface_as_invalid_state() {
        let mut g = game_with(|_| {});
        assert_eq!(
            g.reply_all(),
            Err(ActionError::InvalidState(ModuleError::NotReady { remaining: 5 }))
        );
    }

    #[test]
    fn progress_moves_to_next_level_after_unlock() {
        let mut g = game_with(|c| {
            c.thresholds = Thresholds {
                module2: 10.0,
                module3: 110.0,
                win: 1_000.0,
            };
        });
        reply_once(&mut g);
        g.advance(Duration::from_millis(100));
        assert!(g.unlocks().module2);
        assert_eq!(g.progress(), 0.0);
        g.advance(Duration::from_secs(10));
        reply_once(&mut g);
        g.advance(Duration::from_millis(100));
        assert!((g.progress() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn chart_samples_every_interval() {
        let mut g = game_with(|_| {});
        reply_once(&mut g);
        g.advance(Duration::from_secs(25));
        let points: Vec<&ChartPoint> = g.chart().points().collect();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].delta, 10.0);
        assert_eq!(points[1].delta, 0.0);
        assert_eq!(points[0].label, "00:00");
    }

    #[test]
    fn chart_between_ui_ticks_uses_fresh_output() {
        let mut g = game_with(|c| {
            c.ui_tick_ms = 1_000;
            c.chart_interval_ms = 500;
        });
        reply_once(&mut g);
        g.advance(Duration::from_millis(500));
        assert_eq!(g.output_value(), 0.0);
        let points: Vec<&ChartPoint> = g.chart().points().collect();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].delta, 10.0);
    }

    #[test]
    fn counters_do_not_feed_output() {
        let mut g = game_with(|c| c.starting_money = Decimal::new(100, 0));
        g.buy_counter().unwrap();
        g.advance(Duration::from_secs(2));
        assert!(g.counters().values()[0] > 0.0);
        assert_eq!(g.output_value(), 0.0);
    }

    #[test]
    fn upgrade_catalogue_covers_every_module() {
        assert_eq!(Upgrade::all().count(), 11);
    }

    #[cfg(feature = "debug-tools")]
    #[test]
    fn debug_bonus_is_granted_once() {
        let mut g = game_with(|_| {});
        assert_eq!(g.enable_debug(), Ok(true));
        assert_eq!(g.enable_debug(), Ok(false));
        assert_eq!(g.money(), Decimal::new(1_000_000_000_000, 0));
        g.force_unlock(ModuleKind::World).unwrap();
        assert!(g.world().is_unlocked());
        g.start_world().unwrap();
    }

    proptest! {
        #[test]
        fn frame_size_does_not_change_outcome(frames in proptest::collection::vec(1u64..3_000, 1..40)) {
            let total: u64 = frames.iter().sum();
            let mut split = game_with(|c| c.starting_money = Decimal::new(100, 0));
            let mut whole = game_with(|c| c.starting_money = Decimal::new(100, 0));
            split.purchase(Upgrade::Mailbox(MailboxUpgrade::AutoMail)).unwrap();
            whole.purchase(Upgrade::Mailbox(MailboxUpgrade::AutoMail)).unwrap();
            for f in &frames {
                split.advance(Duration::from_millis(*f));
            }
            whole.advance(Duration::from_millis(total));
            prop_assert_eq!(split.view(), whole.view());
        }

        #[test]
        fn unlocks_never_revert(steps in proptest::collection::vec(0u64..20_000, 1..20)) {
            let mut g = game_with(|c| {
                c.starting_money = Decimal::new(100, 0);
                c.thresholds.module2 = 50.0;
            });
            g.purchase(Upgrade::Mailbox(MailboxUpgrade::AutoMail)).unwrap();
            let mut seen = Unlocks::default();
            for s in steps {
                g.advance(Duration::from_millis(s));
                let now = g.unlocks();
                prop_assert!(now.module2 >= seen.module2);
                prop_assert!(now.module3 >= seen.module3);
                seen = now;
            }
        }
    }
}

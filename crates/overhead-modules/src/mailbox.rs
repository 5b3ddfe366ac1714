//! Mailbox: select every mail, reply all, wait for the sync, repeat.

use std::time::Duration;

use overhead_core::{
    module_rng, pow2, CurrencyDelta, GameModule, GameRng, Mail, MailboxConfig, ModuleKind,
    ModuleMetrics, OpmTracker, Pools,
};
use overhead_econ::{charge, CostCurve, PurchaseError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{credit_f64, ModuleError};

const SYNC_TICK: Duration = Duration::from_secs(1);

/// One mail in the current cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailItem {
    pub mail: Mail,
    pub checked: bool,
}

/// Where the current cycle stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MailPhase {
    /// Some mails are still unchecked.
    Selecting { remaining: usize },
    /// Every mail is checked; reply-all is available.
    Ready,
    /// Post-reply countdown.
    Syncing { seconds_left: u32 },
}

/// Mailbox upgrades.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MailboxUpgrade {
    AutoMail,
    FasterAutoMail,
    InstantSync,
    IncreaseMailbox,
    SelectAll,
    DoubleMailbox,
}

impl MailboxUpgrade {
    pub const ALL: [MailboxUpgrade; 6] = [
        MailboxUpgrade::AutoMail,
        MailboxUpgrade::FasterAutoMail,
        MailboxUpgrade::InstantSync,
        MailboxUpgrade::IncreaseMailbox,
        MailboxUpgrade::SelectAll,
        MailboxUpgrade::DoubleMailbox,
    ];
}

/// Owned mailbox upgrades.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxUpgrades {
    pub auto_mail: bool,
    pub faster_auto_mail: bool,
    pub instant_sync: bool,
    pub increase_mailbox: bool,
    pub select_all: bool,
    pub double_mailbox_count: u32,
}

/// Serializable snapshot for hosts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MailboxView {
    pub mails: Vec<MailItem>,
    pub phase: MailPhase,
    pub mail_handled: u64,
    pub total_overhead: f64,
    pub auto_running: bool,
    pub upgrades: MailboxUpgrades,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Automation {
    Idle,
    /// Scheduled to start once the timer runs out.
    Pending(Duration),
    /// Checking mails one by one; `next == mails.len()` means only the final
    /// wait before replying is left.
    Running { next: usize, wait: Duration },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Countdown {
    seconds_left: u32,
    until_tick: Duration,
}

/// The always-unlocked inbox minigame.
pub struct MailboxModule {
    cfg: MailboxConfig,
    pools: Pools,
    rng: GameRng,
    mails: Vec<MailItem>,
    mail_handled: u64,
    total_overhead: f64,
    sync: Option<Countdown>,
    automation: Automation,
    upgrades: MailboxUpgrades,
    opm: OpmTracker,
}

impl MailboxModule {
    pub fn new(cfg: MailboxConfig, pools: Pools, seed: u64) -> Self {
        let mut module = Self {
            cfg,
            pools,
            rng: module_rng(seed, ModuleKind::Mailbox),
            mails: Vec::new(),
            mail_handled: 0,
            total_overhead: 0.0,
            sync: None,
            automation: Automation::Idle,
            upgrades: MailboxUpgrades::default(),
            opm: OpmTracker::default(),
        };
        module.draw_mails();
        module
    }

    /// Mails per cycle with the current upgrades.
    pub fn mail_total(&self) -> usize {
        if self.upgrades.increase_mailbox {
            self.cfg.mail_total_upgraded
        } else {
            self.cfg.mail_total
        }
    }

    /// Overhead added per reply.
    pub fn multiplier(&self) -> f64 {
        self.cfg.base_multiplier * pow2(self.upgrades.double_mailbox_count)
    }

    pub fn mails(&self) -> &[MailItem] {
        &self.mails
    }

    pub fn mail_handled(&self) -> u64 {
        self.mail_handled
    }

    pub fn total_overhead(&self) -> f64 {
        self.total_overhead
    }

    pub fn upgrades(&self) -> MailboxUpgrades {
        self.upgrades
    }

    pub fn is_syncing(&self) -> bool {
        self.sync.is_some()
    }

    pub fn is_auto_running(&self) -> bool {
        matches!(self.automation, Automation::Running { .. })
    }

    pub fn remaining(&self) -> usize {
        self.mails.iter().filter(|m| !m.checked).count()
    }

    pub fn phase(&self) -> MailPhase {
        match self.sync {
            Some(c) => MailPhase::Syncing {
                seconds_left: c.seconds_left,
            },
            None => match self.remaining() {
                0 => MailPhase::Ready,
                remaining => MailPhase::Selecting { remaining },
            },
        }
    }

    pub fn view(&self) -> MailboxView {
        MailboxView {
            mails: self.mails.clone(),
            phase: self.phase(),
            mail_handled: self.mail_handled,
            total_overhead: self.total_overhead,
            auto_running: self.is_auto_running(),
            upgrades: self.upgrades,
        }
    }

    fn ensure_manual(&self) -> Result<(), ModuleError> {
        if self.is_syncing() {
            return Err(ModuleError::Syncing);
        }
        if self.is_auto_running() {
            return Err(ModuleError::AutomationRunning);
        }
        Ok(())
    }

    /// Flip one mail's checkbox. Returns the new checked state.
    pub fn toggle_mail(
        &mut self,
        index: usize,
        deltas: &mut Vec<CurrencyDelta>,
    ) -> Result<bool, ModuleError> {
        self.ensure_manual()?;
        let item = self
            .mails
            .get_mut(index)
            .ok_or(ModuleError::NoSuchMail(index))?;
        item.checked = !item.checked;
        let checked = item.checked;
        self.reply_if_instant(deltas);
        Ok(checked)
    }

    /// Check every mail at once. Needs the select-all upgrade.
    pub fn select_all(&mut self, deltas: &mut Vec<CurrencyDelta>) -> Result<(), ModuleError> {
        if !self.upgrades.select_all {
            return Err(ModuleError::SelectAllNotOwned);
        }
        self.ensure_manual()?;
        for m in &mut self.mails {
            m.checked = true;
        }
        self.reply_if_instant(deltas);
        Ok(())
    }

    /// Reply to the whole checked set.
    pub fn reply_all(&mut self, deltas: &mut Vec<CurrencyDelta>) -> Result<(), ModuleError> {
        self.ensure_manual()?;
        let remaining = self.remaining();
        if remaining > 0 {
            return Err(ModuleError::NotReady { remaining });
        }
        self.reply(deltas);
        Ok(())
    }

    fn reply_if_instant(&mut self, deltas: &mut Vec<CurrencyDelta>) {
        if self.upgrades.instant_sync && self.remaining() == 0 {
            self.reply(deltas);
        }
    }

    fn reply(&mut self, deltas: &mut Vec<CurrencyDelta>) {
        self.mail_handled += 1;
        let amount = self.multiplier();
        self.total_overhead += amount;
        deltas.push(credit_f64(amount));
        if self.upgrades.instant_sync {
            self.reset();
            return;
        }
        self.sync = Some(Countdown {
            seconds_left: self.cfg.sync_seconds,
            until_tick: SYNC_TICK,
        });
        if self.cfg.sync_seconds == 0 {
            self.reset();
        }
    }

    fn draw_mails(&mut self) {
        let count = self.mail_total();
        self.mails = self
            .pools
            .sample_mails(&mut self.rng, count)
            .into_iter()
            .map(|mail| MailItem {
                mail,
                checked: false,
            })
            .collect();
    }

    fn reset(&mut self) {
        self.sync = None;
        self.draw_mails();
        if self.upgrades.auto_mail && !self.is_auto_running() {
            self.automation =
                Automation::Pending(Duration::from_millis(self.cfg.auto_start_delay_ms));
        }
    }

    fn auto_delay(&self) -> Duration {
        let base = Duration::from_millis(self.cfg.auto_check_delay_ms);
        if self.upgrades.faster_auto_mail {
            base / 2
        } else {
            base
        }
    }

    fn start_automation(&mut self) {
        if self.is_syncing() || self.is_auto_running() {
            self.automation = Automation::Idle;
            return;
        }
        self.automation = Automation::Running {
            next: 0,
            wait: self.auto_delay(),
        };
    }

    fn automation_step(&mut self, deltas: &mut Vec<CurrencyDelta>) {
        match self.automation {
            Automation::Idle => {}
            Automation::Pending(_) => self.start_automation(),
            Automation::Running { next, .. } => {
                if let Some(item) = self.mails.get_mut(next) {
                    item.checked = true;
                    self.automation = Automation::Running {
                        next: next + 1,
                        wait: self.auto_delay(),
                    };
                } else {
                    self.automation = Automation::Idle;
                    for m in &mut self.mails {
                        m.checked = true;
                    }
                    self.reply(deltas);
                }
            }
        }
    }

    fn automation_timer(&self) -> Option<Duration> {
        match self.automation {
            Automation::Idle => None,
            Automation::Pending(t) => Some(t),
            Automation::Running { wait, .. } => Some(wait),
        }
    }

    fn consume(&mut self, step: Duration) {
        if let Some(c) = self.sync.as_mut() {
            c.until_tick = c.until_tick.saturating_sub(step);
        }
        match &mut self.automation {
            Automation::Idle => {}
            Automation::Pending(t) => *t = t.saturating_sub(step),
            Automation::Running { wait, .. } => *wait = wait.saturating_sub(step),
        }
    }

    fn sync_tick(&mut self) {
        let Some(c) = self.sync.as_mut() else {
            return;
        };
        c.seconds_left = c.seconds_left.saturating_sub(1);
        if c.seconds_left == 0 {
            self.reset();
        } else {
            c.until_tick = SYNC_TICK;
        }
    }

    pub fn cost(&self, upgrade: MailboxUpgrade) -> Decimal {
        let c = &self.cfg;
        let curve = match upgrade {
            MailboxUpgrade::AutoMail => CostCurve::Flat(c.auto_mail_cost),
            MailboxUpgrade::FasterAutoMail => CostCurve::Flat(c.faster_auto_mail_cost),
            MailboxUpgrade::InstantSync => CostCurve::Flat(c.instant_sync_cost),
            MailboxUpgrade::IncreaseMailbox => CostCurve::Flat(c.increase_mailbox_cost),
            MailboxUpgrade::SelectAll => CostCurve::Flat(c.select_all_cost),
            MailboxUpgrade::DoubleMailbox => CostCurve::Doubling(c.double_mailbox_base_cost),
        };
        curve.cost_at(self.upgrades.double_mailbox_count)
    }

    /// Whether the upgrade can still be bought, ignoring funds.
    pub fn is_available(&self, upgrade: MailboxUpgrade) -> bool {
        !self.is_owned(upgrade)
    }

    fn is_owned(&self, upgrade: MailboxUpgrade) -> bool {
        let u = &self.upgrades;
        match upgrade {
            MailboxUpgrade::AutoMail => u.auto_mail,
            MailboxUpgrade::FasterAutoMail => u.faster_auto_mail,
            MailboxUpgrade::InstantSync => u.instant_sync,
            MailboxUpgrade::IncreaseMailbox => u.increase_mailbox,
            MailboxUpgrade::SelectAll => u.select_all,
            MailboxUpgrade::DoubleMailbox => false,
        }
    }

    /// Buy an upgrade against `balance`. On success returns the debit the
    /// caller must apply.
    pub fn purchase(
        &mut self,
        upgrade: MailboxUpgrade,
        balance: Decimal,
    ) -> Result<CurrencyDelta, PurchaseError> {
        if self.is_owned(upgrade) {
            return Err(PurchaseError::AlreadyOwned);
        }
        let cost = self.cost(upgrade);
        let delta = charge(balance, cost)?;
        match upgrade {
            MailboxUpgrade::AutoMail => {
                self.upgrades.auto_mail = true;
                if !self.is_syncing() && !self.is_auto_running() {
                    self.start_automation();
                }
            }
            MailboxUpgrade::FasterAutoMail => self.upgrades.faster_auto_mail = true,
            MailboxUpgrade::InstantSync => self.upgrades.instant_sync = true,
            MailboxUpgrade::SelectAll => self.upgrades.select_all = true,
            MailboxUpgrade::IncreaseMailbox => {
                self.upgrades.increase_mailbox = true;
                if !self.is_syncing() {
                    self.draw_mails();
                    if let Automation::Running { next, .. } = &mut self.automation {
                        *next = 0;
                    }
                }
            }
            MailboxUpgrade::DoubleMailbox => self.upgrades.double_mailbox_count += 1,
        }
        debug!(?upgrade, %cost, "mailbox upgrade purchased");
        Ok(delta)
    }
}

impl GameModule for MailboxModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Mailbox
    }

    fn metrics(&self) -> ModuleMetrics {
        ModuleMetrics {
            name: ModuleKind::Mailbox.to_string(),
            primary_value: self.total_overhead,
            label: format!("Mails handled: {}", self.mail_handled),
            opm: self.opm.current(),
            multiplier: self.multiplier(),
        }
    }

    fn advance(&mut self, dt: Duration, deltas: &mut Vec<CurrencyDelta>) {
        let mut left = dt;
        loop {
            let sync_timer = self.sync.map(|c| c.until_tick);
            let next = match (sync_timer, self.automation_timer()) {
                (Some(a), Some(b)) => a.min(b),
                (Some(a), None) | (None, Some(a)) => a,
                (None, None) => break,
            };
            if next > left {
                self.consume(left);
                break;
            }
            self.consume(next);
            left -= next;
            if self.sync.is_some_and(|c| c.until_tick.is_zero()) {
                self.sync_tick();
            }
            if self.automation_timer().is_some_and(|t| t.is_zero()) {
                self.automation_step(deltas);
            }
        }
        self.opm.observe(dt, self.total_overhead);
    }

    fn is_unlocked(&self) -> bool {
        true
    }

    fn unlock(&mut self) {}
}

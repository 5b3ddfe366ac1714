//! World: every email sent reaches `c` contacts who each forward it to `c`
//! more.

use std::time::Duration;

use overhead_core::{CurrencyDelta, GameModule, ModuleKind, ModuleMetrics, OpmTracker, WorldConfig};
use overhead_econ::{charge, CostCurve, PurchaseError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ModuleError;

/// Frames this long or longer are discarded.
pub const MAX_FRAME: Duration = Duration::from_secs(1);

/// World upgrades.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorldUpgrade {
    /// +1 mail per second.
    Mail,
    /// +1 contact per person.
    Contact,
}

impl WorldUpgrade {
    pub const ALL: [WorldUpgrade; 2] = [WorldUpgrade::Mail, WorldUpgrade::Contact];
}

/// Serializable snapshot for hosts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldView {
    pub unlocked: bool,
    pub active: bool,
    pub mails_per_second: u32,
    pub avg_contacts_per_person: u32,
    pub total_emails_sent: f64,
    pub world_mail_count: u32,
    pub world_contact_count: u32,
}

/// Emails produced by one send: `c` direct recipients plus `c²`
/// forwards.
pub fn emails_per_send(contacts: u32) -> f64 {
    let c = contacts as f64;
    c + c * c
}

/// The idle cascade accrual.
pub struct WorldModule {
    cfg: WorldConfig,
    unlocked: bool,
    active: bool,
    mails_per_second: u32,
    avg_contacts_per_person: u32,
    total_emails_sent: f64,
    world_mail_count: u32,
    world_contact_count: u32,
    opm: OpmTracker,
}

impl WorldModule {
    pub fn new(cfg: WorldConfig) -> Self {
        let mails_per_second = cfg.initial_mails_per_second;
        let avg_contacts_per_person = cfg.initial_contacts.max(1);
        Self {
            cfg,
            unlocked: false,
            active: false,
            mails_per_second,
            avg_contacts_per_person,
            total_emails_sent: 0.0,
            world_mail_count: 0,
            world_contact_count: 0,
            opm: OpmTracker::default(),
        }
    }

    /// One-time activation.
    pub fn start(&mut self) -> Result<(), ModuleError> {
        if !self.unlocked {
            return Err(ModuleError::Locked(ModuleKind::World));
        }
        if self.active {
            return Err(ModuleError::AlreadyStarted(ModuleKind::World));
        }
        self.active = true;
        info!("world cascade started");
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn mails_per_second(&self) -> u32 {
        self.mails_per_second
    }

    pub fn avg_contacts_per_person(&self) -> u32 {
        self.avg_contacts_per_person
    }

    pub fn total_emails_sent(&self) -> f64 {
        self.total_emails_sent
    }

    pub fn primary_value(&self) -> f64 {
        (self.total_emails_sent * self.cfg.emails_multiplier).floor()
    }

    pub fn view(&self) -> WorldView {
        WorldView {
            unlocked: self.unlocked,
            active: self.active,
            mails_per_second: self.mails_per_second,
            avg_contacts_per_person: self.avg_contacts_per_person,
            total_emails_sent: self.total_emails_sent,
            world_mail_count: self.world_mail_count,
            world_contact_count: self.world_contact_count,
        }
    }

    pub fn cost(&self, upgrade: WorldUpgrade) -> Decimal {
        match upgrade {
            WorldUpgrade::Mail => {
                CostCurve::Doubling(self.cfg.mail_base_cost).cost_at(self.world_mail_count)
            }
            WorldUpgrade::Contact => {
                CostCurve::Doubling(self.cfg.contact_base_cost).cost_at(self.world_contact_count)
            }
        }
    }

    pub fn is_available(&self, _upgrade: WorldUpgrade) -> bool {
        self.active
    }

    /// Buy an upgrade against `balance`. Refused until the module is started.
    pub fn purchase(
        &mut self,
        upgrade: WorldUpgrade,
        balance: Decimal,
    ) -> Result<CurrencyDelta, PurchaseError> {
        if !self.active {
            return Err(PurchaseError::NotStarted);
        }
        let cost = self.cost(upgrade);
        let delta = charge(balance, cost)?;
        match upgrade {
            WorldUpgrade::Mail => {
                self.world_mail_count += 1;
                self.mails_per_second += 1;
            }
            WorldUpgrade::Contact => {
                self.world_contact_count += 1;
                self.avg_contacts_per_person += 1;
            }
        }
        debug!(?upgrade, %cost, "world upgrade purchased");
        Ok(delta)
    }
}

impl GameModule for WorldModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::World
    }

    fn metrics(&self) -> ModuleMetrics {
        ModuleMetrics {
            name: ModuleKind::World.to_string(),
            primary_value: self.primary_value(),
            label: format!("Total emails sent: {}", self.total_emails_sent.floor()),
            opm: self.opm.current(),
            multiplier: self.cfg.emails_multiplier,
        }
    }

    fn advance(&mut self, dt: Duration, _deltas: &mut Vec<CurrencyDelta>) {
        if self.active && !dt.is_zero() && dt < MAX_FRAME {
            self.total_emails_sent += self.mails_per_second as f64
                * emails_per_send(self.avg_contacts_per_person)
                * dt.as_secs_f64();
        }
        self.opm.observe(dt, self.primary_value());
    }

    fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    fn unlock(&mut self) {
        if !self.unlocked {
            self.unlocked = true;
            info!("world unlocked");
        }
    }
}

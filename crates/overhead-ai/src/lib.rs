#![deny(warnings)]

//! Auto-player purchase planning.
//!
//! Every upgrade on sale is scored by `weight / cost`; the planner buys the
//! best affordable one. Weights are rough guesses of how much an upgrade
//! moves the output value and can be tuned per run.

use overhead_modules::{CorporationUpgrade, MailboxUpgrade, WorldUpgrade};
use overhead_runtime::{GameView, Upgrade, UpgradeOffer};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Relative value of each upgrade.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerWeights {
    pub auto_mail: f64,
    pub faster_auto_mail: f64,
    pub instant_sync: f64,
    pub increase_mailbox: f64,
    /// Only worth anything while mail is still checked by hand.
    pub select_all: f64,
    pub double_mailbox: f64,
    pub stakeholder: f64,
    pub comm_officer: f64,
    pub double_corporation: f64,
    pub world_mail: f64,
    pub world_contact: f64,
}

impl Default for PlannerWeights {
    fn default() -> Self {
        Self {
            auto_mail: 50.0,
            faster_auto_mail: 2.0,
            instant_sync: 10.0,
            increase_mailbox: 0.1,
            select_all: 1.0,
            double_mailbox: 4.0,
            stakeholder: 2.0,
            comm_officer: 6.0,
            double_corporation: 6.0,
            world_mail: 8.0,
            world_contact: 8.0,
        }
    }
}

impl PlannerWeights {
    pub fn weight(&self, upgrade: Upgrade, view: &GameView) -> f64 {
        match upgrade {
            Upgrade::Mailbox(u) => match u {
                MailboxUpgrade::AutoMail => self.auto_mail,
                MailboxUpgrade::FasterAutoMail => self.faster_auto_mail,
                MailboxUpgrade::InstantSync => self.instant_sync,
                MailboxUpgrade::IncreaseMailbox => self.increase_mailbox,
                MailboxUpgrade::SelectAll if view.mailbox.upgrades.auto_mail => 0.0,
                MailboxUpgrade::SelectAll => self.select_all,
                MailboxUpgrade::DoubleMailbox => self.double_mailbox,
            },
            Upgrade::Corporation(u) => match u {
                CorporationUpgrade::Stakeholder => self.stakeholder,
                CorporationUpgrade::CommOfficer => self.comm_officer,
                CorporationUpgrade::DoubleCorporation => self.double_corporation,
            },
            Upgrade::World(u) => match u {
                // Contacts multiply nothing until mail is flowing.
                WorldUpgrade::Contact if view.world.mails_per_second == 0 => 0.0,
                WorldUpgrade::Contact => self.world_contact,
                WorldUpgrade::Mail => self.world_mail,
            },
        }
    }
}

/// Utility of buying `offer` now: weight per unit of currency.
pub fn utility(weights: &PlannerWeights, offer: &UpgradeOffer, view: &GameView) -> f64 {
    let cost = offer.cost.to_f64().unwrap_or(f64::MAX).max(1.0);
    weights.weight(offer.upgrade, view) / cost
}

/// Best affordable upgrade under `weights`, if any has positive utility.
pub fn plan_purchase_with(view: &GameView, weights: &PlannerWeights) -> Option<Upgrade> {
    let best = view
        .offers
        .iter()
        .filter(|o| o.affordable)
        .map(|o| (o.upgrade, utility(weights, o, view)))
        .filter(|(_, u)| *u > 0.0)
        .max_by(|a, b| a.1.total_cmp(&b.1))?;
    debug!(upgrade = ?best.0, utility = best.1, "planned purchase");
    Some(best.0)
}

/// Best affordable upgrade under the default weights.
pub fn plan_purchase(view: &GameView) -> Option<Upgrade> {
    plan_purchase_with(view, &PlannerWeights::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use overhead_core::{GameConfig, Pools};
    use overhead_runtime::Game;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn game(money: i64) -> Game {
        let cfg = GameConfig {
            starting_money: Decimal::new(money, 0),
            ..GameConfig::default()
        };
        Game::new(cfg, Pools::default()).unwrap()
    }

    #[test]
    fn broke_player_buys_nothing() {
        assert_eq!(plan_purchase(&game(0).view()), None);
    }

    #[test]
    fn automation_comes_first() {
        let g = game(1_000);
        assert_eq!(
            plan_purchase(&g.view()),
            Some(Upgrade::Mailbox(MailboxUpgrade::AutoMail))
        );
    }

    #[test]
    fn zero_weights_disable_the_planner() {
        let zero = PlannerWeights {
            auto_mail: 0.0,
            faster_auto_mail: 0.0,
            instant_sync: 0.0,
            increase_mailbox: 0.0,
            select_all: 0.0,
            double_mailbox: 0.0,
            stakeholder: 0.0,
            comm_officer: 0.0,
            double_corporation: 0.0,
            world_mail: 0.0,
            world_contact: 0.0,
        };
        assert_eq!(plan_purchase_with(&game(10_000).view(), &zero), None);
    }

    #[test]
    fn utility_falls_with_cost() {
        let view = game(0).view();
        let w = PlannerWeights::default();
        let cheap = UpgradeOffer {
            upgrade: Upgrade::Mailbox(MailboxUpgrade::DoubleMailbox),
            cost: Decimal::new(200, 0),
            affordable: true,
        };
        let dear = UpgradeOffer {
            cost: Decimal::new(400, 0),
            ..cheap.clone()
        };
        assert!(utility(&w, &cheap, &view) > utility(&w, &dear, &view));
    }

    proptest! {
        #[test]
        fn planned_upgrade_is_always_buyable(money in 0i64..5_000, secs in 0u64..120) {
            let mut g = game(money);
            g.advance(Duration::from_secs(secs));
            if let Some(u) = plan_purchase(&g.view()) {
                prop_assert!(g.purchase(u).is_ok());
            }
        }
    }
}

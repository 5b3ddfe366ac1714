#![deny(warnings)]

//! Gameplay modules: the mailbox minigame, the corporation signing loop and
//! the world email cascade.
//!
//! Each module is a state machine advanced by simulated time. Modules report
//! currency changes as [`CurrencyDelta`] events and never hold the balance.

pub mod corporation;
pub mod mailbox;
pub mod world;

pub use corporation::{CorporationModule, CorporationUpgrade, CorporationView, Document, DocumentVersion};
pub use mailbox::{MailItem, MailPhase, MailboxModule, MailboxUpgrade, MailboxUpgrades, MailboxView};
pub use world::{WorldModule, WorldUpgrade, WorldView};

use overhead_core::{CurrencyDelta, ModuleKind};
use overhead_econ::PurchaseError;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

/// Reasons a module action is refused. Refused actions leave state untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModuleError {
    #[error(transparent)]
    Purchase(#[from] PurchaseError),
    #[error("{0} is locked")]
    Locked(ModuleKind),
    #[error("{0} already started")]
    AlreadyStarted(ModuleKind),
    #[error("mailbox is synchronizing")]
    Syncing,
    #[error("mail automation is running")]
    AutomationRunning,
    #[error("{remaining} mails still unchecked")]
    NotReady { remaining: usize },
    #[error("no mail at index {0}")]
    NoSuchMail(usize),
    #[error("select-all upgrade not owned")]
    SelectAllNotOwned,
}

/// Currency credit for a float amount, saturating at `Decimal::MAX`.
pub(crate) fn credit_f64(amount: f64) -> CurrencyDelta {
    let dec = Decimal::from_f64(amount.max(0.0)).unwrap_or(Decimal::MAX);
    CurrencyDelta::credit(dec)
}

//! Corporation: documents circulate for signatures until scope creep
//! maxes out, then a fresh document starts.

use std::fmt;
use std::time::Duration;

use overhead_core::{
    module_rng, pow2, CorporationConfig, CurrencyDelta, GameModule, GameRng, ModuleKind,
    ModuleMetrics, OpmTracker, Pools,
};
use overhead_econ::{charge, CostCurve, PurchaseError};
use rand::seq::SliceRandom;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ModuleError;

/// Signature delay never drops below this, however many officers are hired.
pub const MIN_SIGNATURE_DELAY: Duration = Duration::from_millis(1);

/// Semantic version of a document, displayed as `v1.2.3`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl DocumentVersion {
    pub const INITIAL: DocumentVersion = DocumentVersion {
        major: 1,
        minor: 0,
        patch: 0,
    };

    pub fn bump_patch(&mut self) {
        self.patch = self.patch.saturating_add(1);
    }
}

impl fmt::Display for DocumentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// The document in flight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub version: DocumentVersion,
    /// Unique, signed in order.
    pub signatories: Vec<String>,
    pub current_signature_index: usize,
    pub total_revisions: u32,
    /// Clamped to `[0, scope_creep_max]`.
    pub scope_creep: u32,
}

/// Corporation upgrades.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorporationUpgrade {
    /// Adds a permanent signatory.
    Stakeholder,
    /// Doubles signing speed.
    CommOfficer,
    /// Doubles hours wasted per document.
    DoubleCorporation,
}

impl CorporationUpgrade {
    pub const ALL: [CorporationUpgrade; 3] = [
        CorporationUpgrade::Stakeholder,
        CorporationUpgrade::CommOfficer,
        CorporationUpgrade::DoubleCorporation,
    ];
}

/// Serializable snapshot for hosts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorporationView {
    pub unlocked: bool,
    pub document: Option<Document>,
    pub permanent_stakeholders: Vec<String>,
    pub documents_completed: u64,
    pub total_overhead: f64,
    pub comm_officer_count: u32,
    pub document_speed_multiplier: f64,
    pub double_corporation_count: u32,
    /// Hours shown on the transient banner, if it is up.
    pub wasted_banner: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct WastedBanner {
    hours: f64,
    remaining: Duration,
}

/// The document-signing loop.
pub struct CorporationModule {
    cfg: CorporationConfig,
    pools: Pools,
    rng: GameRng,
    unlocked: bool,
    document: Option<Document>,
    permanent_stakeholders: Vec<String>,
    documents_completed: u64,
    total_overhead: f64,
    comm_officer_count: u32,
    document_speed_multiplier: f64,
    double_corporation_count: u32,
    until_signature: Duration,
    banner: Option<WastedBanner>,
    opm: OpmTracker,
}

impl CorporationModule {
    pub fn new(cfg: CorporationConfig, pools: Pools, seed: u64) -> Self {
        let permanent_stakeholders = cfg.initial_stakeholders.clone();
        Self {
            cfg,
            pools,
            rng: module_rng(seed, ModuleKind::Corporation),
            unlocked: false,
            document: None,
            permanent_stakeholders,
            documents_completed: 0,
            total_overhead: 0.0,
            comm_officer_count: 0,
            document_speed_multiplier: 1.0,
            double_corporation_count: 0,
            until_signature: Duration::ZERO,
            banner: None,
            opm: OpmTracker::default(),
        }
    }

    /// Begin circulating the first document.
    pub fn start(&mut self) -> Result<(), ModuleError> {
        if !self.unlocked {
            return Err(ModuleError::Locked(ModuleKind::Corporation));
        }
        if self.document.is_some() {
            return Err(ModuleError::AlreadyStarted(ModuleKind::Corporation));
        }
        self.document = Some(self.new_document());
        self.until_signature = self.signature_delay();
        info!("corporation started");
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.document.is_some()
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn permanent_stakeholders(&self) -> &[String] {
        &self.permanent_stakeholders
    }

    pub fn documents_completed(&self) -> u64 {
        self.documents_completed
    }

    pub fn total_overhead(&self) -> f64 {
        self.total_overhead
    }

    pub fn comm_officer_count(&self) -> u32 {
        self.comm_officer_count
    }

    pub fn document_speed_multiplier(&self) -> f64 {
        self.document_speed_multiplier
    }

    pub fn double_corporation_count(&self) -> u32 {
        self.double_corporation_count
    }

    /// Hours on the wasted-hours banner while it is displayed.
    pub fn wasted_banner(&self) -> Option<f64> {
        self.banner.map(|b| b.hours)
    }

    pub fn multiplier(&self) -> f64 {
        pow2(self.double_corporation_count)
    }

    pub fn view(&self) -> CorporationView {
        CorporationView {
            unlocked: self.unlocked,
            document: self.document.clone(),
            permanent_stakeholders: self.permanent_stakeholders.clone(),
            documents_completed: self.documents_completed,
            total_overhead: self.total_overhead,
            comm_officer_count: self.comm_officer_count,
            document_speed_multiplier: self.document_speed_multiplier,
            double_corporation_count: self.double_corporation_count,
            wasted_banner: self.wasted_banner(),
        }
    }

    /// Current wait between two signatures.
    pub fn signature_delay(&self) -> Duration {
        let base = Duration::from_millis(self.cfg.signature_delay_ms);
        let scaled = if self.document_speed_multiplier.is_finite() {
            base.div_f64(self.document_speed_multiplier)
        } else {
            Duration::ZERO
        };
        scaled.max(MIN_SIGNATURE_DELAY)
    }

    fn new_document(&mut self) -> Document {
        Document {
            title: self.pools.sample_title(&mut self.rng),
            version: DocumentVersion::INITIAL,
            signatories: self.permanent_stakeholders.clone(),
            current_signature_index: 0,
            total_revisions: 0,
            scope_creep: 0,
        }
    }

    fn sign_next(&mut self, deltas: &mut Vec<CurrencyDelta>) {
        let Some(doc) = self.document.as_mut() else {
            return;
        };
        doc.current_signature_index += 1;
        if doc.current_signature_index < doc.signatories.len() {
            return;
        }
        doc.scope_creep = doc
            .scope_creep
            .saturating_add(self.cfg.scope_creep_increment)
            .min(self.cfg.scope_creep_max);
        doc.total_revisions += 1;
        doc.current_signature_index = 0;
        doc.version.bump_patch();
        if doc.scope_creep >= self.cfg.scope_creep_max {
            self.complete_document(deltas);
        }
    }

    fn complete_document(&mut self, deltas: &mut Vec<CurrencyDelta>) {
        let signers = self
            .document
            .as_ref()
            .map(|d| d.signatories.len())
            .unwrap_or_default();
        let hours = signers as f64 * self.cfg.hours_per_signatory * self.multiplier();
        deltas.push(CurrencyDelta::credit(self.cfg.completion_reward));
        self.documents_completed += 1;
        self.total_overhead += hours;
        self.banner = Some(WastedBanner {
            hours,
            remaining: Duration::from_millis(self.cfg.banner_ms),
        });
        info!(
            hours,
            documents_completed = self.documents_completed,
            "document scope maxed out"
        );
        self.document = Some(self.new_document());
    }

    pub fn cost(&self, upgrade: CorporationUpgrade) -> Decimal {
        let c = &self.cfg;
        match upgrade {
            CorporationUpgrade::Stakeholder => CostCurve::Flat(c.stakeholder_cost).cost_at(0),
            CorporationUpgrade::CommOfficer => {
                CostCurve::Doubling(c.comm_officer_base_cost).cost_at(self.comm_officer_count)
            }
            CorporationUpgrade::DoubleCorporation => CostCurve::Doubling(
                c.double_corporation_base_cost,
            )
            .cost_at(self.double_corporation_count),
        }
    }

    fn available_stakeholders(&self) -> Vec<&String> {
        self.cfg
            .stakeholder_pool
            .iter()
            .filter(|s| !self.permanent_stakeholders.contains(s))
            .collect()
    }

    /// Whether the upgrade can still be bought, ignoring funds.
    pub fn is_available(&self, upgrade: CorporationUpgrade) -> bool {
        match upgrade {
            CorporationUpgrade::Stakeholder => {
                self.is_started() && !self.available_stakeholders().is_empty()
            }
            CorporationUpgrade::CommOfficer | CorporationUpgrade::DoubleCorporation => true,
        }
    }

    /// Buy an upgrade against `balance`. On success returns the debit the
    /// caller must apply.
    pub fn purchase(
        &mut self,
        upgrade: CorporationUpgrade,
        balance: Decimal,
    ) -> Result<CurrencyDelta, PurchaseError> {
        let cost = self.cost(upgrade);
        let delta = match upgrade {
            CorporationUpgrade::Stakeholder => self.add_stakeholder(balance, cost)?,
            CorporationUpgrade::CommOfficer => {
                let delta = charge(balance, cost)?;
                self.comm_officer_count += 1;
                self.document_speed_multiplier *= 2.0;
                delta
            }
            CorporationUpgrade::DoubleCorporation => {
                let delta = charge(balance, cost)?;
                self.double_corporation_count += 1;
                delta
            }
        };
        debug!(?upgrade, %cost, "corporation upgrade purchased");
        Ok(delta)
    }

    fn add_stakeholder(
        &mut self,
        balance: Decimal,
        cost: Decimal,
    ) -> Result<CurrencyDelta, PurchaseError> {
        if self.document.is_none() {
            return Err(PurchaseError::NotStarted);
        }
        let available: Vec<String> = self
            .available_stakeholders()
            .into_iter()
            .cloned()
            .collect();
        if available.is_empty() {
            return Err(PurchaseError::PoolExhausted);
        }
        let delta = charge(balance, cost)?;
        let name = available
            .choose(&mut self.rng)
            .cloned()
            .ok_or(PurchaseError::PoolExhausted)?;
        let max = self.cfg.scope_creep_max;
        let bump = self.cfg.stakeholder_scope_creep;
        self.permanent_stakeholders.push(name.clone());
        if let Some(doc) = self.document.as_mut() {
            doc.signatories.push(name.clone());
            doc.scope_creep = doc.scope_creep.saturating_add(bump).min(max);
        }
        info!(stakeholder = %name, "stakeholder added");
        Ok(delta)
    }
}

impl GameModule for CorporationModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Corporation
    }

    fn metrics(&self) -> ModuleMetrics {
        ModuleMetrics {
            name: ModuleKind::Corporation.to_string(),
            primary_value: self.total_overhead,
            label: format!("Hours wasted: {}", self.total_overhead),
            opm: self.opm.current(),
            multiplier: self.multiplier(),
        }
    }

    fn advance(&mut self, dt: Duration, deltas: &mut Vec<CurrencyDelta>) {
        if let Some(b) = self.banner.as_mut() {
            b.remaining = b.remaining.saturating_sub(dt);
            if b.remaining.is_zero() {
                self.banner = None;
            }
        }
        if self.document.is_some() {
            let mut left = dt;
            while left >= self.until_signature {
                left -= self.until_signature;
                self.sign_next(deltas);
                self.until_signature = self.signature_delay();
            }
            self.until_signature -= left;
        }
        self.opm.observe(dt, self.total_overhead);
    }

    fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    fn unlock(&mut self) {
        if !self.unlocked {
            self.unlocked = true;
            info!("corporation unlocked");
        }
    }
}

//! Static reference pools sampled by the modules.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ValidationError;

/// One inbox entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mail {
    pub subject: String,
    pub sender: String,
}

/// Read-only data the modules draw from: inbox entries for the mailbox and
/// policy titles for corporation documents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pools {
    pub mails: Vec<Mail>,
    pub titles: Vec<String>,
}

const BUILTIN_MAILS: &[(&str, &str)] = &[
    ("Re: Re: Fwd: Synergy alignment", "Regional Manager"),
    ("Quick sync about the sync", "Project Lead"),
    ("Mandatory fun: team building survey", "HR"),
    ("Please reply-all to confirm receipt", "Compliance Officer"),
    ("Updated deck (v14 FINAL final)", "Marketing"),
    ("Circling back on the circle-back", "Sales"),
    ("Out of office: Re: Out of office", "CFO"),
    ("Calendar invite: Pre-meeting prep meeting", "Department Head"),
    ("Action required: acknowledge the policy on policies", "Legal"),
    ("Thoughts? (see attached 90 slides)", "CEO"),
    ("Reminder: timesheet for logging timesheets", "HR"),
    ("Kudos to everyone involved in the kudos initiative", "Board Member"),
    ("Urgent: non-urgent update", "CTO"),
    ("Parking lot items from the parking lot discussion", "Project Lead"),
    ("Low-hanging fruit inventory", "Sales"),
    ("Please stop replying all", "External Auditor"),
    ("Re: Please stop replying all", "Marketing"),
    ("Quarterly alignment on annual alignment", "Regional Manager"),
    ("Deck review: the review deck", "Department Head"),
    ("Friendly reminder about the previous reminder", "Compliance Officer"),
];

const BUILTIN_TITLES: &[&str] = &[
    "Best Practices Framework for Best Practices",
    "Strategic Roadmap for Roadmap Strategy",
    "Guidelines on Drafting Guidelines",
    "Meeting Reduction Task Force Charter",
    "Synergy Realignment Memorandum",
    "Cross-Functional Stakeholder Engagement Matrix",
    "Email Etiquette Policy Addendum",
    "Governance Model for Governance Models",
    "Holistic Paradigm Shift Playbook",
    "Operational Excellence Excellence Plan",
];

impl Default for Pools {
    fn default() -> Self {
        Self {
            mails: BUILTIN_MAILS
                .iter()
                .map(|(subject, sender)| Mail {
                    subject: subject.to_string(),
                    sender: sender.to_string(),
                })
                .collect(),
            titles: BUILTIN_TITLES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl Pools {
    /// Parse pools from JSON.
    pub fn from_json_str(text: &str) -> Result<Self, ValidationError> {
        let pools: Pools =
            serde_json::from_str(text).map_err(|e| ValidationError::Parse(e.to_string()))?;
        debug!(
            mails = pools.mails.len(),
            titles = pools.titles.len(),
            "pools loaded"
        );
        Ok(pools)
    }

    /// Draw `count` mails uniformly without replacement. Returns fewer when the
    /// pool is smaller than `count`.
    pub fn sample_mails<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Vec<Mail> {
        self.mails.choose_multiple(rng, count).cloned().collect()
    }

    /// Draw one document title.
    pub fn sample_title<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        self.titles.choose(rng).cloned().unwrap_or_default()
    }
}

/// Pools must hold at least `max_mail_draw` mails and one title.
pub fn validate_pools(pools: &Pools, max_mail_draw: usize) -> Result<(), ValidationError> {
    if pools.mails.len() < max_mail_draw {
        return Err(ValidationError::PoolTooSmall {
            pool: "mail",
            needed: max_mail_draw,
            available: pools.mails.len(),
        });
    }
    if pools.titles.is_empty() {
        return Err(ValidationError::PoolTooSmall {
            pool: "title",
            needed: 1,
            available: 0,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::BTreeSet;

    #[test]
    fn builtin_pools_cover_upgraded_mailbox() {
        validate_pools(&Pools::default(), 10).unwrap();
    }

    #[test]
    fn small_pool_rejected() {
        let pools = Pools {
            mails: vec![],
            titles: vec!["T".into()],
        };
        assert!(matches!(
            validate_pools(&pools, 5),
            Err(ValidationError::PoolTooSmall { pool: "mail", .. })
        ));
    }

    #[test]
    fn pools_load_from_json() {
        let json = r#"{"mails":[{"subject":"Hi","sender":"HR"}],"titles":["Memo"]}"#;
        let pools = Pools::from_json_str(json).unwrap();
        assert_eq!(pools.mails.len(), 1);
        assert_eq!(pools.titles, vec!["Memo".to_string()]);
    }

    proptest! {
        #[test]
        fn mail_draws_have_no_repeats(seed in any::<u64>(), count in 1usize..=20) {
            let pools = Pools::default();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let drawn = pools.sample_mails(&mut rng, count);
            prop_assert_eq!(drawn.len(), count);
            let subjects: BTreeSet<_> = drawn.iter().map(|m| m.subject.clone()).collect();
            prop_assert_eq!(subjects.len(), count);
        }
    }
}

use super::allocator::RoundRobinCursors;
use super::domain::{Agent, AssignedContact, AssignmentOrigin, Center};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One agent's ordered assignment list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAllocation {
    pub agent: String,
    #[serde(default)]
    pub center: Center,
    /// False when the agent only exists in a prior snapshot.
    #[serde(default = "default_active")]
    pub active: bool,
    pub contacts: Vec<AssignedContact>,
}

fn default_active() -> bool {
    true
}

impl AgentAllocation {
    pub fn new(agent: impl Into<String>, contacts: Vec<AssignedContact>) -> Self {
        Self {
            agent: agent.into(),
            center: Center::none(),
            active: true,
            contacts,
        }
    }

    pub fn new_count(&self) -> usize {
        self.contacts
            .iter()
            .filter(|contact| contact.origin == AssignmentOrigin::Current)
            .count()
    }
}

/// Allocation state carried into an incremental run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorSnapshot {
    pub agents: Vec<AgentAllocation>,
    #[serde(default)]
    pub cursors: RoundRobinCursors,
}

impl PriorSnapshot {
    /// Phones held by any agent list. Prior unallocated contacts are not part of
    /// a snapshot and remain eligible.
    pub fn allocated_phones(&self) -> HashSet<String> {
        self.agents
            .iter()
            .flat_map(|agent| agent.contacts.iter().map(|contact| contact.phone.clone()))
            .collect()
    }

    pub fn total_allocated(&self) -> usize {
        self.allocated_phones().len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.iter().all(|agent| agent.contacts.is_empty())
    }

    pub fn contacts_for(&self, agent: &str) -> Option<&[AssignedContact]> {
        self.agents
            .iter()
            .find(|allocation| allocation.agent == agent)
            .map(|allocation| allocation.contacts.as_slice())
    }
}

/// Whether a run starts over or builds on a prior snapshot. Resolved once by
/// the caller before the engine runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Fresh,
    Incremental(PriorSnapshot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    Fresh,
    Incremental,
}

impl ModeKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Fresh => "Fresh",
            Self::Incremental => "Incremental",
        }
    }
}

impl RunMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            RunMode::Fresh => ModeKind::Fresh,
            RunMode::Incremental(_) => ModeKind::Incremental,
        }
    }

    pub fn prior(&self) -> Option<&PriorSnapshot> {
        match self {
            RunMode::Fresh => None,
            RunMode::Incremental(prior) => Some(prior),
        }
    }
}

/// Folds this run's assignments into the prior lists.
///
/// Active agents come first in roster order, each as prior list followed by new
/// assignments with prior entries winning on a phone collision. Agents only
/// known to the prior snapshot follow, unchanged and marked inactive.
pub(crate) fn fold_assignments(
    roster: &[Agent],
    new_assignments: Vec<Vec<AssignedContact>>,
    prior: Option<&PriorSnapshot>,
) -> Vec<AgentAllocation> {
    let mut merged = Vec::with_capacity(roster.len());

    for (agent, fresh) in roster.iter().zip(new_assignments) {
        let prior_contacts = prior.and_then(|prior| prior.contacts_for(&agent.name));
        let contacts = match prior_contacts {
            Some(existing) => merge_by_phone(existing, fresh),
            None => fresh,
        };
        merged.push(AgentAllocation {
            agent: agent.name.clone(),
            center: agent.center.clone(),
            active: true,
            contacts,
        });
    }

    if let Some(prior) = prior {
        let active: HashSet<&str> = roster.iter().map(|agent| agent.name.as_str()).collect();
        for allocation in &prior.agents {
            if active.contains(allocation.agent.as_str()) {
                continue;
            }
            merged.push(AgentAllocation {
                agent: allocation.agent.clone(),
                center: allocation.center.clone(),
                active: false,
                contacts: allocation.contacts.iter().map(as_prior).collect(),
            });
        }
    }

    merged
}

/// Prior snapshots may come straight from an earlier run's output, where the
/// entries still read as `current`.
fn as_prior(contact: &AssignedContact) -> AssignedContact {
    AssignedContact {
        origin: AssignmentOrigin::Prior,
        ..contact.clone()
    }
}

fn merge_by_phone(
    existing: &[AssignedContact],
    fresh: Vec<AssignedContact>,
) -> Vec<AssignedContact> {
    let mut seen = HashSet::with_capacity(existing.len() + fresh.len());
    let mut merged = Vec::with_capacity(existing.len() + fresh.len());

    for contact in existing.iter().map(as_prior).chain(fresh) {
        if seen.insert(contact.phone.clone()) {
            merged.push(contact);
        }
    }

    merged
}

use super::allocator::{RoundRobinCursors, TierTally};
use super::domain::{AssignedContact, AssignmentOrigin, Center, UnallocatedContact};
use super::merge::{AgentAllocation, ModeKind, PriorSnapshot};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTally {
    pub agent: String,
    pub center: Center,
    pub active: bool,
    pub new: usize,
    pub cumulative: usize,
}

/// Aggregate counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationStats {
    /// Contact rows handed to the engine, duplicates included.
    pub total_input: usize,
    pub duplicates_removed: usize,
    /// Contacts skipped because a prior snapshot already assigned them.
    pub already_allocated: usize,
    /// Contacts that entered the allocator this run.
    pub considered: usize,
    pub newly_allocated: usize,
    pub unallocated: usize,
    pub previously_allocated: usize,
    pub cumulative_allocated: usize,
    pub agents: Vec<AgentTally>,
    pub tiers: Vec<TierTally>,
}

impl AllocationStats {
    pub fn agent(&self, name: &str) -> Option<&AgentTally> {
        self.agents.iter().find(|tally| tally.agent == name)
    }

    pub fn inactive_agents(&self) -> impl Iterator<Item = &AgentTally> {
        self.agents.iter().filter(|tally| !tally.active)
    }
}

/// Result of one engine run, handed to report writers and, for the next run,
/// back in as a [`PriorSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSnapshot {
    pub mode: ModeKind,
    pub agents: Vec<AgentAllocation>,
    pub unallocated: Vec<UnallocatedContact>,
    pub stats: AllocationStats,
    pub cursors: RoundRobinCursors,
}

impl AllocationSnapshot {
    pub fn agent(&self, name: &str) -> Option<&AgentAllocation> {
        self.agents.iter().find(|allocation| allocation.agent == name)
    }

    /// Contacts assigned to `name` during this run, in assignment order.
    pub fn new_assignments<'a>(
        &'a self,
        name: &str,
    ) -> impl Iterator<Item = &'a AssignedContact> + 'a {
        self.agent(name)
            .into_iter()
            .flat_map(|allocation| allocation.contacts.iter())
            .filter(|contact| contact.origin == AssignmentOrigin::Current)
    }

    /// Phone numbers across all agent lists.
    pub fn allocated_phones(&self) -> impl Iterator<Item = &str> {
        self.agents
            .iter()
            .flat_map(|allocation| allocation.contacts.iter())
            .map(|contact| contact.phone.as_str())
    }

    /// Converts the snapshot into the state carried by the next incremental run.
    /// Every assignment becomes a prior one; unallocated contacts are dropped.
    pub fn into_prior(self) -> PriorSnapshot {
        let agents = self
            .agents
            .into_iter()
            .map(|mut allocation| {
                for contact in &mut allocation.contacts {
                    contact.origin = AssignmentOrigin::Prior;
                }
                allocation
            })
            .collect();

        PriorSnapshot {
            agents,
            cursors: self.cursors,
        }
    }
}

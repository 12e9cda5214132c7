use super::allocator::{AllocationOutcome, Allocator, RoundRobinCursors, TierTally};
use super::domain::{Agent, InputTables};
use super::merge::{fold_assignments, AgentAllocation, RunMode};
use super::preprocess::{prepare_contacts, PreparedContacts};
use super::snapshot::{AgentTally, AllocationSnapshot, AllocationStats};
use super::validator::{validate_centers, ValidationError};
use std::collections::HashSet;
use std::num::NonZeroUsize;
use tracing::{info, warn};

const LOGGED_UNALLOCATED: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocationSettings {
    /// Cap on new assignments per agent in a single run. `None` is unlimited.
    pub max_per_agent: Option<NonZeroUsize>,
}

/// Runs validation, preprocessing, allocation and the incremental merge for
/// one set of input tables.
#[derive(Debug, Clone, Default)]
pub struct AllocationEngine {
    settings: AllocationSettings,
}

impl AllocationEngine {
    pub fn new(settings: AllocationSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> AllocationSettings {
        self.settings
    }

    pub fn run(
        &self,
        tables: &InputTables,
        mode: RunMode,
    ) -> Result<AllocationSnapshot, ValidationError> {
        validate_centers(&tables.contacts, &tables.agents)?;

        let roster = unique_roster(&tables.agents);
        let prepared = prepare_contacts(&tables.contacts, &tables.priorities);

        let kind = mode.kind();
        let prior = mode.prior();
        let (already_allocated, cursors) = match prior {
            Some(prior) => (prior.allocated_phones(), prior.cursors.clone()),
            None => (HashSet::new(), RoundRobinCursors::default()),
        };

        let outcome = Allocator::new(&roster, self.settings.max_per_agent).allocate(
            &prepared.contacts,
            &already_allocated,
            cursors,
        );
        if outcome.skipped_already_allocated > 0 {
            info!(
                input = prepared.contacts.len(),
                skipped = outcome.skipped_already_allocated,
                new = prepared.contacts.len() - outcome.skipped_already_allocated,
                "filtered contacts allocated by a prior run"
            );
        }

        let stats_base = RunCounts::new(tables, &prepared, &outcome, already_allocated.len());
        let AllocationOutcome {
            assignments,
            unallocated,
            tiers,
            cursors,
            ..
        } = outcome;

        let agents = fold_assignments(&roster, assignments, prior);
        let stats = stats_base.into_stats(&agents, tiers);

        let snapshot = AllocationSnapshot {
            mode: kind,
            agents,
            unallocated,
            stats,
            cursors,
        };
        log_snapshot(&snapshot);
        Ok(snapshot)
    }
}

/// First occurrence of each agent name wins; the name is the agent's identity.
fn unique_roster(agents: &[Agent]) -> Vec<Agent> {
    let mut seen = HashSet::with_capacity(agents.len());
    let mut roster = Vec::with_capacity(agents.len());
    for agent in agents {
        if seen.insert(agent.name.as_str()) {
            roster.push(agent.clone());
        } else {
            warn!(agent = %agent.name, "ignoring repeated agent row");
        }
    }
    roster
}

struct RunCounts {
    total_input: usize,
    duplicates_removed: usize,
    already_allocated: usize,
    considered: usize,
    newly_allocated: usize,
    unallocated: usize,
    previously_allocated: usize,
}

impl RunCounts {
    fn new(
        tables: &InputTables,
        prepared: &PreparedContacts,
        outcome: &AllocationOutcome,
        previously_allocated: usize,
    ) -> Self {
        Self {
            total_input: tables.contacts.len(),
            duplicates_removed: prepared.duplicates_removed(),
            already_allocated: outcome.skipped_already_allocated,
            considered: prepared.contacts.len() - outcome.skipped_already_allocated,
            newly_allocated: outcome.allocated(),
            unallocated: outcome.unallocated.len(),
            previously_allocated,
        }
    }

    fn into_stats(
        self,
        agents: &[AgentAllocation],
        tiers: Vec<TierTally>,
    ) -> AllocationStats {
        let tallies: Vec<AgentTally> = agents
            .iter()
            .map(|allocation| AgentTally {
                agent: allocation.agent.clone(),
                center: allocation.center.clone(),
                active: allocation.active,
                new: allocation.new_count(),
                cumulative: allocation.contacts.len(),
            })
            .collect();

        AllocationStats {
            total_input: self.total_input,
            duplicates_removed: self.duplicates_removed,
            already_allocated: self.already_allocated,
            considered: self.considered,
            newly_allocated: self.newly_allocated,
            unallocated: self.unallocated,
            previously_allocated: self.previously_allocated,
            cumulative_allocated: tallies.iter().map(|tally| tally.cumulative).sum(),
            agents: tallies,
            tiers,
        }
    }
}

fn log_snapshot(snapshot: &AllocationSnapshot) {
    let stats = &snapshot.stats;
    info!(
        mode = snapshot.mode.label(),
        total = stats.total_input,
        considered = stats.considered,
        allocated = stats.newly_allocated,
        unallocated = stats.unallocated,
        cumulative = stats.cumulative_allocated,
        "allocation complete"
    );

    for tally in stats.inactive_agents() {
        warn!(
            agent = %tally.agent,
            existing = tally.cumulative,
            "agent missing from roster, prior allocations preserved"
        );
    }

    for item in snapshot.unallocated.iter().take(LOGGED_UNALLOCATED) {
        warn!(
            name = %item.contact.name,
            phone = %item.contact.phone,
            reason = %item.reason,
            "contact left unallocated"
        );
    }
    if snapshot.unallocated.len() > LOGGED_UNALLOCATED {
        warn!(
            more = snapshot.unallocated.len() - LOGGED_UNALLOCATED,
            "further contacts left unallocated"
        );
    }
}

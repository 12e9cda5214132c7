use super::domain::{
    Agent, AssignedContact, Center, Contact, UnallocatedContact, UnallocatedReason,
};
use super::preprocess::PreparedContact;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::num::NonZeroUsize;
use tracing::debug;

/// Signature of an eligible pool, keying its rotation cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PoolKey {
    /// No agent has a center, so every agent is eligible for every contact.
    Roster,
    Center(String),
}

/// Where each pool's rotation resumes. Threaded through every tier and
/// carried between runs so consecutive tiers never restart at the first agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CursorEntry>", into = "Vec<CursorEntry>")]
pub struct RoundRobinCursors(BTreeMap<PoolKey, usize>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorEntry {
    /// Absent for the whole-roster pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<String>,
    pub next: usize,
}

impl RoundRobinCursors {
    pub fn next_for(&self, key: &PoolKey) -> usize {
        self.0.get(key).copied().unwrap_or(0)
    }

    pub fn set(&mut self, key: PoolKey, next: usize) {
        self.0.insert(key, next);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<CursorEntry>> for RoundRobinCursors {
    fn from(entries: Vec<CursorEntry>) -> Self {
        Self(
            entries
                .into_iter()
                .map(|entry| {
                    let key = match entry.center {
                        Some(center) => PoolKey::Center(center),
                        None => PoolKey::Roster,
                    };
                    (key, entry.next)
                })
                .collect(),
        )
    }
}

impl From<RoundRobinCursors> for Vec<CursorEntry> {
    fn from(cursors: RoundRobinCursors) -> Self {
        cursors
            .0
            .into_iter()
            .map(|(key, next)| CursorEntry {
                center: match key {
                    PoolKey::Roster => None,
                    PoolKey::Center(center) => Some(center),
                },
                next,
            })
            .collect()
    }
}

/// Per-priority counts for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTally {
    pub priority: u32,
    pub contacts: usize,
    pub allocated: usize,
    pub unallocated: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AllocationOutcome {
    /// New assignments, parallel to the roster handed to [`Allocator::new`].
    pub assignments: Vec<Vec<AssignedContact>>,
    pub unallocated: Vec<UnallocatedContact>,
    pub tiers: Vec<TierTally>,
    pub skipped_already_allocated: usize,
    pub cursors: RoundRobinCursors,
}

impl AllocationOutcome {
    pub fn allocated(&self) -> usize {
        self.assignments.iter().map(Vec::len).sum()
    }
}

/// Priority-tiered round-robin distribution over a fixed roster.
pub struct Allocator<'a> {
    agents: &'a [Agent],
    max_per_agent: Option<NonZeroUsize>,
    roster_has_centers: bool,
    center_pools: HashMap<&'a str, Vec<usize>>,
    roster_pool: Vec<usize>,
}

impl<'a> Allocator<'a> {
    pub fn new(agents: &'a [Agent], max_per_agent: Option<NonZeroUsize>) -> Self {
        let mut center_pools: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, agent) in agents.iter().enumerate() {
            if let Some(center) = agent.center.as_deref() {
                center_pools.entry(center).or_default().push(idx);
            }
        }

        Self {
            agents,
            max_per_agent,
            roster_has_centers: !center_pools.is_empty(),
            center_pools,
            roster_pool: (0..agents.len()).collect(),
        }
    }

    /// Allocates every contact not in `already_allocated`, tier by tier,
    /// resuming each pool's rotation from `cursors`.
    pub fn allocate(
        &self,
        contacts: &[PreparedContact],
        already_allocated: &HashSet<String>,
        mut cursors: RoundRobinCursors,
    ) -> AllocationOutcome {
        let mut tiers: BTreeMap<u32, Vec<&PreparedContact>> = BTreeMap::new();
        let mut skipped_already_allocated = 0;
        for prepared in contacts {
            if already_allocated.contains(&prepared.contact.phone) {
                skipped_already_allocated += 1;
                continue;
            }
            tiers.entry(prepared.priority).or_default().push(prepared);
        }

        let mut ledger = Ledger {
            assignments: vec![Vec::new(); self.agents.len()],
            unallocated: Vec::new(),
        };
        let mut tallies = Vec::with_capacity(tiers.len());

        for (priority, tier) in tiers {
            let tally = self.allocate_tier(priority, &tier, &mut cursors, &mut ledger);
            debug!(
                priority,
                contacts = tally.contacts,
                allocated = tally.allocated,
                unallocated = tally.unallocated,
                "allocated priority tier"
            );
            tallies.push(tally);
        }

        AllocationOutcome {
            assignments: ledger.assignments,
            unallocated: ledger.unallocated,
            tiers: tallies,
            skipped_already_allocated,
            cursors,
        }
    }

    fn allocate_tier(
        &self,
        priority: u32,
        tier: &[&PreparedContact],
        cursors: &mut RoundRobinCursors,
        ledger: &mut Ledger,
    ) -> TierTally {
        let mut tally = TierTally {
            priority,
            contacts: tier.len(),
            allocated: 0,
            unallocated: 0,
        };

        for prepared in tier {
            match self.place(&prepared.contact, cursors, ledger) {
                Ok(agent_idx) => {
                    ledger.assignments[agent_idx]
                        .push(AssignedContact::current(&prepared.contact, priority));
                    tally.allocated += 1;
                }
                Err(reason) => {
                    ledger.unallocated.push(UnallocatedContact {
                        contact: prepared.contact.clone(),
                        priority,
                        reason,
                    });
                    tally.unallocated += 1;
                }
            }
        }

        tally
    }

    fn place(
        &self,
        contact: &Contact,
        cursors: &mut RoundRobinCursors,
        ledger: &Ledger,
    ) -> Result<usize, UnallocatedReason> {
        let (key, pool) = self.pool_for(&contact.center)?;
        let start = cursors.next_for(&key) % pool.len();

        for offset in 0..pool.len() {
            let slot = (start + offset) % pool.len();
            let agent_idx = pool[slot];
            if self.has_capacity(ledger.assignments[agent_idx].len()) {
                cursors.set(key, (slot + 1) % pool.len());
                return Ok(agent_idx);
            }
        }

        Err(UnallocatedReason::LimitReached)
    }

    fn pool_for(&self, center: &Center) -> Result<(PoolKey, &[usize]), UnallocatedReason> {
        if self.agents.is_empty() {
            return Err(UnallocatedReason::NoAgentsAvailable);
        }
        if !self.roster_has_centers {
            return Ok((PoolKey::Roster, self.roster_pool.as_slice()));
        }

        center
            .as_deref()
            .and_then(|name| {
                self.center_pools
                    .get(name)
                    .map(|pool| (PoolKey::Center(name.to_string()), pool.as_slice()))
            })
            .ok_or_else(|| UnallocatedReason::NoMatchingCenter {
                center: center.clone(),
            })
    }

    fn has_capacity(&self, assigned: usize) -> bool {
        self.max_per_agent
            .map_or(true, |limit| assigned < limit.get())
    }
}

struct Ledger {
    assignments: Vec<Vec<AssignedContact>>,
    unallocated: Vec<UnallocatedContact>,
}

use crate::workflows::allocation::{
    Agent, AllocationEngine, AllocationSettings, AllocationSnapshot, Contact, InputTables,
    PriorityMap, RunMode,
};
use std::collections::{BTreeSet, HashMap};
use std::num::NonZeroUsize;

pub(super) fn agents(names: &[&str]) -> Vec<Agent> {
    names.iter().map(|name| Agent::new(*name)).collect()
}

pub(super) fn centered_agents(entries: &[(&str, &str)]) -> Vec<Agent> {
    entries
        .iter()
        .map(|(name, center)| Agent::new(*name).with_center(*center))
        .collect()
}

/// `count` contacts with phones `<prefix>000`, `<prefix>001`, ...
pub(super) fn contacts(prefix: &str, count: usize, source: &str) -> Vec<Contact> {
    (0..count)
        .map(|idx| {
            Contact::new(format!("{prefix} {idx}"), format!("{prefix}{idx:03}")).with_source(source)
        })
        .collect()
}

pub(super) fn centered_contact(phone: &str, center: &str) -> Contact {
    Contact::new(format!("Lead {phone}"), phone).with_center(center)
}

pub(super) fn priorities() -> PriorityMap {
    [("Workshop", 1), ("Website", 2), ("Referral", 3)]
        .into_iter()
        .collect()
}

pub(super) fn tables(contacts: Vec<Contact>, agents: Vec<Agent>) -> InputTables {
    InputTables {
        contacts,
        agents,
        priorities: priorities(),
    }
}

pub(super) fn engine(limit: Option<usize>) -> AllocationEngine {
    AllocationEngine::new(AllocationSettings {
        max_per_agent: limit.and_then(NonZeroUsize::new),
    })
}

pub(super) fn run_fresh(tables: &InputTables, limit: Option<usize>) -> AllocationSnapshot {
    engine(limit)
        .run(tables, RunMode::Fresh)
        .expect("allocation succeeds")
}

pub(super) fn new_counts(snapshot: &AllocationSnapshot) -> Vec<usize> {
    snapshot
        .stats
        .agents
        .iter()
        .filter(|tally| tally.active)
        .map(|tally| tally.new)
        .collect()
}

pub(super) fn phones_by_agent(snapshot: &AllocationSnapshot) -> HashMap<String, BTreeSet<String>> {
    snapshot
        .agents
        .iter()
        .map(|allocation| {
            let phones = allocation
                .contacts
                .iter()
                .map(|contact| contact.phone.clone())
                .collect();
            (allocation.agent.clone(), phones)
        })
        .collect()
}

/// Every deduplicated input phone sits in exactly one agent list or in the
/// unallocated list.
pub(super) fn assert_partition(snapshot: &AllocationSnapshot, tables: &InputTables) {
    let mut placements: HashMap<&str, usize> = HashMap::new();
    for phone in snapshot.allocated_phones() {
        *placements.entry(phone).or_default() += 1;
    }
    for item in &snapshot.unallocated {
        *placements.entry(item.contact.phone.as_str()).or_default() += 1;
    }

    let input: BTreeSet<&str> = tables
        .contacts
        .iter()
        .map(|contact| contact.phone.as_str())
        .collect();
    for phone in &input {
        assert_eq!(
            placements.get(phone).copied(),
            Some(1),
            "phone {phone} should be placed exactly once"
        );
    }
}

pub(super) fn spread(counts: &[usize]) -> usize {
    let max = counts.iter().copied().max().unwrap_or(0);
    let min = counts.iter().copied().min().unwrap_or(0);
    max - min
}

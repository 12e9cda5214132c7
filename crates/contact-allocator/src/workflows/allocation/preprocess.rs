use super::domain::{Contact, PriorityMap};
use std::collections::{BTreeSet, HashMap};
use tracing::{info, warn};

const LOGGED_DUPLICATES: usize = 5;

/// Contact that survived deduplication, annotated with its priority rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedContact {
    pub contact: Contact,
    pub priority: u32,
}

/// A dropped repeat of a phone number already seen earlier in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateContact {
    pub phone: String,
    pub kept_name: String,
    pub dropped_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct PreparedContacts {
    pub contacts: Vec<PreparedContact>,
    pub duplicates: Vec<DuplicateContact>,
    pub missing_source: usize,
    pub unknown_sources: BTreeSet<String>,
}

impl PreparedContacts {
    pub fn duplicates_removed(&self) -> usize {
        self.duplicates.len()
    }
}

/// Stable dedup by phone (first occurrence wins) followed by priority lookup.
pub fn prepare_contacts(contacts: &[Contact], priorities: &PriorityMap) -> PreparedContacts {
    let mut kept_names: HashMap<&str, &str> = HashMap::with_capacity(contacts.len());
    let mut prepared = PreparedContacts::default();

    for contact in contacts {
        if let Some(kept_name) = kept_names.get(contact.phone.as_str()) {
            prepared.duplicates.push(DuplicateContact {
                phone: contact.phone.clone(),
                kept_name: (*kept_name).to_string(),
                dropped_name: contact.name.clone(),
            });
            continue;
        }
        kept_names.insert(&contact.phone, &contact.name);

        let priority = match contact.source.as_deref() {
            None => {
                prepared.missing_source += 1;
                priorities.rank_for(None)
            }
            Some(source) => {
                if priorities.get(source).is_none() {
                    prepared.unknown_sources.insert(source.to_string());
                }
                priorities.rank_for(Some(source))
            }
        };

        prepared.contacts.push(PreparedContact {
            contact: contact.clone(),
            priority,
        });
    }

    log_preparation(&prepared);
    prepared
}

fn log_preparation(prepared: &PreparedContacts) {
    if !prepared.duplicates.is_empty() {
        warn!(
            removed = prepared.duplicates.len(),
            "removed duplicate phone numbers, kept first occurrence"
        );
        for dup in prepared.duplicates.iter().take(LOGGED_DUPLICATES) {
            info!(
                phone = %dup.phone,
                kept = %dup.kept_name,
                dropped = %dup.dropped_name,
                "duplicate phone number"
            );
        }
    }

    if prepared.missing_source > 0 {
        info!(
            count = prepared.missing_source,
            "contacts without source assigned the default priority"
        );
    }
    if !prepared.unknown_sources.is_empty() {
        warn!(sources = ?prepared.unknown_sources, "unknown sources assigned the default priority");
    }

    info!(unique = prepared.contacts.len(), "contacts ready for allocation");
}

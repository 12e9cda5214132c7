use super::domain::{Agent, Contact};
use std::fmt;
use tracing::{error, info};

const EXAMPLE_LIMIT: usize = 3;

/// Which input table broke the center-consistency rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordCollection {
    Contacts,
    Agents,
}

impl RecordCollection {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Contacts => "contacts",
            Self::Agents => "agents",
        }
    }
}

impl fmt::Display for RecordCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error(
        "center validation failed for {collection}: {with_center} have a center, \
         {without_center} are missing one (with center: {}; without center: {}). \
         Either all {collection} must have a center or none.",
        .with_examples.join(", "),
        .without_examples.join(", ")
    )]
    CenterInconsistency {
        collection: RecordCollection,
        with_center: usize,
        without_center: usize,
        with_examples: Vec<String>,
        without_examples: Vec<String>,
    },
}

impl ValidationError {
    pub fn collection(&self) -> RecordCollection {
        match self {
            ValidationError::CenterInconsistency { collection, .. } => *collection,
        }
    }
}

/// Outcome of a successful validation, used to pick the eligibility rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CenterLayout {
    pub contacts_have_centers: bool,
    pub agents_have_centers: bool,
}

/// Checks that contacts and agents are each either fully centered or not at all.
pub fn validate_centers(
    contacts: &[Contact],
    agents: &[Agent],
) -> Result<CenterLayout, ValidationError> {
    let contacts_have_centers = check_collection(
        RecordCollection::Contacts,
        contacts,
        |contact| contact.center.is_set(),
        |contact| format!("{} ({})", contact.name, contact.phone),
    )?;
    let agents_have_centers = check_collection(
        RecordCollection::Agents,
        agents,
        |agent| agent.center.is_set(),
        |agent| agent.name.clone(),
    )?;

    if contacts_have_centers {
        info!(count = contacts.len(), "all contacts have a center");
    } else {
        info!("no contacts have a center");
    }
    if agents_have_centers {
        info!(count = agents.len(), "all agents have a center");
    } else {
        info!("no agents have a center, center matching disabled");
    }

    Ok(CenterLayout {
        contacts_have_centers,
        agents_have_centers,
    })
}

fn check_collection<T>(
    collection: RecordCollection,
    records: &[T],
    has_center: impl Fn(&T) -> bool,
    describe: impl Fn(&T) -> String,
) -> Result<bool, ValidationError> {
    let (with, without): (Vec<&T>, Vec<&T>) =
        records.iter().partition(|record| has_center(record));

    if !with.is_empty() && !without.is_empty() {
        let err = ValidationError::CenterInconsistency {
            collection,
            with_center: with.len(),
            without_center: without.len(),
            with_examples: with.iter().take(EXAMPLE_LIMIT).map(|r| describe(r)).collect(),
            without_examples: without
                .iter()
                .take(EXAMPLE_LIMIT)
                .map(|r| describe(r))
                .collect(),
        };
        error!(%collection, "{err}");
        return Err(err);
    }

    Ok(!with.is_empty())
}

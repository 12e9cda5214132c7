use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Rank given to contacts whose source is missing or absent from the priority map.
pub const DEFAULT_PRIORITY: u32 = 999;

/// Geographic grouping shared by contacts and agents.
///
/// Only emptiness is normalized: blank or whitespace-only values collapse to
/// [`Center::none`], every other value is kept verbatim and compared exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub struct Center(Option<String>);

impl Center {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Self(None)
        } else {
            Self(Some(value))
        }
    }

    pub const fn none() -> Self {
        Self(None)
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn label(&self) -> &str {
        self.0.as_deref().unwrap_or("Any")
    }
}

impl From<Option<String>> for Center {
    fn from(value: Option<String>) -> Self {
        value.map(Center::new).unwrap_or_default()
    }
}

impl From<Center> for Option<String> {
    fn from(value: Center) -> Self {
        value.0
    }
}

impl From<&str> for Center {
    fn from(value: &str) -> Self {
        Center::new(value)
    }
}

/// Inbound contact keyed by its phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub center: Center,
    #[serde(default)]
    pub source: Option<String>,
}

impl Contact {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            center: Center::none(),
            source: None,
        }
    }

    pub fn with_center(mut self, center: impl Into<Center>) -> Self {
        self.center = center.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        let source = source.into();
        self.source = if source.trim().is_empty() {
            None
        } else {
            Some(source)
        };
        self
    }
}

/// Handler receiving contacts, keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub name: String,
    #[serde(default)]
    pub center: Center,
}

impl Agent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            center: Center::none(),
        }
    }

    pub fn with_center(mut self, center: impl Into<Center>) -> Self {
        self.center = center.into();
        self
    }
}

/// Source-of-interest to priority lookup. Lower ranks are allocated first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriorityMap(HashMap<String, u32>);

impl PriorityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: impl Into<String>, priority: u32) {
        self.0.insert(source.into(), priority);
    }

    pub fn get(&self, source: &str) -> Option<u32> {
        self.0.get(source).copied()
    }

    pub fn rank_for(&self, source: Option<&str>) -> u32 {
        source
            .and_then(|source| self.get(source))
            .unwrap_or(DEFAULT_PRIORITY)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries ordered by priority, then source, for stable rendering.
    pub fn entries(&self) -> Vec<(&str, u32)> {
        let mut entries: Vec<_> = self
            .0
            .iter()
            .map(|(source, priority)| (source.as_str(), *priority))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        entries
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for PriorityMap {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(source, priority)| (source.into(), priority))
                .collect(),
        )
    }
}

/// The three typed tables a run consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputTables {
    pub contacts: Vec<Contact>,
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub priorities: PriorityMap,
}

/// Why a contact could not be placed with any agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnallocatedReason {
    NoAgentsAvailable,
    NoMatchingCenter { center: Center },
    LimitReached,
}

impl fmt::Display for UnallocatedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnallocatedReason::NoAgentsAvailable => write!(f, "no agents available"),
            UnallocatedReason::NoMatchingCenter { center } => match center.as_deref() {
                Some(center) => write!(f, "no agent serves center '{center}'"),
                None => write!(f, "contact has no center but every agent is assigned one"),
            },
            UnallocatedReason::LimitReached => write!(
                f,
                "all eligible agents have reached the per-run allocation limit"
            ),
        }
    }
}

/// Contact that stayed unplaced, with its rank and reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnallocatedContact {
    pub contact: Contact,
    pub priority: u32,
    pub reason: UnallocatedReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentOrigin {
    /// Carried over from a prior snapshot.
    Prior,
    /// Assigned during the current run.
    Current,
}

impl AssignmentOrigin {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Prior => "Existing",
            Self::Current => "New",
        }
    }
}

/// Entry of an agent's assignment list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedContact {
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    pub origin: AssignmentOrigin,
}

impl AssignedContact {
    pub fn prior(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            priority: None,
            origin: AssignmentOrigin::Prior,
        }
    }

    pub(crate) fn current(contact: &Contact, priority: u32) -> Self {
        Self {
            name: contact.name.clone(),
            phone: contact.phone.clone(),
            priority: Some(priority),
            origin: AssignmentOrigin::Current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_center_collapses_but_values_stay_verbatim() {
        assert!(!Center::new("   ").is_set());
        assert!(!Center::from(Some(String::new())).is_set());
        assert_eq!(Center::new("Mumbai ").as_deref(), Some("Mumbai "));
        assert_ne!(Center::new("Mumbai"), Center::new("Mumbai "));
        assert_ne!(Center::new("mumbai"), Center::new("Mumbai"));
    }

    #[test]
    fn unknown_or_missing_source_ranks_last() {
        let priorities: PriorityMap = [("Workshop", 1), ("Website", 2)].into_iter().collect();
        assert_eq!(priorities.rank_for(Some("Workshop")), 1);
        assert_eq!(priorities.rank_for(Some("Referral")), DEFAULT_PRIORITY);
        assert_eq!(priorities.rank_for(None), DEFAULT_PRIORITY);
    }

    #[test]
    fn reason_labels_name_the_center() {
        let reason = UnallocatedReason::NoMatchingCenter {
            center: Center::new("Bangalore"),
        };
        assert!(reason.to_string().contains("Bangalore"));
        assert!(UnallocatedReason::LimitReached.to_string().contains("limit"));
    }

    #[test]
    fn center_serializes_as_optional_string() {
        let agent = Agent::new("Asha").with_center("Delhi");
        let json = serde_json::to_value(&agent).expect("serialize agent");
        assert_eq!(json["center"], "Delhi");

        let parsed: Agent =
            serde_json::from_str(r#"{"name":"Ravi","center":"  "}"#).expect("parse agent");
        assert!(!parsed.center.is_set());
    }
}

use super::normalizer::{normalize_cell, normalize_phone};
use crate::workflows::allocation::{Agent, Contact, PriorityMap, DEFAULT_PRIORITY};
use serde::{Deserialize, Deserializer};
use std::io::Read;
use tracing::warn;

pub(crate) fn parse_contacts<R: Read>(reader: R) -> Result<Vec<Contact>, csv::Error> {
    let mut contacts = Vec::new();

    for record in csv_reader(reader).deserialize::<ContactRow>() {
        let row = record?;
        let (Some(name), Some(phone)) = (row.name, row.phone) else {
            continue;
        };
        let phone = normalize_phone(&phone);
        if phone.is_empty() {
            continue;
        }

        let mut contact = Contact::new(name, phone).with_center(row.center);
        if let Some(source) = row.source {
            contact = contact.with_source(source);
        }
        contacts.push(contact);
    }

    Ok(contacts)
}

pub(crate) fn parse_agents<R: Read>(reader: R) -> Result<Vec<Agent>, csv::Error> {
    let mut agents = Vec::new();

    for record in csv_reader(reader).deserialize::<AgentRow>() {
        let row = record?;
        if let Some(name) = row.name {
            agents.push(Agent::new(name).with_center(row.center));
        }
    }

    Ok(agents)
}

pub(crate) fn parse_priorities<R: Read>(reader: R) -> Result<PriorityMap, csv::Error> {
    let mut priorities = PriorityMap::new();

    for (idx, record) in csv_reader(reader).deserialize::<PriorityRow>().enumerate() {
        let row = record?;
        let Some(source) = row.source else {
            continue;
        };
        let priority = match row.priority.as_deref().map(str::parse::<u32>) {
            Some(Ok(value)) if value > 0 => value,
            _ => {
                warn!(
                    row = idx + 1,
                    source = %source,
                    value = row.priority.as_deref().unwrap_or(""),
                    fallback = DEFAULT_PRIORITY,
                    "invalid priority value"
                );
                DEFAULT_PRIORITY
            }
        };
        priorities.insert(source, priority);
    }

    Ok(priorities)
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader)
}

#[derive(Debug, Deserialize)]
struct ContactRow {
    #[serde(rename = "Name", default, deserialize_with = "empty_string_as_none")]
    name: Option<String>,
    #[serde(
        rename = "Phone Number",
        alias = "Phone",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    phone: Option<String>,
    #[serde(rename = "Center", default, deserialize_with = "empty_string_as_none")]
    center: Option<String>,
    #[serde(
        rename = "Source of Interest",
        alias = "Source",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AgentRow {
    #[serde(rename = "Name", default, deserialize_with = "empty_string_as_none")]
    name: Option<String>,
    #[serde(rename = "Center", default, deserialize_with = "empty_string_as_none")]
    center: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PriorityRow {
    #[serde(
        rename = "Source of Interest",
        alias = "Source",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    source: Option<String>,
    #[serde(rename = "Priority", default, deserialize_with = "empty_string_as_none")]
    priority: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt
        .map(|value| normalize_cell(&value))
        .filter(|value| !value.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::allocation::Center;
    use std::io::Cursor;

    #[test]
    fn contacts_skip_rows_without_name_or_phone() {
        let csv = "Name,Phone Number,Center,Source of Interest\n\
                   Meera,9820011111.0,Mumbai,Workshop\n\
                   ,9820022222,Mumbai,Website\n\
                   Kabir,,Delhi,Website\n\
                   Ira,9820033333,,\n";

        let contacts = parse_contacts(Cursor::new(csv)).expect("contacts parse");

        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].phone, "9820011111");
        assert_eq!(contacts[0].center, Center::new("Mumbai"));
        assert_eq!(contacts[0].source.as_deref(), Some("Workshop"));
        assert!(!contacts[1].center.is_set());
        assert_eq!(contacts[1].source, None);
    }

    #[test]
    fn short_rows_are_accepted() {
        let csv = "Name,Phone Number,Center,Source of Interest\nMeera,1\n";

        let contacts = parse_contacts(Cursor::new(csv)).expect("contacts parse");

        assert_eq!(contacts.len(), 1);
        assert!(!contacts[0].center.is_set());
    }

    #[test]
    fn agents_without_names_are_skipped() {
        let csv = "Name,Center\nAsha,Pune\n,Pune\nRavi,\n";

        let agents = parse_agents(Cursor::new(csv)).expect("agents parse");

        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].center, Center::new("Pune"));
        assert!(!agents[1].center.is_set());
    }

    #[test]
    fn invalid_priorities_fall_back_to_default() {
        let csv = "Source of Interest,Priority\nWorkshop,1\nWebsite,high\nReferral,0\n,4\n";

        let priorities = parse_priorities(Cursor::new(csv)).expect("priorities parse");

        assert_eq!(priorities.len(), 3);
        assert_eq!(priorities.get("Workshop"), Some(1));
        assert_eq!(priorities.get("Website"), Some(DEFAULT_PRIORITY));
        assert_eq!(priorities.get("Referral"), Some(DEFAULT_PRIORITY));
    }
}

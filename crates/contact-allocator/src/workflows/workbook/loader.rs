use super::manifest::WorkbookManifest;
use super::{sheet_path, WorkbookError, SUMMARY_SHEET, UNALLOCATED_SHEET};
use crate::workflows::allocation::{AgentAllocation, AssignedContact, PriorSnapshot};
use crate::workflows::sheets::{normalize_phone, TabNames};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Reads the agent sheets of a previously written workbook.
///
/// Returns `Ok(None)` when `dir` does not exist. Agent lists come from the
/// sheets recorded in `rotation.json`; a directory without one is read as a
/// hand-assembled workbook where every non-reserved CSV is an agent sheet and
/// every pool resumes from its first agent.
pub fn load_prior(dir: &Path, tabs: &TabNames) -> Result<Option<PriorSnapshot>, WorkbookError> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let prior = match WorkbookManifest::read(dir)? {
        Some(manifest) => {
            let mut agents = Vec::with_capacity(manifest.agents.len());
            for entry in manifest.agents {
                let path = sheet_path(dir, &entry.sheet);
                if !path.is_file() {
                    return Err(WorkbookError::MissingSheet {
                        agent: entry.agent,
                        path,
                    });
                }
                agents.push(load_agent(entry.agent, &path)?);
            }
            PriorSnapshot {
                agents,
                cursors: manifest.cursors,
            }
        }
        None => {
            let mut agents = Vec::new();
            for (agent, path) in scan_agent_sheets(dir, tabs)? {
                agents.push(load_agent(agent, &path)?);
            }
            PriorSnapshot {
                agents,
                ..PriorSnapshot::default()
            }
        }
    };

    info!(
        dir = %dir.display(),
        agents = prior.agents.len(),
        allocated = prior.total_allocated(),
        "loaded prior allocations"
    );
    Ok(Some(prior))
}

fn scan_agent_sheets(dir: &Path, tabs: &TabNames) -> Result<Vec<(String, PathBuf)>, WorkbookError> {
    let mut sheets = Vec::new();
    let entries = fs::read_dir(dir).map_err(|source| WorkbookError::io(dir, source))?;
    for entry in entries {
        let path = entry.map_err(|source| WorkbookError::io(dir, source))?.path();
        if !path.is_file() || path.extension().map_or(true, |ext| ext != "csv") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        if stem == SUMMARY_SHEET || stem == UNALLOCATED_SHEET || tabs.is_input_tab(stem) {
            continue;
        }
        sheets.push((stem.to_string(), path));
    }
    sheets.sort();
    Ok(sheets)
}

fn load_agent(agent: String, path: &Path) -> Result<AgentAllocation, WorkbookError> {
    let contacts = read_agent_sheet(path)?;
    debug!(agent = %agent, contacts = contacts.len(), "loaded prior agent sheet");
    Ok(AgentAllocation::new(agent, contacts))
}

#[derive(Debug, Deserialize)]
struct AgentSheetRow {
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "Phone Number", default)]
    phone: Option<String>,
}

fn read_agent_sheet(path: &Path) -> Result<Vec<AssignedContact>, WorkbookError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|source| WorkbookError::csv(path, source))?;

    let mut contacts = Vec::new();
    for record in reader.deserialize::<AgentSheetRow>() {
        let row = record.map_err(|source| WorkbookError::csv(path, source))?;
        let name = row.name.unwrap_or_default();
        let phone = normalize_phone(&row.phone.unwrap_or_default());
        if name.is_empty() || phone.is_empty() {
            continue;
        }
        contacts.push(AssignedContact::prior(name, phone));
    }
    Ok(contacts)
}

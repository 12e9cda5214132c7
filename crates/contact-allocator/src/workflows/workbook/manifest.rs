use super::{WorkbookError, ROTATION_FILE, SUMMARY_SHEET, UNALLOCATED_SHEET};
use crate::workflows::allocation::RoundRobinCursors;
use crate::workflows::sheets::TabNames;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Agent list stored under a sheet name that differs from the agent name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSheet {
    pub agent: String,
    pub sheet: String,
}

/// Contents of `rotation.json`.
///
/// `sheets` lists every sheet the workbook wrote, so a rewrite only removes
/// files it owns. `agents` maps agent lists to their sheets in snapshot order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkbookManifest {
    #[serde(default)]
    pub sheets: Vec<String>,
    #[serde(default)]
    pub agents: Vec<AgentSheet>,
    #[serde(default)]
    pub cursors: RoundRobinCursors,
}

impl WorkbookManifest {
    pub(super) fn read(dir: &Path) -> Result<Option<Self>, WorkbookError> {
        let path = dir.join(ROTATION_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let raw = fs::read(&path).map_err(|source| WorkbookError::io(&path, source))?;
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| WorkbookError::Rotation { path, source })
    }

    pub(super) fn write(&self, dir: &Path) -> Result<(), WorkbookError> {
        let path = dir.join(ROTATION_FILE);
        let raw = serde_json::to_vec_pretty(self).map_err(|source| WorkbookError::Rotation {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, raw).map_err(|source| WorkbookError::io(&path, source))
    }
}

/// Hands out one sheet name per agent. Names are compared case-insensitively
/// and never reuse a reserved sheet or one already handed out.
pub(super) struct SheetNamer {
    taken: HashSet<String>,
}

impl SheetNamer {
    pub(super) fn new(tabs: &TabNames) -> Self {
        let taken = [
            SUMMARY_SHEET,
            UNALLOCATED_SHEET,
            tabs.contacts.as_str(),
            tabs.agents.as_str(),
            tabs.priorities.as_str(),
        ]
        .into_iter()
        .map(str::to_lowercase)
        .collect();
        Self { taken }
    }

    pub(super) fn claim(&mut self, agent: &str) -> String {
        let base = agent_sheet_name(agent);
        if self.taken.insert(base.to_lowercase()) {
            return base;
        }
        let mut suffix = 2;
        loop {
            let candidate = format!("{base} ({suffix})");
            if self.taken.insert(candidate.to_lowercase()) {
                return candidate;
            }
            suffix += 1;
        }
    }
}

/// Base file stem for an agent's sheet. Characters that spreadsheet tabs or
/// file systems reject become `_`.
pub fn agent_sheet_name(agent: &str) -> String {
    let sheet = agent.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|', '[', ']'], "_");
    if sheet.trim().is_empty() {
        "Agent".to_string()
    } else {
        sheet
    }
}

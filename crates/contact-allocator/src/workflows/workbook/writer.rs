use super::manifest::{AgentSheet, SheetNamer, WorkbookManifest};
use super::{sheet_path, WorkbookError, ROTATION_FILE, SUMMARY_SHEET, UNALLOCATED_SHEET};
use crate::workflows::allocation::{AllocationSnapshot, InputTables, SummarySheet};
use crate::workflows::sheets::TabNames;
use chrono::NaiveDateTime;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

/// Rewrites the workbook in `dir` from the run's input tables and snapshot.
///
/// Sheets listed in an earlier `rotation.json` are removed first so a later
/// incremental load only sees the agents of this snapshot. Files the workbook
/// never wrote are left alone. Every agent list is written; names that clash
/// with another sheet get a numbered sheet and the mapping is recorded.
pub fn write_workbook(
    dir: &Path,
    tabs: &TabNames,
    tables: &InputTables,
    snapshot: &AllocationSnapshot,
    generated_at: NaiveDateTime,
) -> Result<(), WorkbookError> {
    fs::create_dir_all(dir).map_err(|source| WorkbookError::io(dir, source))?;
    clear_previous(dir)?;
    let mut written = vec![
        tabs.contacts.clone(),
        tabs.agents.clone(),
        tabs.priorities.clone(),
        SUMMARY_SHEET.to_string(),
    ];

    write_sheet(
        &sheet_path(dir, &tabs.contacts),
        ["Name", "Phone Number", "Center", "Source of Interest"],
        tables.contacts.iter().map(|contact| {
            [
                contact.name.clone(),
                contact.phone.clone(),
                contact.center.as_deref().unwrap_or_default().to_string(),
                contact.source.clone().unwrap_or_default(),
            ]
        }),
    )?;
    write_sheet(
        &sheet_path(dir, &tabs.agents),
        ["Name", "Center"],
        tables.agents.iter().map(|agent| {
            [
                agent.name.clone(),
                agent.center.as_deref().unwrap_or_default().to_string(),
            ]
        }),
    )?;
    write_sheet(
        &sheet_path(dir, &tabs.priorities),
        ["Source of Interest", "Priority"],
        tables
            .priorities
            .entries()
            .into_iter()
            .map(|(source, priority)| [source.to_string(), priority.to_string()]),
    )?;

    let summary = SummarySheet::build(snapshot, generated_at);
    write_rows(
        &sheet_path(dir, SUMMARY_SHEET),
        summary.rows.iter().map(|row| row.cells.clone()),
    )?;

    let mut namer = SheetNamer::new(tabs);
    let mut agent_sheets = Vec::with_capacity(snapshot.agents.len());
    for allocation in &snapshot.agents {
        let sheet = namer.claim(&allocation.agent);
        if sheet != allocation.agent {
            debug!(agent = %allocation.agent, sheet = %sheet, "agent stored under another sheet name");
        }
        write_sheet(
            &sheet_path(dir, &sheet),
            ["Name", "Phone Number"],
            allocation
                .contacts
                .iter()
                .map(|contact| [contact.name.clone(), contact.phone.clone()]),
        )?;
        written.push(sheet.clone());
        agent_sheets.push(AgentSheet {
            agent: allocation.agent.clone(),
            sheet,
        });
    }

    if !snapshot.unallocated.is_empty() {
        write_sheet(
            &sheet_path(dir, UNALLOCATED_SHEET),
            ["Name", "Phone Number", "Center", "Source", "Reason"],
            snapshot.unallocated.iter().map(|item| {
                [
                    item.contact.name.clone(),
                    item.contact.phone.clone(),
                    item.contact.center.as_deref().unwrap_or_default().to_string(),
                    item.contact.source.clone().unwrap_or_default(),
                    item.reason.to_string(),
                ]
            }),
        )?;
        written.push(UNALLOCATED_SHEET.to_string());
    }

    WorkbookManifest {
        sheets: written,
        agents: agent_sheets,
        cursors: snapshot.cursors.clone(),
    }
    .write(dir)?;

    info!(
        dir = %dir.display(),
        agents = snapshot.agents.len(),
        unallocated = snapshot.unallocated.len(),
        "workbook written"
    );
    Ok(())
}

fn clear_previous(dir: &Path) -> Result<(), WorkbookError> {
    let previous = match WorkbookManifest::read(dir) {
        Ok(Some(manifest)) => manifest,
        Ok(None) => return Ok(()),
        Err(err) => {
            warn!(error = %err, "previous rotation state unreadable, keeping existing sheets");
            return Ok(());
        }
    };

    for sheet in &previous.sheets {
        if sheet.contains(['/', '\\']) {
            warn!(sheet = %sheet, "ignoring sheet outside the workbook directory");
            continue;
        }
        let path = sheet_path(dir, sheet);
        if path.is_file() {
            debug!(path = %path.display(), "removing previous sheet");
            fs::remove_file(&path).map_err(|source| WorkbookError::io(&path, source))?;
        }
    }
    let rotation = dir.join(ROTATION_FILE);
    fs::remove_file(&rotation).map_err(|source| WorkbookError::io(&rotation, source))
}

fn write_sheet<const N: usize, I>(path: &Path, header: [&str; N], rows: I) -> Result<(), WorkbookError>
where
    I: IntoIterator<Item = [String; N]>,
{
    let header = header.map(str::to_string);
    write_rows(path, std::iter::once(header).chain(rows))
}

fn write_rows<const N: usize, I>(path: &Path, rows: I) -> Result<(), WorkbookError>
where
    I: IntoIterator<Item = [String; N]>,
{
    let mut writer =
        csv::Writer::from_path(path).map_err(|source| WorkbookError::csv(path, source))?;
    for row in rows {
        writer
            .write_record(&row)
            .map_err(|source| WorkbookError::csv(path, source))?;
    }
    writer
        .flush()
        .map_err(|source: io::Error| WorkbookError::io(path, source))
}

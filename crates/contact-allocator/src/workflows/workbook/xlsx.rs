use super::{WorkbookError, SUMMARY_SHEET, UNALLOCATED_SHEET};
use crate::workflows::allocation::{AgentAllocation, AssignedContact, PriorSnapshot};
use crate::workflows::sheets::{normalize_phone, TabNames};
use calamine::{open_workbook, Data, Reader, Xlsx, XlsxError};
use std::path::Path;
use tracing::{debug, info};

/// Reads prior allocations from an Excel workbook with one tab per agent.
///
/// Every tab other than `Summary`, `Unallocated` and the input tabs is an
/// agent list with `Name` and `Phone Number` columns. Excel workbooks carry no
/// rotation state, so every pool resumes from its first agent.
pub fn load_prior_xlsx(path: &Path, tabs: &TabNames) -> Result<PriorSnapshot, WorkbookError> {
    let excel = |source: XlsxError| WorkbookError::Excel {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(excel)?;

    let mut agents = Vec::new();
    for sheet in workbook.sheet_names() {
        if sheet == SUMMARY_SHEET || sheet == UNALLOCATED_SHEET || tabs.is_input_tab(&sheet) {
            continue;
        }
        let range = workbook.worksheet_range(&sheet).map_err(excel)?;
        let contacts = read_agent_rows(range.rows());
        debug!(agent = %sheet, contacts = contacts.len(), "loaded prior agent tab");
        agents.push(AgentAllocation::new(sheet, contacts));
    }

    let prior = PriorSnapshot {
        agents,
        ..PriorSnapshot::default()
    };
    info!(
        path = %path.display(),
        agents = prior.agents.len(),
        allocated = prior.total_allocated(),
        "loaded prior allocations from Excel workbook"
    );
    Ok(prior)
}

fn read_agent_rows<'a>(mut rows: impl Iterator<Item = &'a [Data]>) -> Vec<AssignedContact> {
    let Some(header) = rows.next() else {
        return Vec::new();
    };
    let column = |label: &str| {
        header
            .iter()
            .position(|cell| cell.to_string().trim() == label)
    };
    let (Some(name_col), Some(phone_col)) = (column("Name"), column("Phone Number")) else {
        return Vec::new();
    };

    rows.filter_map(|row| {
        let name = row.get(name_col)?.to_string().trim().to_string();
        let phone = normalize_phone(&row.get(phone_col)?.to_string());
        (!name.is_empty() && !phone.is_empty()).then(|| AssignedContact::prior(name, phone))
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Data {
        Data::String(value.to_string())
    }

    #[test]
    fn agent_rows_need_name_and_phone() {
        let rows = vec![
            vec![text("Name"), text("Phone Number")],
            vec![text(" Meera "), Data::Float(9876543210.0)],
            vec![text("Kabir"), Data::Empty],
            vec![Data::Empty, text("9001")],
            vec![text("Ira"), text("9002")],
        ];

        let contacts = read_agent_rows(rows.iter().map(Vec::as_slice));

        let entries: Vec<_> = contacts
            .iter()
            .map(|contact| (contact.name.as_str(), contact.phone.as_str()))
            .collect();
        assert_eq!(entries, [("Meera", "9876543210"), ("Ira", "9002")]);
    }

    #[test]
    fn tab_without_expected_columns_has_no_contacts() {
        let rows = vec![vec![text("Metric"), text("Value")], vec![text("Total"), text("4")]];
        assert!(read_agent_rows(rows.iter().map(Vec::as_slice)).is_empty());
    }

    #[test]
    fn unreadable_workbook_is_reported() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("allocation_output.xlsx");
        std::fs::write(&path, "not a workbook").expect("write file");

        let err = load_prior_xlsx(&path, &TabNames::default()).expect_err("workbook rejected");
        assert!(matches!(err, WorkbookError::Excel { .. }));
    }
}

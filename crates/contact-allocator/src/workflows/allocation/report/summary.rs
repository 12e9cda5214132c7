use super::super::merge::ModeKind;
use super::super::snapshot::AllocationSnapshot;
use chrono::NaiveDateTime;

pub const SUMMARY_COLUMNS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub cells: [String; SUMMARY_COLUMNS],
}

impl SummaryRow {
    fn new(first: impl Into<String>, second: impl Into<String>, third: impl Into<String>) -> Self {
        Self {
            cells: [first.into(), second.into(), third.into()],
        }
    }

    fn heading(title: &str) -> Self {
        Self::new(title, "", "")
    }

    fn blank() -> Self {
        Self::new("", "", "")
    }

    fn metric(label: &str, value: usize) -> Self {
        Self::new(label, value.to_string(), "")
    }

    pub fn label(&self) -> &str {
        &self.cells[0]
    }
}

/// Three-column summary of a snapshot, laid out for a spreadsheet tab.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummarySheet {
    pub rows: Vec<SummaryRow>,
}

impl SummarySheet {
    pub fn build(snapshot: &AllocationSnapshot, generated_at: NaiveDateTime) -> Self {
        let stats = &snapshot.stats;
        let mut rows = vec![
            SummaryRow::heading("ALLOCATION SUMMARY"),
            SummaryRow::new(
                "Generated At",
                generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                "",
            ),
            SummaryRow::new("Mode", snapshot.mode.label(), ""),
            SummaryRow::blank(),
            SummaryRow::new("Metric", "Value", ""),
            SummaryRow::metric("Total Contacts", stats.total_input),
            SummaryRow::metric("Duplicates Removed", stats.duplicates_removed),
            SummaryRow::metric("Already Allocated (skipped)", stats.already_allocated),
            SummaryRow::metric("Contacts Considered", stats.considered),
            SummaryRow::metric("Successfully Allocated", stats.newly_allocated),
            SummaryRow::metric("Unallocated", stats.unallocated),
            SummaryRow::metric(
                "Total Agents",
                stats.agents.iter().filter(|tally| tally.active).count(),
            ),
        ];

        if snapshot.mode == ModeKind::Incremental {
            rows.extend([
                SummaryRow::blank(),
                SummaryRow::heading("CUMULATIVE TOTALS"),
                SummaryRow::metric("Previously Allocated", stats.previously_allocated),
                SummaryRow::metric("Newly Allocated", stats.newly_allocated),
                SummaryRow::metric("Total Allocated", stats.cumulative_allocated),
            ]);
        }

        rows.extend([
            SummaryRow::blank(),
            SummaryRow::heading("AGENT BREAKDOWN"),
            SummaryRow::new("Agent", "Center", "New / Total"),
        ]);
        for tally in &stats.agents {
            let center = if tally.active {
                tally.center.label().to_string()
            } else {
                format!("{} (inactive)", tally.center.label())
            };
            rows.push(SummaryRow::new(
                tally.agent.as_str(),
                center,
                format!("{} / {}", tally.new, tally.cumulative),
            ));
        }

        rows.extend([
            SummaryRow::blank(),
            SummaryRow::heading("PRIORITY DISTRIBUTION"),
            SummaryRow::new("Priority", "Allocated", "Unallocated"),
        ]);
        for tier in &stats.tiers {
            rows.push(SummaryRow::new(
                format!("Priority {}", tier.priority),
                tier.allocated.to_string(),
                tier.unallocated.to_string(),
            ));
        }

        Self { rows }
    }

    pub fn row(&self, label: &str) -> Option<&SummaryRow> {
        self.rows.iter().find(|row| row.label() == label)
    }
}

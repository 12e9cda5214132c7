mod summary;

pub use summary::{SummaryRow, SummarySheet, SUMMARY_COLUMNS};

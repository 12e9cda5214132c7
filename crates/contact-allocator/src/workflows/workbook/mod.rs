//! On-disk workbook: a directory holding the input tabs, a summary, one sheet
//! per agent, the unallocated contacts and `rotation.json`, which records the
//! sheets the workbook owns alongside the rotation state.

mod loader;
mod manifest;
mod writer;
mod xlsx;

pub use loader::load_prior;
pub use manifest::{agent_sheet_name, AgentSheet, WorkbookManifest};
pub use writer::write_workbook;
pub use xlsx::load_prior_xlsx;

use std::path::{Path, PathBuf};

pub const SUMMARY_SHEET: &str = "Summary";
pub const UNALLOCATED_SHEET: &str = "Unallocated";
pub const ROTATION_FILE: &str = "rotation.json";

#[derive(Debug, thiserror::Error)]
pub enum WorkbookError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid sheet {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("invalid rotation state in {}: {source}", .path.display())]
    Rotation {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("sheet {} for agent '{agent}' is missing from the workbook", .path.display())]
    MissingSheet { agent: String, path: PathBuf },
    #[error("failed to read Excel workbook {}: {source}", .path.display())]
    Excel {
        path: PathBuf,
        #[source]
        source: calamine::XlsxError,
    },
}

impl WorkbookError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn sheet_path(dir: &Path, sheet: &str) -> PathBuf {
    dir.join(format!("{sheet}.csv"))
}

//! Loads the three input tabs (contacts, agents, source priorities) from a
//! directory of CSV files or from a shared Google Sheet.

mod normalizer;
mod parser;
mod remote;

pub use normalizer::normalize_phone;
pub use remote::{export_url, spreadsheet_id, GoogleSheetClient};

use crate::workflows::allocation::InputTables;
use serde::{Deserialize, Serialize};
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_CONTACTS_TAB: &str = "All Contacts";
pub const DEFAULT_AGENTS_TAB: &str = "Agents";
pub const DEFAULT_PRIORITIES_TAB: &str = "Source Priorities";

#[derive(Debug, thiserror::Error)]
pub enum SheetImportError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid CSV data in '{tab}' tab: {source}")]
    Csv {
        tab: String,
        #[source]
        source: csv::Error,
    },
    #[error("failed to fetch '{tab}' tab: {source}")]
    Http {
        tab: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to set up the HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("fetching '{tab}' tab returned HTTP status {status}")]
    HttpStatus { tab: String, status: u16 },
    #[error("not a Google Sheets URL or spreadsheet id: '{0}'")]
    InvalidSheetUrl(String),
    #[error("no {0} data found")]
    EmptyTab(&'static str),
}

/// Names of the input tabs, used both for reading and for re-emitting them
/// into the workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabNames {
    pub contacts: String,
    pub agents: String,
    pub priorities: String,
}

impl Default for TabNames {
    fn default() -> Self {
        Self {
            contacts: DEFAULT_CONTACTS_TAB.to_string(),
            agents: DEFAULT_AGENTS_TAB.to_string(),
            priorities: DEFAULT_PRIORITIES_TAB.to_string(),
        }
    }
}

impl TabNames {
    pub fn is_input_tab(&self, name: &str) -> bool {
        name == self.contacts || name == self.agents || name == self.priorities
    }
}

pub struct SheetImporter {
    tabs: TabNames,
}

impl SheetImporter {
    pub fn new(tabs: TabNames) -> Self {
        Self { tabs }
    }

    pub fn tabs(&self) -> &TabNames {
        &self.tabs
    }

    /// Reads `<dir>/<tab>.csv` for each tab. A missing priorities file is
    /// treated like an empty tab.
    pub fn from_dir<P: AsRef<Path>>(&self, dir: P) -> Result<InputTables, SheetImportError> {
        let dir = dir.as_ref();
        let contacts = open_tab(dir, &self.tabs.contacts)?;
        let agents = open_tab(dir, &self.tabs.agents)?;

        let priorities_path = tab_path(dir, &self.tabs.priorities);
        let priorities: Box<dyn Read> = match std::fs::File::open(&priorities_path) {
            Ok(file) => Box::new(file),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(path = %priorities_path.display(), "priorities file not found");
                Box::new(io::empty())
            }
            Err(source) => {
                return Err(SheetImportError::Io {
                    path: priorities_path,
                    source,
                })
            }
        };

        self.from_readers(contacts, agents, priorities)
    }

    /// Fetches every tab of a shared spreadsheet, given its URL or id.
    pub async fn from_google_sheet(&self, sheet: &str) -> Result<InputTables, SheetImportError> {
        let client = GoogleSheetClient::new(sheet)?;
        self.from_sheet_client(&client).await
    }

    pub async fn from_sheet_client(
        &self,
        client: &GoogleSheetClient,
    ) -> Result<InputTables, SheetImportError> {
        info!(spreadsheet = client.spreadsheet_id(), "loading tabs from Google Sheet");

        let contacts = client.fetch_tab(&self.tabs.contacts).await?;
        let agents = client.fetch_tab(&self.tabs.agents).await?;
        let priorities = client.fetch_tab(&self.tabs.priorities).await?;

        self.from_readers(
            Cursor::new(contacts),
            Cursor::new(agents),
            Cursor::new(priorities),
        )
    }

    pub fn from_readers<C: Read, A: Read, P: Read>(
        &self,
        contacts: C,
        agents: A,
        priorities: P,
    ) -> Result<InputTables, SheetImportError> {
        let contacts = parser::parse_contacts(contacts)
            .map_err(|source| csv_error(&self.tabs.contacts, source))?;
        if contacts.is_empty() {
            return Err(SheetImportError::EmptyTab("contacts"));
        }
        info!(tab = %self.tabs.contacts, count = contacts.len(), "loaded contacts");

        let agents = parser::parse_agents(agents)
            .map_err(|source| csv_error(&self.tabs.agents, source))?;
        if agents.is_empty() {
            return Err(SheetImportError::EmptyTab("agents"));
        }
        info!(tab = %self.tabs.agents, count = agents.len(), "loaded agents");

        let priorities = parser::parse_priorities(priorities)
            .map_err(|source| csv_error(&self.tabs.priorities, source))?;
        if priorities.is_empty() {
            warn!(
                tab = %self.tabs.priorities,
                "no priorities data found, every contact gets the default priority"
            );
        } else {
            info!(tab = %self.tabs.priorities, count = priorities.len(), "loaded priorities");
        }

        Ok(InputTables {
            contacts,
            agents,
            priorities,
        })
    }
}

impl Default for SheetImporter {
    fn default() -> Self {
        Self::new(TabNames::default())
    }
}

pub(crate) fn tab_path(dir: &Path, tab: &str) -> PathBuf {
    dir.join(format!("{tab}.csv"))
}

fn csv_error(tab: &str, source: csv::Error) -> SheetImportError {
    SheetImportError::Csv {
        tab: tab.to_string(),
        source,
    }
}

fn open_tab(dir: &Path, tab: &str) -> Result<std::fs::File, SheetImportError> {
    let path = tab_path(dir, tab);
    std::fs::File::open(&path).map_err(|source| SheetImportError::Io { path, source })
}

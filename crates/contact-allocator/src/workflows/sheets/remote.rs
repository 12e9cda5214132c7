use super::SheetImportError;
use std::time::Duration;
use tracing::debug;

const SPREADSHEETS_PATH: &str = "/spreadsheets/d/";
const EXPORT_BASE: &str = "https://docs.google.com/spreadsheets/d";

/// Extracts the spreadsheet id from a share URL, or accepts a bare id.
pub fn spreadsheet_id(sheet: &str) -> Result<String, SheetImportError> {
    let sheet = sheet.trim();
    let invalid = || SheetImportError::InvalidSheetUrl(sheet.to_string());

    if !sheet.contains('/') {
        return if is_id(sheet) {
            Ok(sheet.to_string())
        } else {
            Err(invalid())
        };
    }

    let without_scheme = sheet
        .strip_prefix("https://")
        .or_else(|| sheet.strip_prefix("http://"))
        .unwrap_or(sheet);
    if !without_scheme.starts_with("docs.google.com/") {
        return Err(invalid());
    }

    let (_, rest) = without_scheme
        .split_once(SPREADSHEETS_PATH)
        .ok_or_else(invalid)?;
    let id = rest
        .split(['/', '?', '#'])
        .next()
        .filter(|id| is_id(id))
        .ok_or_else(invalid)?;
    Ok(id.to_string())
}

/// CSV export endpoint for one tab of a spreadsheet.
pub fn export_url(spreadsheet_id: &str, tab: &str) -> String {
    export_url_with_base(EXPORT_BASE, spreadsheet_id, tab)
}

fn export_url_with_base(base: &str, spreadsheet_id: &str, tab: &str) -> String {
    format!(
        "{}/{spreadsheet_id}/gviz/tq?tqx=out:csv&sheet={}",
        base.trim_end_matches('/'),
        urlencoding::encode(tab)
    )
}

fn is_id(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

/// Fetches tabs of a shared spreadsheet as CSV text.
#[derive(Debug, Clone)]
pub struct GoogleSheetClient {
    client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
}

impl GoogleSheetClient {
    pub fn new(sheet: &str) -> Result<Self, SheetImportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("contact-allocator/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SheetImportError::Client)?;

        Ok(Self {
            client,
            base_url: EXPORT_BASE.to_string(),
            spreadsheet_id: spreadsheet_id(sheet)?,
        })
    }

    /// Points the client at another host serving the same export path.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub async fn fetch_tab(&self, tab: &str) -> Result<String, SheetImportError> {
        let url = export_url_with_base(&self.base_url, &self.spreadsheet_id, tab);
        let http_error = |source| SheetImportError::Http {
            tab: tab.to_string(),
            source,
        };

        debug!(tab, url = %url, "fetching sheet tab");
        let response = self.client.get(&url).send().await.map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SheetImportError::HttpStatus {
                tab: tab.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(http_error)
    }
}

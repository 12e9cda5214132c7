/// Trims a phone cell and drops the `.0` suffix spreadsheets add when a
/// number column is exported as floats.
pub fn normalize_phone(value: &str) -> String {
    let trimmed = value.trim();
    trimmed.strip_suffix(".0").unwrap_or(trimmed).to_string()
}

pub(crate) fn normalize_cell(value: &str) -> String {
    value.replace(['\u{feff}', '\u{200b}'], "").trim().to_string()
}

use axum::http::{StatusCode, Uri};
use axum::routing::get;
use axum::Router;
use contact_allocator::workflows::allocation::Center;
use contact_allocator::workflows::sheets::{
    GoogleSheetClient, SheetImportError, SheetImporter, TabNames,
};
use std::fs;
use std::path::Path;

const CONTACTS_CSV: &str = "Name,Phone Number,Center,Source of Interest\n\
Meera Shah,9820011111.0,Mumbai,Workshop\n\
Kabir Rao,9820022222,Delhi,Website\n\
,9820033333,Delhi,Website\n";
const AGENTS_CSV: &str = "Name,Center\nAsha,Mumbai\nDev,Delhi\n";
const PRIORITIES_CSV: &str = "Source of Interest,Priority\nWorkshop,1\nWebsite,2\n";

fn write_tab(dir: &Path, tab: &str, body: &str) {
    fs::write(dir.join(format!("{tab}.csv")), body).expect("write tab");
}

#[test]
fn directory_source_reads_every_tab() {
    let temp = tempfile::tempdir().expect("temp dir");
    write_tab(temp.path(), "All Contacts", CONTACTS_CSV);
    write_tab(temp.path(), "Agents", AGENTS_CSV);
    write_tab(temp.path(), "Source Priorities", PRIORITIES_CSV);

    let tables = SheetImporter::default()
        .from_dir(temp.path())
        .expect("tables load");

    assert_eq!(tables.contacts.len(), 2);
    assert_eq!(tables.contacts[0].phone, "9820011111");
    assert_eq!(tables.agents[1].center, Center::new("Delhi"));
    assert_eq!(tables.priorities.get("Website"), Some(2));
}

#[test]
fn directory_source_honours_custom_tab_names() {
    let temp = tempfile::tempdir().expect("temp dir");
    write_tab(temp.path(), "Leads", CONTACTS_CSV);
    write_tab(temp.path(), "Spamurais", AGENTS_CSV);

    let tabs = TabNames {
        contacts: "Leads".into(),
        agents: "Spamurais".into(),
        priorities: "Ranks".into(),
    };
    let tables = SheetImporter::new(tabs)
        .from_dir(temp.path())
        .expect("missing priorities file is tolerated");

    assert_eq!(tables.agents.len(), 2);
    assert!(tables.priorities.is_empty());
}

#[test]
fn missing_contacts_file_is_an_io_error() {
    let temp = tempfile::tempdir().expect("temp dir");
    write_tab(temp.path(), "Agents", AGENTS_CSV);

    let err = SheetImporter::default()
        .from_dir(temp.path())
        .expect_err("contacts missing");

    assert!(matches!(err, SheetImportError::Io { .. }));
    assert!(err.to_string().contains("All Contacts.csv"));
}

async fn export_tab(uri: Uri) -> (StatusCode, String) {
    let query = uri.query().unwrap_or_default();
    if !query.contains("tqx=out:csv") {
        return (StatusCode::BAD_REQUEST, String::new());
    }
    match query.split("sheet=").nth(1) {
        Some("All%20Contacts") => (StatusCode::OK, CONTACTS_CSV.to_string()),
        Some("Agents") => (StatusCode::OK, AGENTS_CSV.to_string()),
        Some("Source%20Priorities") => (StatusCode::OK, PRIORITIES_CSV.to_string()),
        _ => (StatusCode::NOT_FOUND, String::new()),
    }
}

async fn spawn_sheet_server() -> String {
    let app = Router::new().route("/:id/gviz/tq", get(export_tab));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server runs");
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn google_sheet_tabs_are_fetched_as_csv() {
    let base = spawn_sheet_server().await;
    let client = GoogleSheetClient::new("https://docs.google.com/spreadsheets/d/sheet123/edit")
        .expect("valid sheet url")
        .with_base_url(base);

    let tables = SheetImporter::default()
        .from_sheet_client(&client)
        .await
        .expect("tables fetched");

    assert_eq!(client.spreadsheet_id(), "sheet123");
    assert_eq!(tables.contacts.len(), 2);
    assert_eq!(tables.priorities.get("Workshop"), Some(1));
}

#[tokio::test]
async fn unknown_tab_surfaces_http_status() {
    let base = spawn_sheet_server().await;
    let client = GoogleSheetClient::new("sheet123")
        .expect("bare id")
        .with_base_url(base);
    let tabs = TabNames {
        agents: "Missing".into(),
        ..TabNames::default()
    };

    let err = SheetImporter::new(tabs)
        .from_sheet_client(&client)
        .await
        .expect_err("missing tab");

    assert!(matches!(
        err,
        SheetImportError::HttpStatus { status: 404, .. }
    ));
}

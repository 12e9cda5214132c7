use chrono::Local;
use clap::{ArgGroup, Args, ValueEnum};
use contact_allocator::config::{parse_limit, AllocationConfig, AppConfig, ConfigFile};
use contact_allocator::error::AppError;
use contact_allocator::telemetry;
use contact_allocator::workflows::allocation::{
    AllocationEngine, AllocationSnapshot, InputTables, PriorSnapshot, RunMode,
};
use contact_allocator::workflows::sheets::SheetImporter;
use contact_allocator::workflows::sheets::TabNames;
use contact_allocator::workflows::workbook::{load_prior, load_prior_xlsx, write_workbook};
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use std::fmt::Write as _;
use std::io::{self, IsTerminal};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const LISTED_UNALLOCATED: usize = 10;

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["sheet_url", "input_dir"])
))]
pub(crate) struct AllocateArgs {
    /// Google Sheet URL or spreadsheet id to read the input tabs from
    #[arg(long)]
    pub(crate) sheet_url: Option<String>,
    /// Directory holding one `<tab>.csv` file per input tab
    #[arg(long)]
    pub(crate) input_dir: Option<PathBuf>,
    /// Workbook directory of CSV sheets to write (and to read prior allocations from)
    #[arg(long, short)]
    pub(crate) output: Option<PathBuf>,
    /// Read prior allocations from this workbook directory or `.xlsx` file instead of the output
    #[arg(long)]
    pub(crate) prior: Option<PathBuf>,
    /// JSON file with tab names, limit and output overrides
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    #[arg(long)]
    pub(crate) contacts_tab: Option<String>,
    #[arg(long)]
    pub(crate) agents_tab: Option<String>,
    #[arg(long)]
    pub(crate) priorities_tab: Option<String>,
    /// Maximum new contacts per agent in this run
    #[arg(long, value_parser = parse_max_per_agent)]
    pub(crate) max_per_agent: Option<NonZeroUsize>,
    #[arg(long, value_enum, default_value_t = ModeArg::Auto)]
    pub(crate) mode: ModeArg,
    /// Validate and preview without writing the workbook
    #[arg(long)]
    pub(crate) dry_run: bool,
    /// Enable debug logging
    #[arg(long, short)]
    pub(crate) verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ModeArg {
    /// Ask when a prior workbook exists, otherwise start fresh
    Auto,
    Fresh,
    Incremental,
}

fn parse_max_per_agent(raw: &str) -> Result<NonZeroUsize, String> {
    parse_limit(raw).map_err(|err| err.to_string())
}

pub(crate) async fn run_allocation(args: AllocateArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    config.telemetry.verbose = args.verbose;
    telemetry::init(&config.telemetry)?;

    let allocation = resolve_allocation_config(config.allocation, &args)?;
    let importer = SheetImporter::new(allocation.tabs.clone());
    let tables = match (&args.sheet_url, &args.input_dir) {
        (Some(sheet), None) => importer.from_google_sheet(sheet).await?,
        (None, Some(dir)) => importer.from_dir(dir)?,
        _ => {
            return Err(AppError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "pass exactly one of --sheet-url or --input-dir",
            )))
        }
    };

    let prior_source = args.prior.as_deref().unwrap_or(&allocation.output);
    let prior = read_prior(prior_source, &allocation.tabs)?.filter(|prior| !prior.is_empty());
    let interactive = io::stdin().is_terminal();
    let mode = resolve_mode(args.mode, prior, interactive, prompt_for_incremental)?;

    let snapshot = AllocationEngine::new(allocation.settings()).run(&tables, mode)?;
    println!("{}", render_summary(&snapshot));

    if args.dry_run {
        println!(
            "Dry run: workbook not written (would write to {})",
            allocation.output.display()
        );
        return Ok(());
    }

    write_run(&allocation, &tables, &snapshot)?;
    println!("Workbook written to {}", allocation.output.display());
    Ok(())
}

/// Layers the optional config file and then the command line flags over the
/// environment-derived settings.
fn resolve_allocation_config(
    mut allocation: AllocationConfig,
    args: &AllocateArgs,
) -> Result<AllocationConfig, AppError> {
    if let Some(path) = &args.config {
        allocation.merge_file(ConfigFile::from_path(path)?)?;
        info!(path = %path.display(), "applied config file");
    }

    if let Some(tab) = &args.contacts_tab {
        allocation.tabs.contacts = tab.clone();
    }
    if let Some(tab) = &args.agents_tab {
        allocation.tabs.agents = tab.clone();
    }
    if let Some(tab) = &args.priorities_tab {
        allocation.tabs.priorities = tab.clone();
    }
    if let Some(limit) = args.max_per_agent {
        allocation.max_per_agent = Some(limit);
    }
    if let Some(output) = &args.output {
        allocation.output = output.clone();
    }

    if is_excel(&allocation.output) {
        return Err(AppError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "output {} names an Excel file; the workbook is written as a directory of CSV sheets \
                 (pass an existing .xlsx with --prior to continue from it)",
                allocation.output.display()
            ),
        )));
    }

    Ok(allocation)
}

fn is_excel(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"))
}

/// Loads prior allocations from a workbook directory or an Excel file.
fn read_prior(path: &Path, tabs: &TabNames) -> Result<Option<PriorSnapshot>, AppError> {
    if is_excel(path) {
        return Ok(Some(load_prior_xlsx(path, tabs)?));
    }
    Ok(load_prior(path, tabs)?)
}

fn resolve_mode<F>(
    requested: ModeArg,
    prior: Option<PriorSnapshot>,
    interactive: bool,
    ask: F,
) -> Result<RunMode, AppError>
where
    F: FnOnce(&PriorSnapshot) -> Result<bool, AppError>,
{
    match (requested, prior) {
        (ModeArg::Fresh, Some(prior)) => {
            warn!(
                existing = prior.total_allocated(),
                "fresh mode replaces existing allocations"
            );
            Ok(RunMode::Fresh)
        }
        (ModeArg::Fresh, None) | (ModeArg::Auto, None) => Ok(RunMode::Fresh),
        (ModeArg::Incremental, None) => {
            warn!("no prior allocations found, running in fresh mode");
            Ok(RunMode::Fresh)
        }
        (ModeArg::Incremental, Some(prior)) => Ok(RunMode::Incremental(prior)),
        (ModeArg::Auto, Some(prior)) => {
            if !interactive || ask(&prior)? {
                Ok(RunMode::Incremental(prior))
            } else {
                Ok(RunMode::Fresh)
            }
        }
    }
}

fn prompt_for_incremental(prior: &PriorSnapshot) -> Result<bool, AppError> {
    let active = prior
        .agents
        .iter()
        .filter(|agent| !agent.contacts.is_empty())
        .count();
    let choices = [
        "Incremental: keep existing allocations and add new contacts",
        "Fresh: discard existing allocations and start over",
    ];
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(format!(
            "Found {} existing allocations across {} agents",
            prior.total_allocated(),
            active
        ))
        .items(&choices)
        .default(0)
        .interact()
        .map_err(|err| AppError::Io(io::Error::other(err)))?;
    Ok(selection == 0)
}

fn write_run(
    allocation: &AllocationConfig,
    tables: &InputTables,
    snapshot: &AllocationSnapshot,
) -> Result<(), AppError> {
    let generated_at = Local::now().naive_local();
    write_workbook(
        &allocation.output,
        &allocation.tabs,
        tables,
        snapshot,
        generated_at,
    )?;
    Ok(())
}

fn render_summary(snapshot: &AllocationSnapshot) -> String {
    let stats = &snapshot.stats;
    let mut out = String::new();

    let _ = writeln!(out, "Allocation summary ({} mode)", snapshot.mode.label());
    let _ = writeln!(
        out,
        "- {} contacts | {} duplicates removed | {} already allocated | {} considered",
        stats.total_input, stats.duplicates_removed, stats.already_allocated, stats.considered
    );
    let _ = writeln!(
        out,
        "- {} allocated | {} unallocated",
        stats.newly_allocated, stats.unallocated
    );
    if stats.previously_allocated > 0 {
        let _ = writeln!(
            out,
            "- cumulative: {} previously + {} new = {} total",
            stats.previously_allocated, stats.newly_allocated, stats.cumulative_allocated
        );
    }

    let _ = writeln!(out, "Agents:");
    for tally in &stats.agents {
        let status = if tally.active { "" } else { " (inactive)" };
        let _ = writeln!(
            out,
            "  - {} [{}]{}: {} new / {} total",
            tally.agent,
            tally.center.label(),
            status,
            tally.new,
            tally.cumulative
        );
    }

    if !stats.tiers.is_empty() {
        let _ = writeln!(out, "Priorities:");
        for tier in &stats.tiers {
            let _ = writeln!(
                out,
                "  - Priority {}: {} allocated, {} unallocated",
                tier.priority, tier.allocated, tier.unallocated
            );
        }
    }

    if !snapshot.unallocated.is_empty() {
        let _ = writeln!(out, "Unallocated:");
        for item in snapshot.unallocated.iter().take(LISTED_UNALLOCATED) {
            let _ = writeln!(
                out,
                "  - {} ({}): {}",
                item.contact.name, item.contact.phone, item.reason
            );
        }
        if snapshot.unallocated.len() > LISTED_UNALLOCATED {
            let _ = writeln!(
                out,
                "  ... and {} more",
                snapshot.unallocated.len() - LISTED_UNALLOCATED
            );
        }
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use contact_allocator::workflows::allocation::{
        Agent, AgentAllocation, AllocationSettings, AssignedContact, Contact, ModeKind,
        PriorityMap,
    };

    fn prior() -> PriorSnapshot {
        PriorSnapshot {
            agents: vec![AgentAllocation::new(
                "Asha",
                vec![AssignedContact::prior("Meera", "9001")],
            )],
            ..PriorSnapshot::default()
        }
    }

    fn never_asked(_: &PriorSnapshot) -> Result<bool, AppError> {
        panic!("prompt should not be shown");
    }

    fn args() -> AllocateArgs {
        AllocateArgs {
            sheet_url: None,
            input_dir: Some(PathBuf::from("inputs")),
            output: None,
            prior: None,
            config: None,
            contacts_tab: None,
            agents_tab: None,
            priorities_tab: None,
            max_per_agent: None,
            mode: ModeArg::Auto,
            dry_run: false,
            verbose: false,
        }
    }

    #[test]
    fn auto_without_prior_runs_fresh() {
        let mode = resolve_mode(ModeArg::Auto, None, true, never_asked).expect("mode");
        assert_eq!(mode.kind(), ModeKind::Fresh);
    }

    #[test]
    fn auto_non_interactive_continues_incrementally() {
        let mode = resolve_mode(ModeArg::Auto, Some(prior()), false, never_asked).expect("mode");
        assert_eq!(mode.kind(), ModeKind::Incremental);
    }

    #[test]
    fn auto_interactive_follows_the_answer() {
        let mode = resolve_mode(ModeArg::Auto, Some(prior()), true, |_| Ok(false)).expect("mode");
        assert_eq!(mode.kind(), ModeKind::Fresh);
    }

    #[test]
    fn incremental_without_prior_falls_back_to_fresh() {
        let mode = resolve_mode(ModeArg::Incremental, None, true, never_asked).expect("mode");
        assert_eq!(mode.kind(), ModeKind::Fresh);
    }

    #[test]
    fn explicit_fresh_ignores_prior() {
        let mode = resolve_mode(ModeArg::Fresh, Some(prior()), true, never_asked).expect("mode");
        assert_eq!(mode, RunMode::Fresh);
    }

    #[test]
    fn excel_output_is_rejected() {
        let mut args = args();
        args.output = Some(PathBuf::from("allocation_output.xlsx"));

        let err = resolve_allocation_config(AllocationConfig::default(), &args)
            .expect_err("excel output rejected");
        assert!(err.to_string().contains("--prior"));
    }

    #[test]
    fn excel_prior_is_read_as_a_workbook_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let file = dir.path().join("allocation_output.xlsx");
        std::fs::write(&file, "not a workbook").expect("write file");

        let err = read_prior(&file, &TabNames::default()).expect_err("excel reader used");
        assert!(matches!(err, AppError::Workbook(_)));

        let missing = read_prior(&dir.path().join("absent"), &TabNames::default())
            .expect("directory lookup");
        assert!(missing.is_none());
    }

    #[test]
    fn command_line_overrides_config_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let file = dir.path().join("allocator.json");
        std::fs::write(
            &file,
            r#"{"agents_tab": "Spamurais", "max_allocations_per_agent": 20, "output": "from-file"}"#,
        )
        .expect("write config");

        let mut args = args();
        args.config = Some(file);
        args.max_per_agent = NonZeroUsize::new(5);

        let resolved =
            resolve_allocation_config(AllocationConfig::default(), &args).expect("config resolves");

        assert_eq!(resolved.tabs.agents, "Spamurais");
        assert_eq!(resolved.max_per_agent, NonZeroUsize::new(5));
        assert_eq!(resolved.output, PathBuf::from("from-file"));
    }

    #[test]
    fn summary_lists_agents_and_unallocated_contacts() {
        let tables = InputTables {
            contacts: vec![
                Contact::new("Meera", "9001").with_source("Website"),
                Contact::new("Kabir", "9002").with_source("Website"),
            ],
            agents: vec![Agent::new("Asha")],
            priorities: [("Website", 1)].into_iter().collect::<PriorityMap>(),
        };
        let snapshot = AllocationEngine::new(AllocationSettings {
            max_per_agent: NonZeroUsize::new(1),
        })
        .run(&tables, RunMode::Fresh)
        .expect("run");

        let rendered = render_summary(&snapshot);

        assert!(rendered.starts_with("Allocation summary (Fresh mode)"));
        assert!(rendered.contains("  - Asha [Any]: 1 new / 1 total"));
        assert!(rendered.contains("  - Kabir (9002): all eligible agents"));
    }
}

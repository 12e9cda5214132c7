use crate::allocate::{run_allocation, AllocateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use contact_allocator::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "contact-allocator",
    about = "Distribute contacts across agents by center and source priority",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Allocate contacts from a Google Sheet or a directory of CSV tabs
    Allocate(AllocateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Allocate(args) => run_allocation(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn allocate_requires_exactly_one_source() {
        let both = Cli::try_parse_from([
            "contact-allocator",
            "allocate",
            "--sheet-url",
            "abc",
            "--input-dir",
            "inputs",
        ]);
        assert!(both.is_err());

        let neither = Cli::try_parse_from(["contact-allocator", "allocate"]);
        assert!(neither.is_err());
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["contact-allocator"]).expect("parses");
        assert!(cli.command.is_none());
    }
}

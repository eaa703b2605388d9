use crate::demo::{run_demo, run_evaluate, run_limits, DemoArgs, EvaluateArgs, LimitsArgs};
use crate::server;
use belize_grants::error::AppError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Belize Fund Grants Portal",
    about = "Run the grants portal service or check award eligibility from the command line",
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
    /// Inspect award-category limits and check budget figures
    Awards {
        #[command(subcommand)]
        command: AwardsCommand,
    },
    /// Walk a sample GAP proposal through the wizard against an in-memory backend
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum AwardsCommand {
    /// Print the limits table, or one category's limits
    Limits(LimitsArgs),
    /// Evaluate requested and co-financing amounts against a category
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// JSON applicant profile served to the prefill endpoints
    #[arg(long, value_name = "PATH")]
    pub(crate) profile: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Awards {
            command: AwardsCommand::Limits(args),
        } => run_limits(args),
        Command::Awards {
            command: AwardsCommand::Evaluate(args),
        } => run_evaluate(args),
        Command::Demo(args) => run_demo(args).await,
    }
}

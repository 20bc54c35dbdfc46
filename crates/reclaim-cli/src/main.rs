use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::Context;
use commands::{auth, clear, run};
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "reclaim")]
#[command(about = "Reclaim - delete library files of episodes you have already watched on Trakt")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// TOML config file; environment variables take precedence over its values
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write logs to a daily-rotated file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete library files of recently watched episodes (default)
    #[command(long_about = "Read the Trakt watch history of the trailing window and delete the Sonarr episode file of every watched episode that still has one. Starts device authorization first when no token is cached, unless --non-interactive is given.")]
    Run(RunArgs),
    /// Authorize with Trakt and cache the token
    #[command(long_about = "Run the Trakt device authorization flow and store the token, without touching the library. Use this to bootstrap deployments that run with --non-interactive.")]
    Auth {
        /// Discard the cached token and authorize again
        #[arg(long, action = ArgAction::SetTrue, conflicts_with = "refresh")]
        reset: bool,

        /// Exchange the cached refresh token for a new token
        #[arg(long, action = ArgAction::SetTrue)]
        refresh: bool,
    },
    /// Remove the cached Trakt token
    Clear,
}

#[derive(clap::Args, Default)]
struct RunArgs {
    /// Size of the trailing history window in days
    #[arg(long, value_name = "DAYS")]
    days: Option<u32>,

    /// Look everything up but do not delete any file
    #[arg(long, action = ArgAction::SetTrue)]
    dry_run: bool,

    /// Fail instead of starting device authorization when no token is cached
    #[arg(long, action = ArgAction::SetTrue)]
    non_interactive: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    logging::init_logging_with_file(cli.verbose, cli.quiet, cli.log_file.clone())
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("Failed to start async runtime")?;

    let config = cli.config.as_deref();
    runtime.block_on(async {
        match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
            Commands::Run(args) => {
                run::run_reclaim(config, args.days, args.dry_run, args.non_interactive, &output).await
            }
            Commands::Auth { reset, refresh } => auth::run_auth(config, reset, refresh, &output).await,
            Commands::Clear => clear::run_clear(config, &output),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["reclaim", "-v"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn test_run_flags() {
        let cli = Cli::try_parse_from(["reclaim", "run", "--days", "3", "--dry-run", "--output", "json"]).unwrap();
        assert_eq!(cli.output, output::OutputFormat::Json);
        match cli.command {
            Some(Commands::Run(args)) => {
                assert_eq!(args.days, Some(3));
                assert!(args.dry_run);
                assert!(!args.non_interactive);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_auth_reset_conflicts_with_refresh() {
        assert!(Cli::try_parse_from(["reclaim", "auth", "--reset", "--refresh"]).is_err());
    }
}

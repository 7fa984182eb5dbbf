//! Alarm aggregator binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use alarm_aggregator::AlarmAggregator;
use alarm_aggregator::cloudwatch::CloudWatchBackend;
use alarm_aggregator_cli::cli::{Cli, Commands, LogFormat};
use alarm_aggregator_cli::commands::{CheckCommand, HandleCommand, ValidateCommand};
use alarm_aggregator_cli::output::OutputFormat;

const DEFAULT_FILTER: &str = "alarm_aggregator=info,alarm_aggregator_cli=info";

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    init_tracing(cli.log_format);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), alarm_aggregator_cli::CliError> {
    let format = OutputFormat::new(cli.format);
    let rule = cli.rule.resolve()?;
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Validate => {
            ValidateCommand::new(&rule).execute(&mut stdout, &format)?;
        }
        Commands::Handle(args) => {
            let backend = CloudWatchBackend::from_env(cli.region);
            let cmd = HandleCommand::new(AlarmAggregator::new(rule, backend));
            cmd.execute(&mut stdout, &format, &args).await?;
        }
        Commands::Check => {
            let backend = CloudWatchBackend::from_env(cli.region);
            let cmd = CheckCommand::new(AlarmAggregator::new(rule, backend));
            cmd.execute(&mut stdout, &format).await?;
        }
    }

    Ok(())
}

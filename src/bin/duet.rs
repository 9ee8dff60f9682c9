use {
    clap::{Parser, Subcommand},
    std::process::ExitCode,
    duet::{Duet, config::DuetConfig, error::DuetError, metrics::handler::render},
    tracing::{error, info, warn},
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Start from the configured fixtures instead of the saved state.
    #[arg(long)]
    reset: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Run every configured session concurrently and commit them together.
    Scenario,
    /// Issue random transfers from concurrent workers.
    Load,
    /// Print the saved balances.
    Balances,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match DuetConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load config file: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = duet::logging::init_logging(config.debug, &config.log_dir) {
        eprintln!("Error: failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Duet failed to run: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: DuetConfig) -> Result<(), DuetError> {
    let mut app = Duet::new(config)?;
    app.prepare(cli.reset).await?;

    match cli.command.unwrap_or(Command::Scenario) {
        Command::Scenario => {
            let report = app.run_scenario().await?;
            for outcome in &report.outcomes {
                let request = &outcome.request;
                match &outcome.result {
                    Ok(result) => info!(
                        "Session {}: {} {} from {} to {} committed ({} -> {}, {} -> {})",
                        outcome.index,
                        request.amount,
                        request.field,
                        request.from,
                        request.to,
                        request.from,
                        result.from.get(&request.field),
                        request.to,
                        result.to.get(&request.field),
                    ),
                    Err(e) => warn!(
                        "Session {}: {} {} from {} to {} rejected: {}",
                        outcome.index, request.amount, request.field, request.from, request.to, e
                    ),
                }
            }
            info!(
                "{} committed, {} write conflicts",
                report.committed(),
                report.conflicted()
            );
        }
        Command::Load => {
            let report = app.run_load().await?;
            info!(
                "{} transfers: {} committed, {} conflicts, {} insufficient funds",
                report.attempted(),
                report.committed,
                report.conflicts,
                report.insufficient_funds
            );
        }
        Command::Balances => {}
    }

    for account in app.accounts().await? {
        let fields = account
            .fields
            .iter()
            .map(|(field, value)| format!("{field}={value}"))
            .collect::<Vec<_>>()
            .join(" ");
        info!("{}: {}", account.name, fields);
    }

    match render() {
        Ok(text) => tracing::debug!("Metrics:\n{}", text),
        Err(e) => warn!("Failed to render metrics: {}", e),
    }

    app.save().await
}

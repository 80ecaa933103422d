use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use formpilot::{ChromeLauncher, Config, JsonDataSource, Scenario, ScenarioRunner, TracingReporter};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "formpilot")]
#[command(about = "Drives the grant application form end to end")]
struct Cli {
    /// Default log level when RUST_LOG is unset
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one or more scenarios, each in a fresh browser session
    Run(RunArgs),
    /// List the available scenarios
    List,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Scenarios to run; all of them when omitted
    #[arg(value_enum)]
    scenarios: Vec<Scenario>,

    /// JSON configuration file; built-in defaults otherwise
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// JSON test data file (datasets and settings)
    #[arg(long, short = 'd')]
    data: PathBuf,

    /// Force a headless browser regardless of the configuration
    #[arg(long)]
    headless: bool,

    /// Directory for failure screenshots
    #[arg(long)]
    artifacts: Option<PathBuf>,

    /// Print the reports as JSON
    #[arg(long)]
    json: bool,
}

fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(args: &RunArgs) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };
    if args.headless {
        config.browser.headless = true;
    }
    if let Some(dir) = &args.artifacts {
        config.app.artifacts_dir = dir.clone();
    }
    Ok(config)
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let data = JsonDataSource::from_file(&args.data)
        .with_context(|| format!("loading test data from {}", args.data.display()))?;
    let scenarios = if args.scenarios.is_empty() {
        Scenario::ALL.to_vec()
    } else {
        args.scenarios.clone()
    };

    let runner = ScenarioRunner::new(
        Arc::new(ChromeLauncher::new()),
        config,
        Arc::new(data),
        Arc::new(TracingReporter::new("formpilot")),
    );
    let reports = runner.run_all(&scenarios).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    let failed: Vec<_> = reports.iter().filter(|r| !r.passed).collect();
    for report in &reports {
        match &report.error {
            None => info!(scenario = %report.scenario, duration_ms = report.duration_ms, "passed"),
            Some(err) => error!(
                scenario = %report.scenario,
                screenshot = ?report.screenshot,
                "failed: {}",
                err
            ),
        }
    }
    if !failed.is_empty() {
        bail!("{} of {} scenarios failed", failed.len(), reports.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::List => {
            for scenario in Scenario::ALL {
                let name = scenario
                    .to_possible_value()
                    .map(|v| v.get_name().to_string())
                    .unwrap_or_else(|| scenario.to_string());
                println!("{:<28} {}", name, scenario.description());
            }
            Ok(())
        }
    }
}

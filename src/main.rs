use clap::Parser;
use greek_stream::cli::{Cli, Commands};
use greek_stream::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize telemetry
    greek_stream::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!(symbols = config.feed.symbols.len(), "Starting analytics engine");
            args.execute(&config).await?;
        }
        Commands::Price(args) => {
            args.execute(config.analytics.risk_free_rate)?;
        }
        Commands::Parse(args) => {
            args.execute()?;
        }
        Commands::Config => {
            println!("Current configuration:");
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

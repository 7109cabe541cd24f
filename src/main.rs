use clap::Parser;
use tracing_subscriber::EnvFilter;

use xink_checkin::cli::{self, Cli, Commands};
use xink_checkin::config::BotConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let config_path = cli.config_path().to_string();
    let command = cli.command.unwrap_or(Commands::Run {
        once: false,
        no_proxy: false,
    });

    // Writing the default config must not depend on reading the current one
    let command = match command {
        Commands::Config { cmd } => {
            cli::handle_config_command(cmd, &config_path)?;
            return Ok(());
        }
        other => other,
    };

    let config = match cli.config {
        Some(path) => BotConfig::load(&path)?,
        None => BotConfig::load_or_default(&config_path),
    };

    match command {
        Commands::Run { once, no_proxy } => cli::run::handle_run(config, once, no_proxy).await,
        Commands::Accounts { no_proxy } => cli::accounts::handle_accounts(&config, no_proxy),
        Commands::Tokens { cmd } => cli::tokens::handle_tokens_command(cmd, &config.files.tokens)?,
        Commands::Config { .. } => {}
    }

    Ok(())
}

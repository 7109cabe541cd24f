pub mod accounts;
pub mod run;
pub mod tokens;

use clap::{Parser, Subcommand};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Parser)]
#[command(name = "xink-checkin")]
#[command(about = "X Ink daily check-in bot", long_about = None)]
pub struct Cli {
    /// Config file; defaults to ./config.toml (created if missing)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the check-in loop (default)
    Run {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
        /// Connect directly, ignoring the proxy list
        #[arg(long)]
        no_proxy: bool,
    },
    /// Show the wallets and proxy assignment without touching the network
    Accounts {
        #[arg(long)]
        no_proxy: bool,
    },
    /// Inspect or edit the token cache
    Tokens {
        #[command(subcommand)]
        cmd: tokens::TokenCommands,
    },
    /// Config file management
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write the default config
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    pub fn config_path(&self) -> &str {
        self.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH)
    }
}

pub fn handle_config_command(cmd: ConfigCommands, path: &str) -> Result<(), crate::error::CheckinError> {
    match cmd {
        ConfigCommands::Init { force } => {
            if std::path::Path::new(path).exists() && !force {
                return Err(crate::error::CheckinError::Config(format!(
                    "{} already exists, pass --force to overwrite",
                    path
                )));
            }
            crate::config::BotConfig::default().save(path)?;
            println!("Default config written to {}", path);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::parse_from(["xink-checkin", "run", "--once", "--no-proxy", "--log-level", "debug"]);
        assert_eq!(cli.log_level, "debug");
        assert_eq!(cli.config_path(), DEFAULT_CONFIG_PATH);
        match cli.command {
            Some(Commands::Run { once, no_proxy }) => assert!(once && no_proxy),
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_no_subcommand_and_global_config() {
        let cli = Cli::parse_from(["xink-checkin", "--config", "bot.toml"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.config_path(), "bot.toml");

        let cli = Cli::parse_from(["xink-checkin", "tokens", "remove", "--address", "0xabc", "--config", "x.toml"]);
        assert_eq!(cli.config_path(), "x.toml");
        assert!(matches!(
            cli.command,
            Some(Commands::Tokens { cmd: tokens::TokenCommands::Remove { .. } })
        ));
    }

    #[test]
    fn test_config_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();

        handle_config_command(ConfigCommands::Init { force: false }, path).unwrap();
        assert!(handle_config_command(ConfigCommands::Init { force: false }, path).is_err());
        handle_config_command(ConfigCommands::Init { force: true }, path).unwrap();
        assert_eq!(crate::config::BotConfig::load(path).unwrap().files.tokens, "tokens.json");
    }
}

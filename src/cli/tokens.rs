use clap::Subcommand;

use crate::error::CheckinError;
use crate::store::TokenStore;

#[derive(Subcommand)]
pub enum TokenCommands {
    /// List cached tokens (truncated)
    List,
    /// Forget the token of one wallet
    Remove {
        #[arg(long)]
        address: String,
    },
    /// Forget every token
    Clear,
}

fn preview(token: &str) -> String {
    if token.chars().count() <= 16 {
        token.to_string()
    } else {
        let head: String = token.chars().take(12).collect();
        format!("{}...", head)
    }
}

/// Addresses are stored checksummed; accept any casing on the command line.
fn stored_key(store: &TokenStore, address: &str) -> Option<String> {
    store
        .iter()
        .map(|(addr, _)| addr)
        .find(|addr| addr.eq_ignore_ascii_case(address))
        .map(str::to_string)
}

pub fn handle_tokens_command(cmd: TokenCommands, tokens_file: &str) -> Result<(), CheckinError> {
    let mut store = TokenStore::load(tokens_file);

    match cmd {
        TokenCommands::List => {
            println!("Cached tokens ({}) in {}:", store.len(), tokens_file);
            for (address, token) in store.iter() {
                println!(" - {} {}", address, preview(token));
            }
        }
        TokenCommands::Remove { address } => match stored_key(&store, &address) {
            Some(key) => {
                store.remove(&key)?;
                println!("Removed token for {}", key);
            }
            None => println!("No token stored for {}", address),
        },
        TokenCommands::Clear => {
            let removed = store.clear()?;
            println!("Removed {} token(s)", removed);
        }
    }
    Ok(())
}

use crate::client::ProxyHandle;
use crate::config::{read_lines, BotConfig};
use crate::crypto::{resolve, Resolution};
use crate::orchestrator::assign_proxy;

/// One line of the `accounts` listing.
#[derive(Debug, PartialEq)]
pub struct AccountRow {
    pub index: usize,
    /// Address, or the reason the key was rejected
    pub address: Result<String, String>,
    pub proxy: Option<String>,
}

pub fn account_rows(keys: &[String], proxies: &[ProxyHandle]) -> Vec<AccountRow> {
    keys.iter()
        .enumerate()
        .map(|(index, key)| AccountRow {
            index,
            address: match resolve(key) {
                Resolution::Valid(account) => Ok(account.address),
                Resolution::Invalid(reason) => Err(reason),
            },
            proxy: assign_proxy(index, proxies).map(ProxyHandle::masked),
        })
        .collect()
}

pub fn handle_accounts(config: &BotConfig, no_proxy: bool) {
    let keys = read_lines(&config.files.private_keys);
    let proxies: Vec<ProxyHandle> = if config.network.use_proxy && !no_proxy {
        read_lines(&config.files.proxies).iter().map(|l| ProxyHandle::parse(l)).collect()
    } else {
        Vec::new()
    };

    let rows = account_rows(&keys, &proxies);
    println!("Wallets ({}):", rows.len());
    for row in &rows {
        let proxy = row.proxy.as_deref().unwrap_or("direct");
        match &row.address {
            Ok(address) => println!(" {:>3}. {} via {}", row.index + 1, address, proxy),
            Err(reason) => println!(" {:>3}. <invalid key: {}>", row.index + 1, reason),
        }
    }
    let invalid = rows.iter().filter(|r| r.address.is_err()).count();
    if invalid > 0 {
        println!("{} invalid key(s) will be skipped", invalid);
    }
}

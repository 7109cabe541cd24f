pub mod cli;
pub mod client;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod orchestrator;
pub mod processor;
pub mod report;
pub mod scheduler;
pub mod store;
pub mod timer;

#[cfg(test)]
mod test_support;

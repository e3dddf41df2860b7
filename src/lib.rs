pub mod cache;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod form;
pub mod output;
pub mod sync;
#[cfg(test)]
mod test_server;
pub mod types;

//! Core server plumbing: configuration, state, logging, bootstrap

pub mod config;
pub mod logger;
pub mod server;
pub mod state;

pub use config::Config;
pub use logger::{init_logger, init_logger_with_file};
pub use server::serve;
pub use state::ServerState;

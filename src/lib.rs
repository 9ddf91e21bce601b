pub mod config;
pub mod flags;
pub mod probe;
pub mod server;

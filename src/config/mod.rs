#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{AdminCommand, BikesCommand, BookingsCommand, CliConfig, Command, UsersCommand};
pub use toml_config::ClientConfig;

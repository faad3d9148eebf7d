pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{FileSessionStore, MemoryNavigator, TracingNotifier};
pub use app::{OutputFormat, RentalApp};
pub use config::ClientConfig;
pub use core::{ApiClient, AuthSession, QueryClient, RouteDecision, RouteTable};
pub use utils::error::{ClientError, Result};

use crate::app::render::OutputFormat;
use crate::config::toml_config::ClientConfig;
use crate::core::services::BikeSort;
use crate::utils::error::{ClientError, Result};
use crate::utils::helpers::AsDate;
use crate::utils::validation::Validate;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "bike-rental")]
#[command(about = "Command-line client for the bike rental service", version)]
pub struct CliConfig {
    /// API base URL, e.g. http://localhost:3000/api/v1
    #[arg(long, env = "BIKE_RENTAL_API_URL", global = true)]
    pub base_url: Option<String>,

    /// TOML config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Where the session cookie is kept between runs
    #[arg(long, env = "BIKE_RENTAL_SESSION_FILE", global = true)]
    pub session_file: Option<PathBuf>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Log in and keep the session for later commands
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "BIKE_RENTAL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "BIKE_RENTAL_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        password_confirm: String,
    },
    Logout,
    /// Show whether the stored session is still valid
    Status,
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    ResetPassword {
        token: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        password_confirm: String,
    },
    UpdatePassword {
        #[arg(long)]
        current: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        password_confirm: String,
    },
    /// Update name and email
    UpdateMe {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    DeleteAccount {
        /// Required to actually delete the account
        #[arg(long)]
        yes: bool,
    },
    /// Save recommendation preferences
    Preferences {
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
        #[arg(long)]
        min_engine_cc: Option<f64>,
        #[arg(long)]
        max_engine_cc: Option<f64>,
        #[arg(long)]
        min_weight: Option<f64>,
        #[arg(long)]
        max_weight: Option<f64>,
    },
    /// Bikes recommended from your preferences
    Recommend,
    /// Dashboard figures and highlights
    Overview,
    #[command(subcommand)]
    Bikes(BikesCommand),
    #[command(subcommand)]
    Bookings(BookingsCommand),
    #[command(subcommand)]
    Admin(AdminCommand),
    /// Resolve a path against the route table
    Route { path: String },
    /// Header navigation links for the current user
    Nav {
        #[arg(long, default_value = "/")]
        current: String,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum BikesCommand {
    List {
        #[arg(long)]
        search: Option<String>,
        /// name, price, -price, -ratingsAverage or engineCC
        #[arg(long, allow_hyphen_values = true)]
        sort: Option<BikeSort>,
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
        #[arg(long)]
        min_rating: Option<f64>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Show {
        id: String,
    },
    TopCheap,
    Stats,
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        engine_cc: Option<f64>,
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        price_discount: Option<f64>,
        #[arg(long)]
        summary: String,
        #[arg(long)]
        description: String,
    },
    /// Patch only the given fields
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        engine_cc: Option<f64>,
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        price_discount: Option<f64>,
        #[arg(long)]
        summary: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Delete {
        id: String,
    },
    Recluster,
}

#[derive(Debug, Clone, Subcommand)]
pub enum BookingsCommand {
    Create {
        #[arg(long)]
        bike: String,
        #[arg(long)]
        pickup: String,
        #[arg(long = "drop")]
        drop_location: String,
        /// RFC 3339 timestamp or YYYY-MM-DD
        #[arg(long, value_parser = parse_date_arg)]
        start: DateTime<Utc>,
        #[arg(long, value_parser = parse_date_arg)]
        end: DateTime<Utc>,
    },
    Cancel {
        id: String,
    },
    List,
}

#[derive(Debug, Clone, Subcommand)]
pub enum AdminCommand {
    #[command(subcommand)]
    Users(UsersCommand),
}

#[derive(Debug, Clone, Subcommand)]
pub enum UsersCommand {
    List {
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Show {
        id: String,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
    Delete {
        id: String,
    },
}

fn parse_date_arg(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    value
        .as_date()
        .ok_or_else(|| format!("'{}' is not an RFC 3339 timestamp or YYYY-MM-DD date", value))
}

impl CliConfig {
    /// 設定檔 + 命令列覆寫後的最終設定
    pub fn client_config(&self) -> Result<ClientConfig> {
        let base = match &self.config {
            Some(path) => {
                if !path.exists() {
                    return Err(ClientError::ConfigError {
                        message: format!("Config file not found: {}", path.display()),
                    });
                }
                ClientConfig::from_file(path)?
            }
            None => ClientConfig::default(),
        };
        Ok(base.with_overrides(self.base_url.clone(), self.session_file.clone()))
    }

    /// 對應命令所在的頁面，用於路由守衛
    pub fn route_path(&self) -> String {
        match &self.command {
            Command::Login { .. } | Command::ForgotPassword { .. } => "/login".to_string(),
            Command::ResetPassword { .. } => "/login".to_string(),
            Command::Signup { .. } => "/signup".to_string(),
            Command::Logout | Command::Status | Command::Nav { .. } => "/".to_string(),
            Command::UpdatePassword { .. }
            | Command::UpdateMe { .. }
            | Command::DeleteAccount { .. }
            | Command::Preferences { .. }
            | Command::Recommend => "/profile".to_string(),
            Command::Overview => "/".to_string(),
            Command::Bikes(BikesCommand::Show { id }) => format!("/bikes/{}", id),
            Command::Bikes(BikesCommand::List { .. })
            | Command::Bikes(BikesCommand::TopCheap)
            | Command::Bikes(BikesCommand::Stats) => "/bikes".to_string(),
            Command::Bikes(_) => "/admin/bikes".to_string(),
            Command::Bookings(_) => "/bookings".to_string(),
            Command::Admin(_) => "/admin/users".to_string(),
            Command::Route { path } => path.clone(),
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        self.client_config()?.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bike_list_filters() {
        let cli = CliConfig::try_parse_from([
            "bike-rental",
            "--format",
            "json",
            "bikes",
            "list",
            "--sort=-price",
            "--min-price",
            "15",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Command::Bikes(BikesCommand::List { sort, min_price, .. }) => {
                assert_eq!(sort, Some(BikeSort::PriceDesc));
                assert_eq!(min_price, Some(15.0));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_route_paths_follow_commands() {
        let cli = CliConfig::try_parse_from(["bike-rental", "bikes", "show", "b7"]).unwrap();
        assert_eq!(cli.route_path(), "/bikes/b7");

        let cli = CliConfig::try_parse_from(["bike-rental", "bikes", "recluster"]).unwrap();
        assert_eq!(cli.route_path(), "/admin/bikes");

        let cli = CliConfig::try_parse_from([
            "bike-rental",
            "login",
            "--email",
            "ana@example.com",
            "--password",
            "password123",
        ])
        .unwrap();
        assert_eq!(cli.route_path(), "/login");
    }

    #[test]
    fn test_booking_dates_accept_plain_dates() {
        let cli = CliConfig::try_parse_from([
            "bike-rental",
            "bookings",
            "create",
            "--bike",
            "b1",
            "--pickup",
            "Harbor",
            "--drop",
            "Airport",
            "--start",
            "2030-05-01",
            "--end",
            "2030-05-03T10:00:00Z",
        ])
        .unwrap();

        match cli.command {
            Command::Bookings(BookingsCommand::Create { start, end, .. }) => {
                assert_eq!(start.to_rfc3339(), "2030-05-01T00:00:00+00:00");
                assert!(end > start);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(CliConfig::try_parse_from([
            "bike-rental",
            "bookings",
            "create",
            "--bike",
            "b1",
            "--pickup",
            "Harbor",
            "--drop",
            "Airport",
            "--start",
            "next week",
            "--end",
            "2030-05-03",
        ])
        .is_err());
    }

    #[test]
    fn test_missing_config_file_is_reported() {
        let cli = CliConfig::try_parse_from([
            "bike-rental",
            "--config",
            "/definitely/not/here.toml",
            "status",
        ])
        .unwrap();
        assert!(matches!(
            cli.client_config(),
            Err(ClientError::ConfigError { .. })
        ));
    }
}

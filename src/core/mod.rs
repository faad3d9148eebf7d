pub mod api;
pub mod query;
pub mod routes;
pub mod services;
pub mod session;

pub use api::{ApiClient, ApiClientBuilder};
pub use query::{QueryClient, QueryKey, QueryOptions};
pub use routes::{nav_links, Guard, NavLink, Page, RouteDecision, RouteTable};
pub use session::{ActionOutcome, AuthSession, AuthState};
pub use crate::utils::error::Result;

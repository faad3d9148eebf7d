pub mod admin;
pub mod auth;
pub mod bikes;
pub mod bookings;

pub use admin::{AdminService, UserQuery};
pub use auth::{AuthCheck, AuthService};
pub use bikes::{BikeList, BikeQuery, BikeSort, BikesService};
pub use bookings::BookingsService;

// 資料查詢：每個資源的快取 key、stale time 與 mutation 後要失效的 key

pub mod admin;
pub mod bikes;
pub mod bookings;

pub use admin::AdminQueries;
pub use bikes::BikeQueries;
pub use bookings::BookingQueries;

pub mod error;
pub mod forms;
pub mod helpers;
pub mod logger;
pub mod validation;

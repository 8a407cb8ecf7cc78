pub mod config;
pub mod error;
pub mod inventory;
pub mod store;
pub mod telemetry;

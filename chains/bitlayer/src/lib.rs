pub mod account;
pub mod api;
pub mod client;
pub mod config;
pub mod executor;
pub mod task;
pub mod utils;

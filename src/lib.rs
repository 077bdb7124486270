pub mod api;
pub mod chart;
pub mod client;
pub mod config;
pub mod etherscan;
pub mod fetch_stats;
pub mod models;
pub mod storage;
pub mod window;

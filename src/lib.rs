pub mod config;
pub mod error;
pub mod export;
pub mod grid;
pub mod planner;
pub mod render;
pub mod report;
pub mod session;
pub mod strips;
pub mod types;
pub mod units;

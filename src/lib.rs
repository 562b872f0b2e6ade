pub mod config;
pub mod logging;
pub mod output;
pub mod planner;
pub mod session;

pub mod config;
pub mod errors;
pub mod filter;
pub mod input;
pub mod partition;
pub mod report;
pub mod solver;

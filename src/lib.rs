pub mod certdb;
pub mod cli;
pub mod config;
pub mod crl;
pub mod telemetry;

pub mod config;
pub mod db;
pub mod enrich;
pub mod error;
pub mod http;
pub mod league;
pub mod metrics;
pub mod rental;
pub mod riot;
pub mod state;

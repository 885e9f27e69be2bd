//! Sentiscope Server
//!
//! HTTP front end for multilingual sentiment classification: a browser page,
//! a JSON classification API, health and Prometheus endpoints.

pub mod cli;
pub mod config;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use server::{build_app, run_server};
pub use state::AppState;

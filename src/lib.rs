pub mod auth;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod list;
pub mod logging;
pub mod middleware;
pub mod provider;
pub mod resources;
pub mod routes;
pub mod state;
pub mod stock;

pub use routes::app;
pub use state::AppState;

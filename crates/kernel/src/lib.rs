//! Vetrina Kernel Library
//!
//! Headless exposure of content resources as JSON. The main entry point for
//! running the server is the `vetrina` binary; embedders build an
//! [`AppState`] with their own transformers and mount [`routes::build_router`].

pub mod config;
pub mod db;
pub mod error;
pub mod exposure;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod selector;
pub mod state;
pub mod store;

pub use config::Config;
pub use state::AppState;

//! HTTP middleware components.

pub mod client;

pub use client::{ClientContext, classify_client};

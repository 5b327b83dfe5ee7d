//! HTTP module for outbound requests
//!
//! This module contains:
//! - The shared client with bounded in-flight requests
//! - The connection manager owning the client lifecycle
//! - A health probe for upstream sites

mod client;
mod health;
mod manager;

pub use client::{build_http_client, HttpClient};
pub use health::{check_health, SiteHealth};
pub use manager::ConnectionManager;

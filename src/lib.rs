//! SIM card usage dashboard
//!
//! Usage analytics over a SurrealDB store, with a per-user consumption
//! forecast driven by a pre-trained LightGBM model.

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod catalog;
pub mod chart;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod forecast;
pub mod model;
pub mod models;
pub mod seed;
pub mod stats;

pub use error::{DashboardError, Result};

//! st-dash - Dashboard backend for SensorThings sensor telemetry
//!
//! This library exposes the core modules for testing and reuse.

pub mod common;
pub mod config;
pub mod error;
pub mod frost;
pub mod pipeline;
pub mod routes;
pub mod services;
pub mod session;
pub mod sync;

//! service-core: Shared HTTP service infrastructure (config, errors, tracing, middleware).
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;

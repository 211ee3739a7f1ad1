pub mod allocator;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod runtime;
pub mod utils;
pub mod workload;

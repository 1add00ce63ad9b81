// Library for the binaries and tests

pub mod activity_repo;
pub mod aggregator;
pub mod cache;
pub mod collector;
pub mod config;
pub mod error;
pub mod gpu_repo;
pub mod graph;
pub mod models;
pub mod routes;
pub mod sampler;
pub mod schedule;
pub mod telemetry;

pub mod auth;
pub mod config;
pub mod error;
pub mod keepalive;
pub mod telemetry;
pub mod workflows;

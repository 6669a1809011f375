//! Runtime health reporting

pub mod health;

pub use health::{ComponentHealth, HealthMonitor, HealthStatus, Status};

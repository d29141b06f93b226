//! Infrastructure adapters: filesystem output and telemetry bootstrap.

pub mod error;
pub mod output;
pub mod telemetry;

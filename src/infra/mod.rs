//! Infrastructure layer: telemetry, upstream HTTP client, web surface.

pub mod error;
pub mod http;
pub mod telemetry;
pub mod upstream;

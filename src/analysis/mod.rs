pub mod telemetry;
pub mod topology;

//! Infrastructure layer: transport, dispatch, configuration, telemetry.

pub mod config;
pub mod dispatch;
pub mod telemetry;
pub mod ws;

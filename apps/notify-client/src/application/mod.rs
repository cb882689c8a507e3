//! Application layer: service composition over the infrastructure.

pub mod services;

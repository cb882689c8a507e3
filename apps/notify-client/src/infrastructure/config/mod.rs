//! Configuration
//!
//! Client configuration loaded from environment variables, with documented
//! defaults for every knob.

mod settings;

pub use settings::{
    ClientConfig, ConfigError, ConnectionSettings, DEFAULT_BASE_URL, DeliveryMode,
    DispatchSettings,
};

//! Configuration module

pub mod settings;

pub use settings::{
    GatewayConfig, LoggingConfig, OpenRouterConfig, ServerConfig, Settings, CREDENTIAL_SLOT_COUNT,
};

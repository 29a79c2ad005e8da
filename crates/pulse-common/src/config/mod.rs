//! Configuration structs

mod gateway_config;

pub use gateway_config::{
    AppSettings, ConfigError, Environment, GatewayConfig, HeartbeatMode, IdentifySettings,
};

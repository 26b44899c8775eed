// Gateway Redistribution Scenario Module

pub mod config;
pub mod runner;
pub mod stats;

// Re-export commonly used types
pub use config::{
    AdvertConfig,
    AssociationMethod,
    GatewayConfig,
    LinkMode,
    ScenarioConfig,
    ScenarioMeta,
    TopologyConfig,
    TrafficConfig,
};

pub use runner::{ScenarioRunner, TRAFFIC_PORT};

pub use stats::{DeliveryStats, ScenarioResult, StatsSink};

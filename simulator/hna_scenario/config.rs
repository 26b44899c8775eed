// Gateway Redistribution Scenario Configuration

use mg_rust::{millis, secs, SimTime};
use serde::Deserialize;

// ============================================================================
// Main Configuration
// ============================================================================

/// One complete scenario as loaded from YAML (or built programmatically)
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    /// Scenario metadata
    #[serde(default)]
    pub meta: ScenarioMeta,

    /// Total simulated run time (seconds)
    pub duration_s: u64,

    /// Per-hop propagation delay (milliseconds)
    #[serde(default = "default_hop_delay_ms")]
    pub hop_delay_ms: u64,

    /// Master seed; omit for a random seed (the seed used is reported)
    #[serde(default)]
    pub seed: Option<u64>,

    /// Advertisement timing overrides
    #[serde(default)]
    pub advert: AdvertConfig,

    /// Mesh topology
    pub topology: TopologyConfig,

    /// Border gateway designation; omit for a pure mesh scenario
    #[serde(default)]
    pub gateway: Option<GatewayConfig>,

    /// Traffic source/sink parameters
    pub traffic: TrafficConfig,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ScenarioMeta {
    pub name: Option<String>,
    pub description: Option<String>,
}

// ============================================================================
// Advertisement timing
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AdvertConfig {
    #[serde(default = "default_advert_interval_s")]
    pub interval_s: u64,

    #[serde(default = "default_advert_jitter_ms")]
    pub jitter_ms: u64,
}

impl Default for AdvertConfig {
    fn default() -> Self {
        Self {
            interval_s: default_advert_interval_s(),
            jitter_ms: default_advert_jitter_ms(),
        }
    }
}

// ============================================================================
// Topology
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TopologyConfig {
    /// Number of mesh participants (ids 0..mesh_nodes)
    pub mesh_nodes: usize,

    #[serde(default = "default_link_mode")]
    pub links: LinkMode,

    /// Probability of each possible link in `random` mode. A random graph
    /// may come out disconnected; that is a property of the scenario, not an
    /// error.
    #[serde(default = "default_connectivity")]
    pub connectivity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    /// 0-1, 1-2, ... (n-2)-(n-1)
    Chain,

    /// Every pair linked
    Full,

    /// Each pair linked with probability `connectivity`
    Random,
}

// ============================================================================
// Gateway / redistribution
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Mesh node that acts as border gateway
    pub node: u64,

    #[serde(default = "default_association")]
    pub association: AssociationMethod,

    /// Group index of the external network (2001:0:<index>::/64)
    #[serde(default = "default_external_prefix_index")]
    pub external_prefix_index: u16,
}

/// The two ways a gateway can publish the external network set
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationMethod {
    /// Explicit per-network associations
    Incremental,

    /// A whole static route table attached as a live view
    Table,
}

// ============================================================================
// Traffic
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TrafficConfig {
    /// Sending mesh node
    pub source: u64,

    /// Receiving mesh node; omit to target the external host behind the
    /// gateway
    #[serde(default)]
    pub sink: Option<u64>,

    #[serde(default = "default_packets")]
    pub packets: u32,

    #[serde(default = "default_traffic_interval_s")]
    pub interval_s: u64,

    #[serde(default = "default_payload_bytes")]
    pub payload_bytes: u32,

    /// First firing (seconds after simulation start)
    pub start_s: u64,
}

// ============================================================================
// Derived accessors
// ============================================================================

impl ScenarioConfig {
    pub fn hop_delay(&self) -> SimTime {
        millis(self.hop_delay_ms)
    }

    pub fn duration(&self) -> SimTime {
        secs(self.duration_s)
    }

    pub fn advert_interval(&self) -> SimTime {
        secs(self.advert.interval_s)
    }

    pub fn advert_jitter(&self) -> SimTime {
        millis(self.advert.jitter_ms)
    }

    pub fn traffic_interval(&self) -> SimTime {
        secs(self.traffic.interval_s)
    }

    pub fn traffic_start(&self) -> SimTime {
        secs(self.traffic.start_s)
    }
}

// ============================================================================
// Defaults
// ============================================================================

fn default_hop_delay_ms() -> u64 {
    2
}

fn default_advert_interval_s() -> u64 {
    2
}

fn default_advert_jitter_ms() -> u64 {
    100
}

fn default_link_mode() -> LinkMode {
    LinkMode::Chain
}

fn default_connectivity() -> f64 {
    0.3
}

fn default_association() -> AssociationMethod {
    AssociationMethod::Incremental
}

fn default_external_prefix_index() -> u16 {
    2
}

fn default_packets() -> u32 {
    1
}

fn default_traffic_interval_s() -> u64 {
    1
}

fn default_payload_bytes() -> u32 {
    1000
}

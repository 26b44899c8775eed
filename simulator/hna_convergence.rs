//! Canonical gateway redistribution scenario, run programmatically with
//! both association methods.
//!
//! Run with: cargo run --example hna_convergence

use log::info;
use simple_logger::SimpleLogger;

mod hna_scenario;

use hna_scenario::{
    AdvertConfig, AssociationMethod, GatewayConfig, LinkMode, ScenarioConfig, ScenarioMeta,
    ScenarioRunner, TopologyConfig, TrafficConfig,
};

fn scenario(association: AssociationMethod) -> ScenarioConfig {
    ScenarioConfig {
        meta: ScenarioMeta {
            name: Some("gateway-convergence".into()),
            description: Some(
                "Three-node mesh chain; node 1 bridges to a wired network".into(),
            ),
        },
        duration_s: 20,
        hop_delay_ms: 2,
        seed: Some(42),
        advert: AdvertConfig::default(),
        topology: TopologyConfig {
            mesh_nodes: 3,
            links: LinkMode::Chain,
            connectivity: 0.3,
        },
        gateway: Some(GatewayConfig {
            node: 1,
            association,
            external_prefix_index: 2,
        }),
        traffic: TrafficConfig {
            source: 0,
            sink: None,
            packets: 1,
            interval_s: 1,
            payload_bytes: 1000,
            start_s: 15,
        },
    }
}

fn main() {
    SimpleLogger::new().init().unwrap();

    for association in [AssociationMethod::Incremental, AssociationMethod::Table] {
        info!("--- association method: {:?} ---", association);
        let result = ScenarioRunner::new(scenario(association)).run();
        result.log_summary();

        if result.received == result.sent {
            info!("all packets crossed the gateway");
        } else {
            info!(
                "delivery incomplete: {}/{} packets arrived",
                result.received, result.sent
            );
        }
    }
}

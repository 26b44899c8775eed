//! Larger ad-hoc mesh without a gateway: 25 nodes, random links, one packet
//! from the last node to the first after the mesh has had time to converge.
//!
//! Run with: cargo run --example grid_adhoc

use log::info;
use simple_logger::SimpleLogger;

mod hna_scenario;

use hna_scenario::{
    AdvertConfig, LinkMode, ScenarioConfig, ScenarioMeta, ScenarioRunner, TopologyConfig,
    TrafficConfig,
};

fn main() {
    SimpleLogger::new().init().unwrap();

    let config = ScenarioConfig {
        meta: ScenarioMeta {
            name: Some("grid-adhoc".into()),
            description: Some("25-node random mesh, source 24 to sink 0".into()),
        },
        duration_s: 33,
        hop_delay_ms: 2,
        seed: Some(7),
        advert: AdvertConfig::default(),
        topology: TopologyConfig {
            mesh_nodes: 25,
            links: LinkMode::Random,
            connectivity: 0.3,
        },
        gateway: None,
        traffic: TrafficConfig {
            source: 24,
            sink: Some(0),
            packets: 1,
            interval_s: 1,
            payload_bytes: 1000,
            // give the mesh time to converge
            start_s: 30,
        },
    };

    let result = ScenarioRunner::new(config).run();
    result.log_summary();

    if result.received > 0 {
        info!("mesh converged end to end");
    } else {
        info!("no delivery - mesh did not converge (or the random graph is partitioned)");
    }
}

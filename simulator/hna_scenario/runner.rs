// Gateway Redistribution Scenario Runner
//
// Builds a SimNetwork from a ScenarioConfig, runs it, and collects a
// ScenarioResult. Mesh node ids are 0..mesh_nodes; when a gateway is
// configured, one extra node (id == mesh_nodes) sits on the external wired
// network and receives the oracle traffic.

use std::cell::RefCell;
use std::rc::Rc;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use mg_rust::{
    Addr, NetworkPrefix, NodeId, ProactiveConfig, ProactiveProtocol, ProtocolInstance,
    ProtocolKind, Redistributor, Scheduler, SimNetwork, SimSocket, StaticRouting,
    TrafficGenerator, TrafficSink,
};

use super::config::{AssociationMethod, LinkMode, ScenarioConfig};
use super::stats::{DeliveryStats, ScenarioResult, StatsSink};

pub const TRAFFIC_PORT: u16 = 80;

/// Interface index of the gateway's wired attachment
const IF_WIRED: u32 = 1;

fn mesh_host(n: u16) -> Addr {
    Addr::from_segments([0x2001, 0, 1, 0, 0, 0, 0, n])
}

fn group_prefix(index: u16) -> NetworkPrefix {
    NetworkPrefix::new(Addr::from_segments([0x2001, 0, index, 0, 0, 0, 0, 0]), 64)
}

fn host_in(prefix: NetworkPrefix, n: u16) -> Addr {
    Addr(prefix.addr().0 | n as u128)
}

pub struct ScenarioRunner {
    config: ScenarioConfig,
}

impl ScenarioRunner {
    pub fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }

    pub fn run(self) -> ScenarioResult {
        let config = &self.config;
        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let mut rng = StdRng::seed_from_u64(seed);

        let net = SimNetwork::new(config.hop_delay());
        let mesh_nodes = config.topology.mesh_nodes as NodeId;

        // 1. Mesh participants: proactive instance at priority 10, static
        //    table at priority 0, host prefix originated into the mesh
        let advert = ProactiveConfig {
            advert_interval: config.advert_interval(),
            advert_jitter: config.advert_jitter(),
            validity_factor: 3,
        };
        for id in 0..mesh_nodes {
            net.add_node(id);
            let addr = mesh_host(id as u16 + 1);
            net.set_mesh_addr(id, addr);

            let proactive = Rc::new(RefCell::new(ProactiveProtocol::with_config(
                id,
                advert.clone(),
                seed ^ id,
            )));
            proactive
                .borrow_mut()
                .add_local_prefix(NetworkPrefix::new(addr, 128));

            net.with_node(id, |n| {
                n.protocols
                    .install(ProtocolInstance::Proactive(proactive), 10)
                    .unwrap();
                n.protocols
                    .install(
                        ProtocolInstance::Static(Rc::new(RefCell::new(StaticRouting::new()))),
                        0,
                    )
                    .unwrap();
            })
            .unwrap();
        }

        // 2. Links
        match config.topology.links {
            LinkMode::Chain => {
                for id in 1..mesh_nodes {
                    net.add_mesh_link(id - 1, id);
                }
            }
            LinkMode::Full => {
                for a in 0..mesh_nodes {
                    for b in (a + 1)..mesh_nodes {
                        net.add_mesh_link(a, b);
                    }
                }
            }
            LinkMode::Random => {
                for a in 0..mesh_nodes {
                    for b in (a + 1)..mesh_nodes {
                        if rng.gen_bool(config.topology.connectivity) {
                            net.add_mesh_link(a, b);
                        }
                    }
                }
            }
        }

        // 3. Gateway designation and redistribution
        let mut external_host = None;
        let mut redistributor = None;
        if let Some(gateway) = &config.gateway {
            let external = group_prefix(gateway.external_prefix_index);
            let wired_node: NodeId = mesh_nodes;
            net.add_node(wired_node);
            let wired_addr = host_in(external, 1);
            net.register_addr(wired_addr, wired_node);

            // the gateway's own static instance reaches the wired network
            net.with_node(gateway.node, |n| {
                if let Some(ProtocolInstance::Static(table)) =
                    n.protocols.find_by_kind(ProtocolKind::Static)
                {
                    table
                        .borrow_mut()
                        .add_network_route(external, Addr::UNSPECIFIED, IF_WIRED, 0);
                }
            })
            .expect("gateway node exists");

            let mut controller = net
                .with_node(gateway.node, |n| Redistributor::attach(&n.protocols))
                .expect("gateway node exists")
                .expect("gateway node has a proactive instance");
            match gateway.association {
                AssociationMethod::Incremental => {
                    controller.add_association(external).unwrap();
                }
                AssociationMethod::Table => {
                    let table = Rc::new(RefCell::new(StaticRouting::new()));
                    table
                        .borrow_mut()
                        .add_network_route(external, Addr::UNSPECIFIED, IF_WIRED, 0);
                    controller.set_table_association(table).unwrap();
                }
            }
            info!(
                "gateway node {} redistributes {} ({:?})",
                gateway.node, external, gateway.association
            );

            external_host = Some(wired_addr);
            redistributor = Some(controller);
        }

        // 4. Oracle traffic
        let (sink_node, dest) = match config.traffic.sink {
            Some(node) => (node, mesh_host(node as u16 + 1)),
            None => (
                mesh_nodes,
                external_host.expect("traffic needs either a mesh sink or a gateway"),
            ),
        };
        let sink = Rc::new(RefCell::new(TrafficSink::new()));
        net.bind_sink(sink_node, TRAFFIC_PORT, Rc::clone(&sink));

        let stats = DeliveryStats::shared();
        net.set_event_sink(Box::new(StatsSink::new(Rc::clone(&stats))));

        let mut sched = Scheduler::new();
        net.start_advertisements(&mut sched);

        let socket = SimSocket::connect(
            &net,
            config.traffic.source,
            mesh_host(config.traffic.source as u16 + 1),
            dest,
            TRAFFIC_PORT,
        );
        let generator = Rc::new(RefCell::new(TrafficGenerator::new(
            Box::new(socket),
            config.traffic.payload_bytes,
            config.traffic.packets,
            config.traffic_interval(),
        )));
        TrafficGenerator::start(Rc::clone(&generator), &mut sched, config.traffic_start());

        info!(
            "testing {} packets from node {} to {} over {} mesh nodes",
            config.traffic.packets, config.traffic.source, dest, config.topology.mesh_nodes
        );

        // 5. Run and collect
        sched.run(config.duration());

        let source_routes = net
            .with_node(config.traffic.source, |n| n.protocols.current_routes().len())
            .unwrap_or(0);
        let gateway_neighbors = redistributor
            .as_ref()
            .map(|controller| controller.gateway().borrow().current_neighbors().len())
            .unwrap_or(0);

        let stats = stats.borrow();
        let sent = generator.borrow().sent();
        let received = sink.borrow().received();
        let result = ScenarioResult {
            seed_used: seed,
            sent,
            received,
            delivered: stats.delivered,
            dropped: stats.dropped,
            forwarded: stats.forwarded,
            adverts_sent: stats.adverts_sent,
            adverts_accepted: stats.adverts_accepted,
            first_delivery: stats.first_delivery,
            source_routes,
            gateway_neighbors,
        };
        result
    }
}

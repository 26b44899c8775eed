// Demo run of the canonical gateway topology:
//
//              |-- mesh (2001:0:1::/64) --|   |- wired (2001:0:2::/64) -|
//            A ))))                  (((( B --------------------------- C
//
// A can only reach C after B redistributes the wired network into the mesh.

use std::cell::RefCell;
use std::rc::Rc;

use log::info;
use simple_logger::SimpleLogger;

use mg_rust::{
    millis, secs, Addr, NetworkPrefix, ProactiveConfig, ProactiveProtocol, ProtocolInstance,
    Redistributor, Scheduler, SimNetwork, SimSocket, StaticRouting, TrafficGenerator, TrafficSink,
};

const NODE_A: u64 = 0;
const NODE_B: u64 = 1;
const NODE_C: u64 = 2;
const PORT: u16 = 80;

fn mesh_host(n: u16) -> Addr {
    Addr::from_segments([0x2001, 0, 1, 0, 0, 0, 0, n])
}

fn main() {
    SimpleLogger::new().init().unwrap();

    info!("starting");

    let packet_size = 1000u32;
    let num_packets = 10u32;
    let interval = secs(1);
    let seed = 42u64;

    let external = NetworkPrefix::new(Addr::from_segments([0x2001, 0, 2, 0, 0, 0, 0, 0]), 64);
    let c_addr = Addr::from_segments([0x2001, 0, 2, 0, 0x200, 0xff, 0xfe00, 1]);

    let net = SimNetwork::new(millis(2));

    // mesh participants A and B
    for (id, host) in [(NODE_A, 1u16), (NODE_B, 2u16)] {
        net.add_node(id);
        net.set_mesh_addr(id, mesh_host(host));

        let proactive = Rc::new(RefCell::new(ProactiveProtocol::with_config(
            id,
            ProactiveConfig::default(),
            seed ^ id,
        )));
        proactive
            .borrow_mut()
            .add_local_prefix(NetworkPrefix::new(mesh_host(host), 128));

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
    net.add_mesh_link(NODE_A, NODE_B);

    // C sits on the wired network only and runs no routing protocol
    net.add_node(NODE_C);
    net.register_addr(c_addr, NODE_C);

    // B reaches the wired network on-link via interface 1
    net.with_node(NODE_B, |n| {
        if let Some(ProtocolInstance::Static(table)) =
            n.protocols.find_by_kind(mg_rust::ProtocolKind::Static)
        {
            table
                .borrow_mut()
                .add_network_route(external, Addr::UNSPECIFIED, 1, 0);
        }
    })
    .unwrap();

    // designate B as gateway and redistribute the wired network
    let mut redistributor = net
        .with_node(NODE_B, |n| Redistributor::attach(&n.protocols))
        .unwrap()
        .unwrap();
    redistributor.add_association(external).unwrap();

    let sink = Rc::new(RefCell::new(TrafficSink::new()));
    net.bind_sink(NODE_C, PORT, Rc::clone(&sink));

    let mut sched = Scheduler::new();
    net.start_advertisements(&mut sched);

    // give the mesh time to converge before the source starts
    let socket = SimSocket::connect(&net, NODE_A, mesh_host(1), c_addr, PORT);
    let generator = Rc::new(RefCell::new(TrafficGenerator::new(
        Box::new(socket),
        packet_size,
        num_packets,
        interval,
    )));
    TrafficGenerator::start(Rc::clone(&generator), &mut sched, secs(15));

    info!(
        "testing {} packets from node {} to {} via gateway {}",
        num_packets, NODE_A, c_addr, NODE_B
    );

    sched.run(secs(30));

    let route = net
        .with_node(NODE_A, |n| n.protocols.route(&c_addr))
        .unwrap();
    match route {
        Some(route) => info!(
            "node {} resolves {} via {} (metric {})",
            NODE_A, c_addr, route.gateway, route.metric
        ),
        None => info!("node {} has no route to {}", NODE_A, c_addr),
    }

    info!(
        "done. sent: {} received: {} bytes: {}",
        generator.borrow().sent(),
        sink.borrow().received(),
        sink.borrow().bytes()
    );
}

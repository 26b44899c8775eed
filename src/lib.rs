//! # mesh-gate - Border Gateway Redistribution for Proactive Mesh Routing
//!
//! A deterministic discrete-event simulator for a proactive ad-hoc routing
//! domain. One node may act as a border gateway and redistribute externally
//! reachable networks into the mesh so every participant can build routes
//! toward them; a fixed-rate traffic generator/sink pair serves as the
//! end-to-end correctness oracle.
//!
//! ## Core Components
//!
//! - **Scheduler**: single authoritative simulation clock and event queue
//! - **RoutingProtocolList**: priority-ordered composite of routing protocol
//!   instances installed per node
//! - **ProactiveProtocol**: advertisement-flooding protocol instance
//! - **Redistributor**: feeds externally reachable networks into a gateway's
//!   advertisement cycle (table or incremental associations)
//! - **TrafficGenerator / TrafficSink**: the delivery oracle
//! - **SimNetwork**: node registry, flooding plane and hop-by-hop data plane
//!
//! ## Usage
//!
//! ```no_run
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use mg_rust::{
//!     millis, secs, Addr, NetworkPrefix, ProactiveProtocol, ProtocolInstance,
//!     Redistributor, Scheduler, SimNetwork,
//! };
//!
//! let net = SimNetwork::new(millis(2));
//! net.add_node(0);
//! net.set_mesh_addr(0, Addr::from_segments([0x2001, 0, 1, 0, 0, 0, 0, 1]));
//!
//! let proactive = Rc::new(RefCell::new(ProactiveProtocol::new(0, 42)));
//! net.with_node(0, |n| {
//!     n.protocols
//!         .install(ProtocolInstance::Proactive(proactive), 10)
//!         .unwrap();
//! })
//! .unwrap();
//!
//! // designate the gateway and advertise an external network
//! let external = NetworkPrefix::new(Addr::from_segments([0x2001, 0, 2, 0, 0, 0, 0, 0]), 64);
//! let mut redistributor = net
//!     .with_node(0, |n| Redistributor::attach(&n.protocols))
//!     .unwrap()
//!     .unwrap();
//! redistributor.add_association(external).unwrap();
//!
//! let mut sched = Scheduler::new();
//! net.start_advertisements(&mut sched);
//! sched.run(secs(30));
//! ```
//!
//! ## Simulation Harness
//!
//! The `simulator/` directory holds a YAML-driven `scenario_runner` binary
//! plus programmatic examples for the canonical gateway topology and larger
//! ad-hoc grids.

pub mod mg_interface;
pub mod mg_network;
pub mod mg_node;
pub mod mg_proactive;
pub mod mg_redistribute;
pub mod mg_routing;
pub mod mg_scheduler;
pub mod mg_static_routing;
pub mod mg_traffic;

// Re-export commonly used types
pub use mg_interface::{
    millis, secs, Addr, Event, EventSink, InterfaceId, NetworkPrefix, NoOpSink, NodeId,
    RouteEntry, RouteMetric, SimTime, IF_MESH,
};
pub use mg_network::{Packet, SimNetwork, SimSocket};
pub use mg_node::Node;
pub use mg_proactive::{Advertisement, ProactiveConfig, ProactiveProtocol};
pub use mg_redistribute::{AssociationSet, RedistributionError, Redistributor};
pub use mg_routing::{ProtocolInstance, ProtocolKind, RoutingError, RoutingProtocolList};
pub use mg_scheduler::{EventHandle, EventId, Scheduler};
pub use mg_static_routing::StaticRouting;
pub use mg_traffic::{DatagramSocket, GeneratorState, TrafficGenerator, TrafficSink};

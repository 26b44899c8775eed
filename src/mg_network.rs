// Simulated network substrate: node registry, mesh adjacency, address
// registry, the advertisement flooding plane and the hop-by-hop data plane.
//
// `SimNetwork` is a cheaply cloneable handle; clones share one world. All
// cross-node effects travel as scheduled deliveries, never direct state
// access, so one hop always costs one hop delay of simulated time.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::Write;
use std::rc::Rc;

use crate::mg_interface::{Addr, Event, EventSink, NoOpSink, NodeId, SimTime};
use crate::mg_node::Node;
use crate::mg_proactive::Advertisement;
use crate::mg_scheduler::Scheduler;
use crate::mg_traffic::{DatagramSocket, TrafficSink};

/// One datagram in flight
#[derive(Debug, Clone, Copy)]
pub struct Packet {
    pub src: Addr,
    pub dst: Addr,
    pub port: u16,
    pub size: u32,
}

struct NetworkState {
    nodes: BTreeMap<NodeId, Node>,

    /// Symmetric mesh adjacency: who hears whose broadcasts
    mesh: BTreeMap<NodeId, Vec<NodeId>>,

    /// Mesh interface address per node (the source address of its floods)
    mesh_addrs: BTreeMap<NodeId, Addr>,

    /// Every registered interface address, for next-hop resolution and
    /// local-delivery checks
    addrs: BTreeMap<Addr, NodeId>,

    /// Simulated per-hop propagation delay
    hop_delay: SimTime,

    events: Box<dyn EventSink>,
}

#[derive(Clone)]
pub struct SimNetwork {
    state: Rc<RefCell<NetworkState>>,
}

impl SimNetwork {
    pub fn new(hop_delay: SimTime) -> Self {
        Self {
            state: Rc::new(RefCell::new(NetworkState {
                nodes: BTreeMap::new(),
                mesh: BTreeMap::new(),
                mesh_addrs: BTreeMap::new(),
                addrs: BTreeMap::new(),
                hop_delay,
                events: Box::new(NoOpSink),
            })),
        }
    }

    /// Replace the event sink (defaults to `NoOpSink`)
    pub fn set_event_sink(&self, sink: Box<dyn EventSink>) {
        self.state.borrow_mut().events = sink;
    }

    pub fn add_node(&self, id: NodeId) {
        let mut state = self.state.borrow_mut();
        state.nodes.entry(id).or_insert_with(|| Node::new(id));
    }

    /// Connect two nodes on the mesh (symmetric)
    pub fn add_mesh_link(&self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        let mut state = self.state.borrow_mut();
        let forward = state.mesh.entry(a).or_default();
        if !forward.contains(&b) {
            forward.push(b);
        }
        let backward = state.mesh.entry(b).or_default();
        if !backward.contains(&a) {
            backward.push(a);
        }
    }

    /// Set a node's mesh interface address (also registers it)
    pub fn set_mesh_addr(&self, node: NodeId, addr: Addr) {
        let mut state = self.state.borrow_mut();
        state.mesh_addrs.insert(node, addr);
        state.addrs.insert(addr, node);
    }

    /// Register any additional interface address owned by a node
    pub fn register_addr(&self, addr: Addr, node: NodeId) {
        self.state.borrow_mut().addrs.insert(addr, node);
    }

    /// Run setup or queries against one node's state
    pub fn with_node<R>(&self, id: NodeId, f: impl FnOnce(&mut Node) -> R) -> Option<R> {
        let mut state = self.state.borrow_mut();
        state.nodes.get_mut(&id).map(f)
    }

    /// Bind a receive sink at `(node, port)`. Unknown nodes are ignored.
    pub fn bind_sink(&self, node: NodeId, port: u16, sink: Rc<RefCell<TrafficSink>>) {
        let _ = self.with_node(node, |n| n.bind_sink(port, sink));
    }

    // ========================================================================
    // Advertisement plane
    // ========================================================================

    /// Arm the periodic advertisement cycle of every proactive node. The
    /// first emission of each node happens one jittered interval from now.
    pub fn start_advertisements(&self, sched: &mut Scheduler) {
        let starters: Vec<(NodeId, SimTime)> = {
            let state = self.state.borrow();
            state
                .nodes
                .iter()
                .filter_map(|(id, node)| {
                    node.protocols
                        .proactive()
                        .map(|p| (*id, p.borrow_mut().next_cycle_delay()))
                })
                .collect()
        };
        for (node, delay) in starters {
            let net = self.clone();
            sched.schedule(delay, move |s| net.run_advert_cycle(s, node));
        }
    }

    fn run_advert_cycle(&self, sched: &mut Scheduler, node: NodeId) {
        let (adv, next_delay) = {
            let state = self.state.borrow();
            let Some(n) = state.nodes.get(&node) else {
                return;
            };
            let Some(proactive) = n.protocols.proactive() else {
                return;
            };
            let mut proactive = proactive.borrow_mut();
            (
                proactive.make_advertisement(sched.now()),
                proactive.next_cycle_delay(),
            )
        };

        let now = sched.now();
        self.state.borrow_mut().events.log(
            now,
            Event::AdvertisementSent {
                origin: node,
                prefixes: adv.prefixes.len(),
                external: adv.external.len(),
            },
        );

        self.broadcast(sched, node, adv);

        let net = self.clone();
        sched.schedule(next_delay, move |s| net.run_advert_cycle(s, node));
    }

    /// Deliver an advertisement to every mesh neighbor one hop delay later
    fn broadcast(&self, sched: &mut Scheduler, from: NodeId, adv: Advertisement) {
        let (neighbors, from_addr, hop_delay) = {
            let state = self.state.borrow();
            let Some(addr) = state.mesh_addrs.get(&from).copied() else {
                return;
            };
            let neighbors = state.mesh.get(&from).cloned().unwrap_or_default();
            (neighbors, addr, state.hop_delay)
        };
        for neighbor in neighbors {
            let net = self.clone();
            let adv = adv.clone();
            sched.schedule(hop_delay, move |s| {
                net.receive_advert(s, neighbor, from, from_addr, adv)
            });
        }
    }

    fn receive_advert(
        &self,
        sched: &mut Scheduler,
        at: NodeId,
        from: NodeId,
        from_addr: Addr,
        adv: Advertisement,
    ) {
        let forward = {
            let state = self.state.borrow();
            let Some(n) = state.nodes.get(&at) else {
                return;
            };
            // nodes without a proactive instance do not participate
            let Some(proactive) = n.protocols.proactive() else {
                return;
            };
            let result = proactive
                .borrow_mut()
                .handle_advertisement(&adv, from, from_addr, sched.now());
            result
        };

        if forward.is_some() {
            let now = sched.now();
            self.state.borrow_mut().events.log(
                now,
                Event::AdvertisementReceived {
                    node: at,
                    origin: adv.origin,
                    hops: adv.hops,
                },
            );
        }

        if let Some(flood) = forward {
            self.broadcast(sched, at, flood);
        }
    }

    // ========================================================================
    // Data plane
    // ========================================================================

    /// Inject a packet at its source node
    pub fn send(&self, sched: &mut Scheduler, from: NodeId, packet: Packet) {
        self.forward(sched, from, packet);
    }

    fn forward(&self, sched: &mut Scheduler, at: NodeId, packet: Packet) {
        enum Outcome {
            Deliver(Option<Rc<RefCell<TrafficSink>>>),
            Hop(NodeId, SimTime),
            Drop,
        }

        let outcome = {
            let state = self.state.borrow();
            let Some(node) = state.nodes.get(&at) else {
                return;
            };
            if state.addrs.get(&packet.dst) == Some(&at) {
                Outcome::Deliver(node.sink(packet.port))
            } else {
                match node.protocols.route(&packet.dst) {
                    None => Outcome::Drop,
                    Some(route) => {
                        let next_addr = if route.gateway.is_unspecified() {
                            packet.dst
                        } else {
                            route.gateway
                        };
                        match state.addrs.get(&next_addr) {
                            Some(next) if *next != at => Outcome::Hop(*next, state.hop_delay),
                            _ => Outcome::Drop,
                        }
                    }
                }
            }
        };

        let now = sched.now();
        match outcome {
            Outcome::Deliver(Some(sink)) => {
                sink.borrow_mut().on_arrival(now, &packet);
                self.state.borrow_mut().events.log(
                    now,
                    Event::PacketDelivered {
                        node: at,
                        port: packet.port,
                        size: packet.size,
                    },
                );
            }
            Outcome::Deliver(None) => {
                // local address but nothing listening on that port
                self.state.borrow_mut().events.log(
                    now,
                    Event::PacketDropped {
                        node: at,
                        dest: packet.dst,
                    },
                );
            }
            Outcome::Drop => {
                // a dropped packet produces no synchronous signal
                log::debug!("node {}: no route to {}, packet dropped", at, packet.dst);
                self.state.borrow_mut().events.log(
                    now,
                    Event::PacketDropped {
                        node: at,
                        dest: packet.dst,
                    },
                );
            }
            Outcome::Hop(next, hop_delay) => {
                self.state.borrow_mut().events.log(
                    now,
                    Event::PacketForwarded {
                        node: at,
                        dest: packet.dst,
                    },
                );
                let net = self.clone();
                sched.schedule(hop_delay, move |s| net.forward(s, next, packet));
            }
        }
    }

    // ========================================================================
    // Periodic dump hook
    // ========================================================================

    /// Every `every`, write the node's current routes and neighbor set to
    /// `out`, starting one period from now
    pub fn schedule_route_dump(
        &self,
        sched: &mut Scheduler,
        node: NodeId,
        every: SimTime,
        out: Rc<RefCell<dyn Write>>,
    ) {
        let net = self.clone();
        sched.schedule(every, move |s| net.run_route_dump(s, node, every, out));
    }

    fn run_route_dump(
        &self,
        sched: &mut Scheduler,
        node: NodeId,
        every: SimTime,
        out: Rc<RefCell<dyn Write>>,
    ) {
        {
            let state = self.state.borrow();
            let Some(n) = state.nodes.get(&node) else {
                return;
            };
            let mut w = out.borrow_mut();
            let _ = writeln!(w, "t={}us node {} routing table:", sched.now(), node);
            for route in n.protocols.current_routes() {
                let _ = writeln!(
                    w,
                    "  {} via {} if {} metric {}",
                    route.dest, route.gateway, route.interface, route.metric
                );
            }
            if let Some(proactive) = n.protocols.proactive() {
                let _ = writeln!(w, "  neighbors: {:?}", proactive.borrow().current_neighbors());
            }
        }
        let net = self.clone();
        sched.schedule(every, move |s| net.run_route_dump(s, node, every, out));
    }
}

// ============================================================================
// Simulated datagram socket
// ============================================================================

/// Connected datagram handle over the simulated data plane
pub struct SimSocket {
    net: SimNetwork,
    node: NodeId,
    local: Addr,
    remote: Addr,
    port: u16,
    open: bool,
}

impl SimSocket {
    pub fn connect(net: &SimNetwork, node: NodeId, local: Addr, remote: Addr, port: u16) -> Self {
        Self {
            net: net.clone(),
            node,
            local,
            remote,
            port,
            open: true,
        }
    }
}

impl DatagramSocket for SimSocket {
    fn send(&mut self, sched: &mut Scheduler, size: u32) {
        if !self.open {
            return;
        }
        let packet = Packet {
            src: self.local,
            dst: self.remote,
            port: self.port,
            size,
        };
        self.net.send(sched, self.node, packet);
    }

    fn close(&mut self) {
        self.open = false;
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

// One participating device: its routing stack and bound receive sinks.
// Node-scoped lifetime: created at network setup, dropped at teardown.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::mg_interface::NodeId;
use crate::mg_routing::RoutingProtocolList;
use crate::mg_traffic::TrafficSink;

pub struct Node {
    pub id: NodeId,

    /// Priority list of routing protocol instances, exclusively owned by
    /// this node. Never accessed cross-node; all cross-node effects travel
    /// as simulated messages.
    pub protocols: RoutingProtocolList,

    /// Receive sinks keyed by local port
    sinks: BTreeMap<u16, Rc<RefCell<TrafficSink>>>,
}

impl Node {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            protocols: RoutingProtocolList::new(),
            sinks: BTreeMap::new(),
        }
    }

    /// Bind a sink at a local port. Binding a port twice replaces the old
    /// sink.
    pub fn bind_sink(&mut self, port: u16, sink: Rc<RefCell<TrafficSink>>) {
        self.sinks.insert(port, sink);
    }

    pub(crate) fn sink(&self, port: u16) -> Option<Rc<RefCell<TrafficSink>>> {
        self.sinks.get(&port).map(Rc::clone)
    }
}

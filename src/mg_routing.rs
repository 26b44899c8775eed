// Routing protocol composite: the node-scoped priority list of routing
// protocol instances. Capability lookups go through the variant tag, so no
// run-time type identification is needed anywhere.

use std::cell::RefCell;
use std::rc::Rc;

use crate::mg_interface::{Addr, RouteEntry};
use crate::mg_proactive::ProactiveProtocol;
use crate::mg_static_routing::StaticRouting;

/// Capability tag of a routing protocol instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    /// Proactive advertisement-flooding protocol (gateway-capable)
    Proactive,
    /// Static route table
    Static,
}

/// A routing protocol instance installed on a node. Instances are shared
/// handles so setup code can keep configuring them after installation.
#[derive(Clone)]
pub enum ProtocolInstance {
    Proactive(Rc<RefCell<ProactiveProtocol>>),
    Static(Rc<RefCell<StaticRouting>>),
}

impl ProtocolInstance {
    pub fn kind(&self) -> ProtocolKind {
        match self {
            ProtocolInstance::Proactive(_) => ProtocolKind::Proactive,
            ProtocolInstance::Static(_) => ProtocolKind::Static,
        }
    }

    // Instance identity is handle identity: two clones of the same Rc are
    // the same instance, two separately created tables are not.
    fn same_instance(&self, other: &ProtocolInstance) -> bool {
        match (self, other) {
            (ProtocolInstance::Proactive(a), ProtocolInstance::Proactive(b)) => Rc::ptr_eq(a, b),
            (ProtocolInstance::Static(a), ProtocolInstance::Static(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn route(&self, dst: &Addr) -> Option<RouteEntry> {
        match self {
            ProtocolInstance::Proactive(p) => p.borrow().route(dst),
            ProtocolInstance::Static(s) => s.borrow().route(dst),
        }
    }

    pub fn current_routes(&self) -> Vec<RouteEntry> {
        match self {
            ProtocolInstance::Proactive(p) => p.borrow().current_routes(),
            ProtocolInstance::Static(s) => s.borrow().routes().to_vec(),
        }
    }
}

/// Errors raised while configuring routing on a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// The same protocol instance was installed twice on one composite
    DuplicateInstance,

    /// Redistribution was requested on a composite with no proactive
    /// instance installed
    NoGatewayProtocol,
}

/// Ordered set of (instance, priority) pairs owned by one node.
/// Higher priority wins when routes conflict; order is fixed at install
/// time.
pub struct RoutingProtocolList {
    // kept sorted by priority descending; equal priorities keep install order
    entries: Vec<(ProtocolInstance, i16)>,
}

impl RoutingProtocolList {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Install an instance at the given priority
    pub fn install(&mut self, instance: ProtocolInstance, priority: i16) -> Result<(), RoutingError> {
        if self.entries.iter().any(|(e, _)| e.same_instance(&instance)) {
            return Err(RoutingError::DuplicateInstance);
        }
        let pos = self
            .entries
            .iter()
            .position(|(_, p)| *p < priority)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, (instance, priority));
        Ok(())
    }

    /// First installed instance of the given kind, by descending priority.
    /// Absence is a normal outcome; callers must handle `None` explicitly.
    pub fn find_by_kind(&self, kind: ProtocolKind) -> Option<&ProtocolInstance> {
        self.entries
            .iter()
            .map(|(instance, _)| instance)
            .find(|instance| instance.kind() == kind)
    }

    /// Shared handle to the proactive (gateway-capable) instance, if any
    pub fn proactive(&self) -> Option<Rc<RefCell<ProactiveProtocol>>> {
        match self.find_by_kind(ProtocolKind::Proactive)? {
            ProtocolInstance::Proactive(p) => Some(Rc::clone(p)),
            _ => None,
        }
    }

    /// Data-plane query: first non-empty answer in priority order.
    /// `None` means no instance can route the destination (packet drop).
    pub fn route(&self, dst: &Addr) -> Option<RouteEntry> {
        self.entries
            .iter()
            .find_map(|(instance, _)| instance.route(dst))
    }

    /// Read-only snapshot of every member's routes, in priority order
    pub fn current_routes(&self) -> Vec<RouteEntry> {
        self.entries
            .iter()
            .flat_map(|(instance, _)| instance.current_routes())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Longest-prefix match over a set of route entries; ties broken by lowest
/// metric, then earliest entry. Shared by every table-shaped instance.
pub(crate) fn best_match<'a, I>(routes: I, dst: &Addr) -> Option<RouteEntry>
where
    I: IntoIterator<Item = &'a RouteEntry>,
{
    let mut best: Option<&RouteEntry> = None;
    for route in routes {
        if !route.dest.contains(dst) {
            continue;
        }
        let better = match best {
            None => true,
            Some(current) => {
                route.dest.prefix_len() > current.dest.prefix_len()
                    || (route.dest.prefix_len() == current.dest.prefix_len()
                        && route.metric < current.metric)
            }
        };
        if better {
            best = Some(route);
        }
    }
    best.copied()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mg_interface::{NetworkPrefix, IF_MESH};

    fn static_with_route(net: NetworkPrefix, gateway: Addr) -> Rc<RefCell<StaticRouting>> {
        let mut table = StaticRouting::new();
        table.add_network_route(net, gateway, IF_MESH, 1);
        Rc::new(RefCell::new(table))
    }

    fn test_net() -> NetworkPrefix {
        NetworkPrefix::new(Addr::from_segments([0x2001, 0, 2, 0, 0, 0, 0, 0]), 64)
    }

    #[test]
    fn test_install_rejects_duplicate_instance() {
        let mut list = RoutingProtocolList::new();
        let table = Rc::new(RefCell::new(StaticRouting::new()));

        assert!(list
            .install(ProtocolInstance::Static(Rc::clone(&table)), 0)
            .is_ok());
        assert_eq!(
            list.install(ProtocolInstance::Static(Rc::clone(&table)), 5),
            Err(RoutingError::DuplicateInstance)
        );

        // A distinct instance of the same kind installs fine
        let other = Rc::new(RefCell::new(StaticRouting::new()));
        assert!(list.install(ProtocolInstance::Static(other), 5).is_ok());
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_find_by_kind_on_empty_list_is_none() {
        let list = RoutingProtocolList::new();
        assert!(list.find_by_kind(ProtocolKind::Proactive).is_none());
        assert!(list.find_by_kind(ProtocolKind::Static).is_none());
        assert!(list.proactive().is_none());
        assert!(list.is_empty());
    }

    #[test]
    fn test_higher_priority_instance_wins_conflicts() {
        // Both instances can route the destination; the priority-10 one wins
        let net = test_net();
        let dst = Addr::from_segments([0x2001, 0, 2, 0, 0, 0, 0, 1]);

        let high = static_with_route(net, Addr(10));
        let low = static_with_route(net, Addr(20));

        let mut list = RoutingProtocolList::new();
        list.install(ProtocolInstance::Static(low), 0).unwrap();
        list.install(ProtocolInstance::Static(high), 10).unwrap();

        assert_eq!(list.route(&dst).unwrap().gateway, Addr(10));
    }

    #[test]
    fn test_route_falls_through_to_lower_priority() {
        let net = test_net();
        let dst = Addr::from_segments([0x2001, 0, 2, 0, 0, 0, 0, 1]);

        let empty = Rc::new(RefCell::new(StaticRouting::new()));
        let fallback = static_with_route(net, Addr(20));

        let mut list = RoutingProtocolList::new();
        list.install(ProtocolInstance::Static(empty), 10).unwrap();
        list.install(ProtocolInstance::Static(fallback), 0).unwrap();

        assert_eq!(list.route(&dst).unwrap().gateway, Addr(20));
    }

    #[test]
    fn test_no_instance_routes_means_none() {
        let mut list = RoutingProtocolList::new();
        list.install(
            ProtocolInstance::Static(Rc::new(RefCell::new(StaticRouting::new()))),
            0,
        )
        .unwrap();

        assert!(list.route(&Addr(7)).is_none());
    }

    #[test]
    fn test_equal_priority_keeps_install_order() {
        let net = test_net();
        let dst = Addr::from_segments([0x2001, 0, 2, 0, 0, 0, 0, 1]);

        let first = static_with_route(net, Addr(1));
        let second = static_with_route(net, Addr(2));

        let mut list = RoutingProtocolList::new();
        list.install(ProtocolInstance::Static(first), 5).unwrap();
        list.install(ProtocolInstance::Static(second), 5).unwrap();

        assert_eq!(list.route(&dst).unwrap().gateway, Addr(1));
    }

    #[test]
    fn test_current_routes_snapshot_in_priority_order() {
        let net = test_net();
        let high = static_with_route(net, Addr(10));
        let low = static_with_route(net, Addr(20));

        let mut list = RoutingProtocolList::new();
        list.install(ProtocolInstance::Static(low), 0).unwrap();
        list.install(ProtocolInstance::Static(high), 10).unwrap();

        let snapshot = list.current_routes();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].gateway, Addr(10));
        assert_eq!(snapshot[1].gateway, Addr(20));
    }
}

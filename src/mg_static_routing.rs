// Static route table instance. Installed in a node's routing composite
// (typically at the lowest priority), and also usable standalone as the
// table handed to a gateway redistributor via a table association.

use crate::mg_interface::{Addr, InterfaceId, NetworkPrefix, RouteEntry, RouteMetric};
use crate::mg_routing::best_match;

pub struct StaticRouting {
    routes: Vec<RouteEntry>,
}

impl StaticRouting {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Add a route to a destination network. Pass `Addr::UNSPECIFIED` as
    /// gateway for an on-link route (deliver directly out of `interface`).
    pub fn add_network_route(
        &mut self,
        dest: NetworkPrefix,
        gateway: Addr,
        interface: InterfaceId,
        metric: RouteMetric,
    ) {
        self.routes.push(RouteEntry {
            dest,
            gateway,
            interface,
            metric,
        });
    }

    /// Remove all routes to exactly this destination network.
    /// Returns true if anything was removed.
    pub fn remove_network_route(&mut self, dest: &NetworkPrefix) -> bool {
        let before = self.routes.len();
        self.routes.retain(|r| r.dest != *dest);
        self.routes.len() != before
    }

    /// Longest-prefix match; ties broken by lowest metric, then insertion
    /// order. `None` means this instance declines the destination.
    pub fn route(&self, dst: &Addr) -> Option<RouteEntry> {
        best_match(self.routes.iter(), dst)
    }

    /// Read-only view of all entries, in insertion order
    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mg_interface::IF_MESH;

    fn prefix(segments: [u16; 8], len: u8) -> NetworkPrefix {
        NetworkPrefix::new(Addr::from_segments(segments), len)
    }

    #[test]
    fn test_longest_prefix_wins() {
        let mut table = StaticRouting::new();
        let wide = prefix([0x2001, 0, 0, 0, 0, 0, 0, 0], 32);
        let narrow = prefix([0x2001, 0, 2, 0, 0, 0, 0, 0], 64);
        table.add_network_route(wide, Addr(10), IF_MESH, 1);
        table.add_network_route(narrow, Addr(20), 1, 1);

        let dst = Addr::from_segments([0x2001, 0, 2, 0, 0, 0, 0, 7]);
        let route = table.route(&dst).unwrap();
        assert_eq!(route.dest, narrow);
        assert_eq!(route.gateway, Addr(20));

        // An address only the wide prefix covers falls back to it
        let other = Addr::from_segments([0x2001, 0, 9, 0, 0, 0, 0, 7]);
        assert_eq!(table.route(&other).unwrap().dest, wide);
    }

    #[test]
    fn test_metric_breaks_equal_prefix_ties() {
        let mut table = StaticRouting::new();
        let net = prefix([0x2001, 0, 2, 0, 0, 0, 0, 0], 64);
        table.add_network_route(net, Addr(10), IF_MESH, 5);
        table.add_network_route(net, Addr(20), IF_MESH, 2);

        let dst = Addr::from_segments([0x2001, 0, 2, 0, 0, 0, 0, 1]);
        assert_eq!(table.route(&dst).unwrap().gateway, Addr(20));
    }

    #[test]
    fn test_first_inserted_breaks_full_ties() {
        let mut table = StaticRouting::new();
        let net = prefix([0x2001, 0, 2, 0, 0, 0, 0, 0], 64);
        table.add_network_route(net, Addr(10), IF_MESH, 1);
        table.add_network_route(net, Addr(20), IF_MESH, 1);

        let dst = Addr::from_segments([0x2001, 0, 2, 0, 0, 0, 0, 1]);
        assert_eq!(table.route(&dst).unwrap().gateway, Addr(10));
    }

    #[test]
    fn test_no_match_declines() {
        let mut table = StaticRouting::new();
        table.add_network_route(prefix([0x2001, 0, 2, 0, 0, 0, 0, 0], 64), Addr(10), IF_MESH, 1);

        let dst = Addr::from_segments([0x2001, 0, 3, 0, 0, 0, 0, 1]);
        assert!(table.route(&dst).is_none());
    }

    #[test]
    fn test_default_route_matches_everything() {
        let mut table = StaticRouting::new();
        table.add_network_route(prefix([0, 0, 0, 0, 0, 0, 0, 0], 0), Addr(99), IF_MESH, 1);

        assert_eq!(table.route(&Addr(1)).unwrap().gateway, Addr(99));
        assert_eq!(table.route(&Addr(u128::MAX)).unwrap().gateway, Addr(99));
    }

    #[test]
    fn test_remove_network_route() {
        let mut table = StaticRouting::new();
        let net = prefix([0x2001, 0, 2, 0, 0, 0, 0, 0], 64);
        table.add_network_route(net, Addr(10), IF_MESH, 1);
        assert_eq!(table.len(), 1);

        assert!(table.remove_network_route(&net));
        assert!(table.is_empty());
        assert!(!table.remove_network_route(&net));
    }
}

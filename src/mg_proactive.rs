// Proactive advertisement-flooding protocol instance.
//
// Every participating node periodically floods an advertisement carrying the
// networks it originates plus, on a gateway, the externally reachable
// networks supplied by its redistributor. Receivers keep one record per
// origin, replaced wholesale whenever a newer sequence number arrives, and
// derive their route table from those records. Wholesale replacement is the
// invariant that keeps withdrawn entries from lingering.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::mg_interface::{
    millis, secs, Addr, NetworkPrefix, NodeId, RouteEntry, RouteMetric, SimTime, IF_MESH,
};
use crate::mg_redistribute::AssociationSet;
use crate::mg_routing::best_match;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the proactive protocol
#[derive(Debug, Clone)]
pub struct ProactiveConfig {
    /// Interval between advertisement cycles
    pub advert_interval: SimTime,

    /// Maximum uniform jitter subtracted from each cycle's delay
    pub advert_jitter: SimTime,

    /// Origin and neighbor records expire after
    /// `validity_factor * advert_interval` without being refreshed
    pub validity_factor: u32,
}

impl Default for ProactiveConfig {
    fn default() -> Self {
        Self {
            advert_interval: secs(2),
            advert_jitter: millis(100),
            validity_factor: 3,
        }
    }
}

// ============================================================================
// Advertisement flood message
// ============================================================================

/// One advertisement as it travels the mesh. `hops` is incremented on each
/// re-flood, so a receiver knows its distance to the origin.
#[derive(Debug, Clone)]
pub struct Advertisement {
    pub origin: NodeId,
    pub seq: u16,
    pub hops: u8,

    /// Networks the origin reaches inside the protocol domain
    pub prefixes: Vec<(NetworkPrefix, RouteMetric)>,

    /// Externally reachable networks the origin redistributes (gateway role)
    pub external: Vec<NetworkPrefix>,
}

/// Freshest advertisement state known for one origin
struct OriginRecord {
    seq: u16,
    hops: u8,
    /// Neighbor we heard the freshest copy from (our next hop toward origin)
    via: Addr,
    prefixes: Vec<(NetworkPrefix, RouteMetric)>,
    external: Vec<NetworkPrefix>,
    heard_at: SimTime,
}

struct NeighborRecord {
    addr: Addr,
    last_heard: SimTime,
}

// 16-bit sequence freshness with wraparound
fn seq_newer(a: u16, b: u16) -> bool {
    a != b && a.wrapping_sub(b) < 0x8000
}

// ============================================================================
// Protocol instance
// ============================================================================

pub struct ProactiveProtocol {
    node: NodeId,
    config: ProactiveConfig,

    /// Networks this node originates into the protocol domain
    own_prefixes: Vec<NetworkPrefix>,

    /// Freshest advertisement per origin (BTreeMap = deterministic iteration)
    origins: BTreeMap<NodeId, OriginRecord>,

    /// Directly heard peers
    neighbors: BTreeMap<NodeId, NeighborRecord>,

    /// External association source installed by a redistributor, if this
    /// instance acts as gateway. Read live on every cycle.
    associations: Option<Rc<RefCell<AssociationSet>>>,

    /// Our own advertisement sequence number
    seq: u16,

    /// Route table derived from `origins`, rebuilt on change
    routes: Vec<RouteEntry>,

    /// Emission jitter source (seeded for reproducibility)
    rng: StdRng,
}

impl ProactiveProtocol {
    pub fn new(node: NodeId, seed: u64) -> Self {
        Self::with_config(node, ProactiveConfig::default(), seed)
    }

    pub fn with_config(node: NodeId, config: ProactiveConfig, seed: u64) -> Self {
        Self {
            node,
            config,
            own_prefixes: Vec::new(),
            origins: BTreeMap::new(),
            neighbors: BTreeMap::new(),
            associations: None,
            seq: 0,
            routes: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node
    }

    pub fn config(&self) -> &ProactiveConfig {
        &self.config
    }

    /// Declare a network this node originates (its own attachment)
    pub fn add_local_prefix(&mut self, prefix: NetworkPrefix) {
        if !self.own_prefixes.contains(&prefix) {
            self.own_prefixes.push(prefix);
        }
    }

    pub(crate) fn set_association_source(&mut self, source: Rc<RefCell<AssociationSet>>) {
        self.associations = Some(source);
    }

    /// Delay until the next advertisement cycle (interval minus jitter)
    pub fn next_cycle_delay(&mut self) -> SimTime {
        let jitter = if self.config.advert_jitter == 0 {
            0
        } else {
            self.rng.gen_range(0..self.config.advert_jitter)
        };
        self.config.advert_interval.saturating_sub(jitter).max(1)
    }

    /// Build this cycle's advertisement: own prefixes plus the live external
    /// association set. Bumps the sequence number.
    pub fn make_advertisement(&mut self, now: SimTime) -> Advertisement {
        self.purge_expired(now);
        self.seq = self.seq.wrapping_add(1);

        let external = match &self.associations {
            Some(source) => source.borrow().current(),
            None => Vec::new(),
        };

        Advertisement {
            origin: self.node,
            seq: self.seq,
            hops: 0,
            prefixes: self.own_prefixes.iter().map(|p| (*p, 0)).collect(),
            external,
        }
    }

    /// Process a received flood. Always refreshes the sender as a neighbor.
    /// Returns a hop-incremented copy to re-flood when the advertisement was
    /// fresh (newer sequence); a same-sequence shorter path updates state but
    /// is not re-flooded.
    pub fn handle_advertisement(
        &mut self,
        adv: &Advertisement,
        from_node: NodeId,
        from_addr: Addr,
        now: SimTime,
    ) -> Option<Advertisement> {
        self.neighbors.insert(
            from_node,
            NeighborRecord {
                addr: from_addr,
                last_heard: now,
            },
        );

        // our own floods come back around the mesh
        if adv.origin == self.node {
            return None;
        }

        let hops = adv.hops.saturating_add(1);
        let (fresh, better_path) = match self.origins.get(&adv.origin) {
            None => (true, false),
            Some(record) => (
                seq_newer(adv.seq, record.seq),
                record.seq == adv.seq && hops < record.hops,
            ),
        };
        if !fresh && !better_path {
            return None;
        }

        log::debug!(
            "node {}: origin {} seq {} via {} ({} hops, {} prefixes, {} external)",
            self.node,
            adv.origin,
            adv.seq,
            from_addr,
            hops,
            adv.prefixes.len(),
            adv.external.len()
        );

        self.origins.insert(
            adv.origin,
            OriginRecord {
                seq: adv.seq,
                hops,
                via: from_addr,
                prefixes: adv.prefixes.clone(),
                external: adv.external.clone(),
                heard_at: now,
            },
        );
        self.rebuild_routes();

        if fresh {
            let mut forward = adv.clone();
            forward.hops = hops;
            Some(forward)
        } else {
            None
        }
    }

    fn rebuild_routes(&mut self) {
        let mut routes = Vec::new();
        for record in self.origins.values() {
            for (prefix, metric) in &record.prefixes {
                routes.push(RouteEntry {
                    dest: *prefix,
                    gateway: record.via,
                    interface: IF_MESH,
                    metric: metric + record.hops as RouteMetric,
                });
            }
            for prefix in &record.external {
                routes.push(RouteEntry {
                    dest: *prefix,
                    gateway: record.via,
                    interface: IF_MESH,
                    metric: record.hops as RouteMetric,
                });
            }
        }
        self.routes = routes;
    }

    /// Drop origin and neighbor records not refreshed within the validity
    /// window
    pub fn purge_expired(&mut self, now: SimTime) {
        let validity = self.config.advert_interval * self.config.validity_factor as SimTime;
        self.neighbors
            .retain(|_, record| record.last_heard + validity > now);

        let before = self.origins.len();
        self.origins
            .retain(|_, record| record.heard_at + validity > now);
        if self.origins.len() != before {
            self.rebuild_routes();
        }
    }

    /// Longest-prefix match over the derived route table
    pub fn route(&self, dst: &Addr) -> Option<RouteEntry> {
        best_match(self.routes.iter(), dst)
    }

    /// Read-only snapshot of the derived route table
    pub fn current_routes(&self) -> Vec<RouteEntry> {
        self.routes.clone()
    }

    /// Read-only snapshot of the directly heard peers
    pub fn current_neighbors(&self) -> Vec<(NodeId, Addr)> {
        self.neighbors
            .iter()
            .map(|(id, record)| (*id, record.addr))
            .collect()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

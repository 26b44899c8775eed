// External route redistribution for a gateway node.
//
// A proactive protocol only floods the networks its participants originate
// from neighbor exchange; a node bridging to an out-of-protocol network has
// no other way to make that reachability visible. The redistributor owns the
// set of externally reachable networks and feeds it into the gateway
// instance's advertisement cycle, either as a live view of a whole static
// table or as explicitly added entries.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexSet;

use crate::mg_interface::NetworkPrefix;
use crate::mg_proactive::ProactiveProtocol;
use crate::mg_routing::{RoutingError, RoutingProtocolList};
use crate::mg_static_routing::StaticRouting;

/// Errors raised while configuring redistribution on a gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedistributionError {
    /// A table association and incremental associations cannot coexist on
    /// one gateway
    AssociationModeConflict,
}

/// The externally-advertised network set owned by a gateway's redistributor.
/// A gateway uses at most one representation at a time.
pub enum AssociationSet {
    /// Nothing attached; advertisement cycles carry no external entries
    None,

    /// Reference to a whole static route table. Every entry is advertised
    /// for as long as the reference stays attached; the table is re-read on
    /// each cycle (live view, not a snapshot).
    Table(Rc<RefCell<StaticRouting>>),

    /// Explicitly built set, append-only, insertion-ordered
    Incremental(IndexSet<NetworkPrefix>),
}

impl AssociationSet {
    /// The networks the next advertisement cycle will carry
    pub fn current(&self) -> Vec<NetworkPrefix> {
        match self {
            AssociationSet::None => Vec::new(),
            AssociationSet::Table(table) => {
                table.borrow().routes().iter().map(|r| r.dest).collect()
            }
            AssociationSet::Incremental(entries) => entries.iter().copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            AssociationSet::None => true,
            AssociationSet::Table(table) => table.borrow().is_empty(),
            AssociationSet::Incremental(entries) => entries.is_empty(),
        }
    }
}

/// Redistribution controller bound to one gateway-designated proactive
/// instance
pub struct Redistributor {
    gateway: Rc<RefCell<ProactiveProtocol>>,
    associations: Rc<RefCell<AssociationSet>>,
}

impl Redistributor {
    /// Designate the composite's proactive instance as gateway and bind a
    /// redistributor to it. Fails with `RoutingError::NoGatewayProtocol`
    /// when no proactive instance is installed - a caller-configuration
    /// error, surfaced synchronously.
    pub fn attach(protocols: &RoutingProtocolList) -> Result<Self, RoutingError> {
        let gateway = protocols
            .proactive()
            .ok_or(RoutingError::NoGatewayProtocol)?;
        let associations = Rc::new(RefCell::new(AssociationSet::None));
        gateway
            .borrow_mut()
            .set_association_source(Rc::clone(&associations));
        Ok(Self {
            gateway,
            associations,
        })
    }

    /// The gateway instance this redistributor feeds
    pub fn gateway(&self) -> Rc<RefCell<ProactiveProtocol>> {
        Rc::clone(&self.gateway)
    }

    /// Attach a whole route table. Every entry present at each advertisement
    /// cycle is advertised; later table changes are picked up on the next
    /// cycle. Rejected while incremental associations exist.
    pub fn set_table_association(
        &mut self,
        table: Rc<RefCell<StaticRouting>>,
    ) -> Result<(), RedistributionError> {
        let mut set = self.associations.borrow_mut();
        if let AssociationSet::Incremental(entries) = &*set {
            if !entries.is_empty() {
                return Err(RedistributionError::AssociationModeConflict);
            }
        }
        *set = AssociationSet::Table(table);
        Ok(())
    }

    /// Detach the table association, if one is attached. The next cycle
    /// advertises nothing until a new representation is attached.
    pub fn clear_table_association(&mut self) {
        let mut set = self.associations.borrow_mut();
        if let AssociationSet::Table(_) = &*set {
            *set = AssociationSet::None;
        }
    }

    /// Add one externally reachable network. Adding the exact same network
    /// twice is a no-op, not an error. Entries cannot be individually
    /// removed. Rejected while a table association is attached.
    pub fn add_association(&mut self, network: NetworkPrefix) -> Result<(), RedistributionError> {
        let mut set = self.associations.borrow_mut();
        match &mut *set {
            AssociationSet::Table(_) => Err(RedistributionError::AssociationModeConflict),
            AssociationSet::Incremental(entries) => {
                entries.insert(network);
                Ok(())
            }
            AssociationSet::None => {
                let mut entries = IndexSet::new();
                entries.insert(network);
                *set = AssociationSet::Incremental(entries);
                Ok(())
            }
        }
    }

    /// The set the next advertisement cycle will carry
    pub fn current_associations(&self) -> Vec<NetworkPrefix> {
        self.associations.borrow().current()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mg_interface::{secs, Addr};
    use crate::mg_routing::ProtocolInstance;

    fn prefix(group: u16) -> NetworkPrefix {
        NetworkPrefix::new(Addr::from_segments([0x2001, 0, group, 0, 0, 0, 0, 0]), 64)
    }

    fn gateway_composite() -> (RoutingProtocolList, Rc<RefCell<ProactiveProtocol>>) {
        let proactive = Rc::new(RefCell::new(ProactiveProtocol::new(1, 7)));
        let mut list = RoutingProtocolList::new();
        list.install(ProtocolInstance::Proactive(Rc::clone(&proactive)), 10)
            .unwrap();
        list.install(
            ProtocolInstance::Static(Rc::new(RefCell::new(StaticRouting::new()))),
            0,
        )
        .unwrap();
        (list, proactive)
    }

    #[test]
    fn test_attach_without_proactive_instance_fails() {
        let mut list = RoutingProtocolList::new();
        list.install(
            ProtocolInstance::Static(Rc::new(RefCell::new(StaticRouting::new()))),
            0,
        )
        .unwrap();

        match Redistributor::attach(&list) {
            Err(RoutingError::NoGatewayProtocol) => {}
            _ => panic!("expected NoGatewayProtocol"),
        }
    }

    #[test]
    fn test_add_association_is_idempotent() {
        let (list, _) = gateway_composite();
        let mut redist = Redistributor::attach(&list).unwrap();

        redist.add_association(prefix(2)).unwrap();
        redist.add_association(prefix(2)).unwrap();
        redist.add_association(prefix(3)).unwrap();

        // exactly once each, in insertion order
        assert_eq!(redist.current_associations(), vec![prefix(2), prefix(3)]);
    }

    #[test]
    fn test_advertisement_cycle_carries_associations() {
        let (list, proactive) = gateway_composite();
        let mut redist = Redistributor::attach(&list).unwrap();
        redist.add_association(prefix(2)).unwrap();

        let advertisement = proactive.borrow_mut().make_advertisement(secs(1));
        assert_eq!(advertisement.external, vec![prefix(2)]);
    }

    #[test]
    fn test_table_association_is_a_live_view() {
        let (list, proactive) = gateway_composite();
        let mut redist = Redistributor::attach(&list).unwrap();

        let table = Rc::new(RefCell::new(StaticRouting::new()));
        table
            .borrow_mut()
            .add_network_route(prefix(2), Addr::UNSPECIFIED, 1, 1);
        redist.set_table_association(Rc::clone(&table)).unwrap();
        assert_eq!(redist.current_associations(), vec![prefix(2)]);

        // mutating the referenced table changes the next cycle, no re-attach
        table
            .borrow_mut()
            .add_network_route(prefix(3), Addr::UNSPECIFIED, 1, 1);
        let advertisement = proactive.borrow_mut().make_advertisement(secs(1));
        assert_eq!(advertisement.external, vec![prefix(2), prefix(3)]);
    }

    #[test]
    fn test_reattaching_a_different_table_drops_old_entries() {
        let (list, _) = gateway_composite();
        let mut redist = Redistributor::attach(&list).unwrap();

        let first = Rc::new(RefCell::new(StaticRouting::new()));
        first
            .borrow_mut()
            .add_network_route(prefix(2), Addr::UNSPECIFIED, 1, 1);
        redist.set_table_association(first).unwrap();

        let second = Rc::new(RefCell::new(StaticRouting::new()));
        second
            .borrow_mut()
            .add_network_route(prefix(9), Addr::UNSPECIFIED, 1, 1);
        redist.clear_table_association();
        redist.set_table_association(second).unwrap();

        assert_eq!(redist.current_associations(), vec![prefix(9)]);
    }

    #[test]
    fn test_mode_conflict_is_rejected_both_ways() {
        let (list, _) = gateway_composite();

        // incremental first, then table
        let mut redist = Redistributor::attach(&list).unwrap();
        redist.add_association(prefix(2)).unwrap();
        let table = Rc::new(RefCell::new(StaticRouting::new()));
        assert_eq!(
            redist.set_table_association(Rc::clone(&table)),
            Err(RedistributionError::AssociationModeConflict)
        );

        // table first, then incremental
        let (list, _) = gateway_composite();
        let mut redist = Redistributor::attach(&list).unwrap();
        redist.set_table_association(table).unwrap();
        assert_eq!(
            redist.add_association(prefix(2)),
            Err(RedistributionError::AssociationModeConflict)
        );
    }

    #[test]
    fn test_clear_table_then_incremental_is_allowed() {
        let (list, _) = gateway_composite();
        let mut redist = Redistributor::attach(&list).unwrap();

        let table = Rc::new(RefCell::new(StaticRouting::new()));
        table
            .borrow_mut()
            .add_network_route(prefix(2), Addr::UNSPECIFIED, 1, 1);
        redist.set_table_association(table).unwrap();
        redist.clear_table_association();

        assert!(redist.current_associations().is_empty());
        redist.add_association(prefix(5)).unwrap();
        assert_eq!(redist.current_associations(), vec![prefix(5)]);
    }

    #[test]
    fn test_empty_table_association_advertises_nothing() {
        let (list, proactive) = gateway_composite();
        let mut redist = Redistributor::attach(&list).unwrap();
        redist
            .set_table_association(Rc::new(RefCell::new(StaticRouting::new())))
            .unwrap();

        let advertisement = proactive.borrow_mut().make_advertisement(secs(1));
        assert!(advertisement.external.is_empty());
        assert_eq!(redist.gateway().borrow().node_id(), 1);
    }

    #[test]
    fn test_association_set_is_empty() {
        assert!(AssociationSet::None.is_empty());

        let mut entries = IndexSet::new();
        entries.insert(prefix(2));
        assert!(!AssociationSet::Incremental(entries).is_empty());

        assert!(AssociationSet::Table(Rc::new(RefCell::new(StaticRouting::new()))).is_empty());
    }
}

// Gateway Redistribution Scenario Statistics

use std::cell::RefCell;
use std::rc::Rc;

use log::info;
use mg_rust::{Event, EventSink, SimTime};

// ============================================================================
// Live counters
// ============================================================================

/// Counters accumulated from simulation events while a scenario runs
#[derive(Debug, Default, Clone)]
pub struct DeliveryStats {
    pub adverts_sent: u32,
    pub adverts_accepted: u32,
    pub forwarded: u32,
    pub delivered: u32,
    pub dropped: u32,
    pub first_delivery: Option<SimTime>,
}

impl DeliveryStats {
    pub fn shared() -> Rc<RefCell<DeliveryStats>> {
        Rc::new(RefCell::new(DeliveryStats::default()))
    }
}

/// Event sink adapter feeding [`DeliveryStats`]
pub struct StatsSink {
    stats: Rc<RefCell<DeliveryStats>>,
}

impl StatsSink {
    pub fn new(stats: Rc<RefCell<DeliveryStats>>) -> Self {
        Self { stats }
    }
}

impl EventSink for StatsSink {
    fn log(&mut self, time: SimTime, event: Event) {
        let mut stats = self.stats.borrow_mut();
        match event {
            Event::AdvertisementSent { .. } => stats.adverts_sent += 1,
            Event::AdvertisementReceived { .. } => stats.adverts_accepted += 1,
            Event::PacketForwarded { .. } => stats.forwarded += 1,
            Event::PacketDelivered { .. } => {
                stats.delivered += 1;
                if stats.first_delivery.is_none() {
                    stats.first_delivery = Some(time);
                }
            }
            Event::PacketDropped { .. } => stats.dropped += 1,
        }
    }
}

// ============================================================================
// Final result
// ============================================================================

/// Outcome of one scenario run
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub seed_used: u64,
    pub sent: u32,
    pub received: u32,
    pub delivered: u32,
    pub dropped: u32,
    pub forwarded: u32,
    pub adverts_sent: u32,
    pub adverts_accepted: u32,
    pub first_delivery: Option<SimTime>,
    pub source_routes: usize,
    pub gateway_neighbors: usize,
}

impl ScenarioResult {
    pub fn log_summary(&self) {
        info!("seed used: {}", self.seed_used);
        info!(
            "packets: sent {} received {} delivered {} dropped {} forwarded {}",
            self.sent, self.received, self.delivered, self.dropped, self.forwarded
        );
        match self.first_delivery {
            Some(time) => info!("first delivery at {:.3}s", time as f64 / 1e6),
            None => info!("no packet was ever delivered"),
        }
        info!(
            "adverts sent: {} accepted: {}, source route entries: {}, gateway neighbors: {}",
            self.adverts_sent, self.adverts_accepted, self.source_routes, self.gateway_neighbors
        );
    }
}

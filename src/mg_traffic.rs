// Deterministic traffic source/sink pair. The generator is an unconditional
// geometric countdown - no backoff, no flow control - so end-to-end delivery
// failures are attributable to the routing layer alone.

use std::cell::RefCell;
use std::rc::Rc;

use crate::mg_interface::SimTime;
use crate::mg_network::Packet;
use crate::mg_scheduler::Scheduler;

/// Narrow transport contract consumed by the traffic layer. The simulator's
/// implementation lives in `mg_network`; tests substitute mocks.
pub trait DatagramSocket {
    /// Send one payload of `size` bytes toward the connected remote
    fn send(&mut self, sched: &mut Scheduler, size: u32);

    /// Release the handle; further sends are a no-op
    fn close(&mut self);
}

// ============================================================================
// Traffic generator state machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// Will fire again; `remaining` payloads left to send
    Armed { remaining: u32 },

    /// Countdown finished and the socket released. Terminal.
    Closed,
}

impl GeneratorState {
    pub fn is_closed(&self) -> bool {
        matches!(self, GeneratorState::Closed)
    }
}

/// Fixed-size, fixed-interval, fixed-count packet source. Each firing sends
/// one payload and re-arms through the scheduler queue; the last firing
/// closes the socket and the generator becomes inert.
pub struct TrafficGenerator {
    socket: Box<dyn DatagramSocket>,
    payload_size: u32,
    interval: SimTime,
    state: GeneratorState,
    sent: u32,
}

impl TrafficGenerator {
    /// A zero count starts (and stays) in `Closed` without ever touching the
    /// socket.
    pub fn new(
        socket: Box<dyn DatagramSocket>,
        payload_size: u32,
        count: u32,
        interval: SimTime,
    ) -> Self {
        let state = if count > 0 {
            GeneratorState::Armed { remaining: count }
        } else {
            GeneratorState::Closed
        };
        Self {
            socket,
            payload_size,
            interval,
            state,
            sent: 0,
        }
    }

    /// Schedule the first firing at absolute time `start` (not one interval
    /// after creation).
    pub fn start(generator: Rc<RefCell<TrafficGenerator>>, sched: &mut Scheduler, start: SimTime) {
        sched.schedule_at(start, move |s| Self::fire(generator, s));
    }

    fn fire(generator: Rc<RefCell<TrafficGenerator>>, sched: &mut Scheduler) {
        let rearm_after = {
            let mut gen = generator.borrow_mut();
            match gen.state {
                GeneratorState::Armed { remaining } => {
                    let size = gen.payload_size;
                    gen.socket.send(sched, size);
                    gen.sent += 1;
                    if remaining > 1 {
                        gen.state = GeneratorState::Armed {
                            remaining: remaining - 1,
                        };
                        Some(gen.interval)
                    } else {
                        gen.state = GeneratorState::Closed;
                        gen.socket.close();
                        None
                    }
                }
                GeneratorState::Closed => None,
            }
        };

        if let Some(interval) = rearm_after {
            let next = Rc::clone(&generator);
            sched.schedule(interval, move |s| Self::fire(next, s));
        }
    }

    pub fn state(&self) -> GeneratorState {
        self.state
    }

    /// Payloads sent so far
    pub fn sent(&self) -> u32 {
        self.sent
    }
}

// ============================================================================
// Traffic sink
// ============================================================================

/// Passive arrival counter. Bound once, then invoked per delivered payload
/// for the life of the simulation; nothing flows back to the generator.
pub struct TrafficSink {
    received: u32,
    bytes: u64,
    last_arrival: Option<SimTime>,
}

impl TrafficSink {
    pub fn new() -> Self {
        Self {
            received: 0,
            bytes: 0,
            last_arrival: None,
        }
    }

    /// Invoked once per delivered payload, in arrival order
    pub fn on_arrival(&mut self, time: SimTime, packet: &Packet) {
        self.received += 1;
        self.bytes += packet.size as u64;
        self.last_arrival = Some(time);
    }

    pub fn received(&self) -> u32 {
        self.received
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn last_arrival(&self) -> Option<SimTime> {
        self.last_arrival
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mg_interface::{secs, Addr};

    struct MockSocket {
        sent_at: Rc<RefCell<Vec<SimTime>>>,
        closed: Rc<RefCell<bool>>,
    }

    impl DatagramSocket for MockSocket {
        fn send(&mut self, sched: &mut Scheduler, _size: u32) {
            self.sent_at.borrow_mut().push(sched.now());
        }

        fn close(&mut self) {
            *self.closed.borrow_mut() = true;
        }
    }

    fn mock_generator(
        count: u32,
        interval: SimTime,
    ) -> (
        Rc<RefCell<TrafficGenerator>>,
        Rc<RefCell<Vec<SimTime>>>,
        Rc<RefCell<bool>>,
    ) {
        let sent_at = Rc::new(RefCell::new(Vec::new()));
        let closed = Rc::new(RefCell::new(false));
        let socket = MockSocket {
            sent_at: Rc::clone(&sent_at),
            closed: Rc::clone(&closed),
        };
        let generator = Rc::new(RefCell::new(TrafficGenerator::new(
            Box::new(socket),
            1000,
            count,
            interval,
        )));
        (generator, sent_at, closed)
    }

    #[test]
    fn test_fires_count_times_then_closes() {
        let (generator, sent_at, closed) = mock_generator(3, secs(1));
        let mut sched = Scheduler::new();

        TrafficGenerator::start(Rc::clone(&generator), &mut sched, secs(1));
        sched.run(secs(10));

        // fires at 1s, 2s, 3s - and never a fourth time
        assert_eq!(*sent_at.borrow(), vec![secs(1), secs(2), secs(3)]);
        assert!(generator.borrow().state().is_closed());
        assert_eq!(generator.borrow().sent(), 3);
        assert!(*closed.borrow());
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn test_single_shot_closes_after_first_firing() {
        let (generator, sent_at, closed) = mock_generator(1, secs(1));
        let mut sched = Scheduler::new();

        TrafficGenerator::start(Rc::clone(&generator), &mut sched, secs(5));
        sched.run(secs(10));

        assert_eq!(*sent_at.borrow(), vec![secs(5)]);
        assert!(*closed.borrow());
    }

    #[test]
    fn test_zero_count_is_born_closed() {
        let (generator, sent_at, closed) = mock_generator(0, secs(1));
        let mut sched = Scheduler::new();

        TrafficGenerator::start(Rc::clone(&generator), &mut sched, secs(1));
        sched.run(secs(10));

        assert!(sent_at.borrow().is_empty());
        assert!(generator.borrow().state().is_closed());
        // a generator that never armed never owned live socket state
        assert!(!*closed.borrow());
    }

    #[test]
    fn test_first_firing_at_explicit_start_offset() {
        let (generator, sent_at, _) = mock_generator(2, secs(3));
        let mut sched = Scheduler::new();

        // start offset differs from the interval
        TrafficGenerator::start(generator, &mut sched, secs(10));
        sched.run(secs(20));

        assert_eq!(*sent_at.borrow(), vec![secs(10), secs(13)]);
    }

    #[test]
    fn test_sink_counts_arrivals_in_order() {
        let mut sink = TrafficSink::new();
        let packet = Packet {
            src: Addr(1),
            dst: Addr(2),
            port: 80,
            size: 1000,
        };

        assert_eq!(sink.received(), 0);
        sink.on_arrival(secs(1), &packet);
        sink.on_arrival(secs(2), &packet);

        assert_eq!(sink.received(), 2);
        assert_eq!(sink.bytes(), 2000);
        assert_eq!(sink.last_arrival(), Some(secs(2)));
    }
}

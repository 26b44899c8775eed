// Discrete-event scheduler: the single authoritative source of simulated
// time. All component logic runs as callables dispatched one at a time in
// non-decreasing time order; callables re-arm follow-up work by scheduling
// further events (recursion through the queue, not the call stack).

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use hashbrown::HashSet;

use crate::mg_interface::SimTime;

pub type EventId = u64;

/// Handle for a scheduled event. Passing it to [`Scheduler::cancel`] turns
/// the pending firing into a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventHandle {
    id: EventId,
}

type Callback = Box<dyn FnOnce(&mut Scheduler)>;

struct Pending {
    time: SimTime,
    seq: u64,
    callback: Callback,
}

// Ordering uses (time, seq) only; seq is the submission counter, which gives
// the FIFO tie-break for equal timestamps.
impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time.cmp(&other.time).then(self.seq.cmp(&other.seq))
    }
}

pub struct Scheduler {
    queue: BinaryHeap<Reverse<Pending>>,
    cancelled: HashSet<EventId>,
    now: SimTime,
    next_seq: u64,
    stop_requested: bool,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            cancelled: HashSet::new(),
            now: 0,
            next_seq: 0,
            stop_requested: false,
        }
    }

    /// Current simulated time
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Number of events still pending dispatch
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Schedule `callback` to fire `delay` after the current time
    pub fn schedule<F>(&mut self, delay: SimTime, callback: F) -> EventHandle
    where
        F: FnOnce(&mut Scheduler) + 'static,
    {
        let at = self.now + delay;
        self.schedule_at(at, callback)
    }

    /// Schedule `callback` at an absolute time. A timestamp in the past is
    /// clamped to the current time and fires on the next dispatch.
    pub fn schedule_at<F>(&mut self, at: SimTime, callback: F) -> EventHandle
    where
        F: FnOnce(&mut Scheduler) + 'static,
    {
        let time = at.max(self.now);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Pending {
            time,
            seq,
            callback: Box::new(callback),
        }));
        EventHandle { id: seq }
    }

    /// Make a pending event a no-op. Cancelling an already-fired or unknown
    /// handle has no effect.
    pub fn cancel(&mut self, handle: EventHandle) {
        self.cancelled.insert(handle.id);
    }

    /// Request termination at or before the next dispatch. Only meaningful
    /// from inside a firing callback; the current callback runs to
    /// completion.
    pub fn stop(&mut self) {
        self.stop_requested = true;
    }

    /// Dispatch all events with timestamps up to and including `until`, in
    /// non-decreasing time order (FIFO for equal timestamps). Unless stopped,
    /// the clock ends at `until` even when the queue drains early.
    pub fn run(&mut self, until: SimTime) {
        self.stop_requested = false;
        loop {
            let due = match self.queue.peek() {
                Some(Reverse(next)) => !self.stop_requested && next.time <= until,
                None => false,
            };
            if !due {
                break;
            }
            if let Some(Reverse(pending)) = self.queue.pop() {
                if self.cancelled.remove(&pending.seq) {
                    continue;
                }
                self.now = pending.time;
                (pending.callback)(self);
            }
        }
        if !self.stop_requested && self.now < until {
            self.now = until;
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mg_interface::{secs, SimTime};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_dispatch_in_time_order() {
        let fired = Rc::new(RefCell::new(Vec::new()));
        let mut sched = Scheduler::new();

        for (label, at) in [(3u32, secs(3)), (1, secs(1)), (2, secs(2))] {
            let fired = Rc::clone(&fired);
            sched.schedule_at(at, move |s| {
                fired.borrow_mut().push((label, s.now()));
            });
        }

        sched.run(secs(10));
        assert_eq!(
            *fired.borrow(),
            vec![(1, secs(1)), (2, secs(2)), (3, secs(3))]
        );
        assert_eq!(sched.now(), secs(10));
    }

    #[test]
    fn test_fifo_tie_break_is_submission_order() {
        // Repeated runs with the same submission sequence dispatch equal
        // timestamps identically.
        for _ in 0..10 {
            let fired = Rc::new(RefCell::new(Vec::new()));
            let mut sched = Scheduler::new();

            for label in 0u32..5 {
                let fired = Rc::clone(&fired);
                sched.schedule_at(secs(1), move |_| {
                    fired.borrow_mut().push(label);
                });
            }

            sched.run(secs(2));
            assert_eq!(*fired.borrow(), vec![0, 1, 2, 3, 4]);
        }
    }

    #[test]
    fn test_callback_can_reschedule_itself() {
        // Countdown that re-arms through the queue
        fn countdown(remaining: u32, fired: Rc<RefCell<Vec<SimTime>>>, sched: &mut Scheduler) {
            fired.borrow_mut().push(sched.now());
            if remaining > 1 {
                sched.schedule(secs(1), move |s| countdown(remaining - 1, fired, s));
            }
        }

        let fired = Rc::new(RefCell::new(Vec::new()));
        let mut sched = Scheduler::new();
        {
            let fired = Rc::clone(&fired);
            sched.schedule_at(secs(1), move |s| countdown(3, fired, s));
        }

        sched.run(secs(10));
        assert_eq!(*fired.borrow(), vec![secs(1), secs(2), secs(3)]);
    }

    #[test]
    fn test_cancel_makes_event_a_noop() {
        let fired = Rc::new(RefCell::new(0u32));
        let mut sched = Scheduler::new();

        let handle = {
            let fired = Rc::clone(&fired);
            sched.schedule_at(secs(1), move |_| {
                *fired.borrow_mut() += 1;
            })
        };
        {
            let fired = Rc::clone(&fired);
            sched.schedule_at(secs(2), move |_| {
                *fired.borrow_mut() += 1;
            });
        }

        sched.cancel(handle);
        sched.run(secs(10));
        assert_eq!(*fired.borrow(), 1);
    }

    #[test]
    fn test_stop_halts_before_next_dispatch() {
        let fired = Rc::new(RefCell::new(Vec::new()));
        let mut sched = Scheduler::new();

        {
            let fired = Rc::clone(&fired);
            sched.schedule_at(secs(1), move |s| {
                fired.borrow_mut().push(1u32);
                s.stop();
            });
        }
        {
            let fired = Rc::clone(&fired);
            sched.schedule_at(secs(2), move |_| {
                fired.borrow_mut().push(2u32);
            });
        }

        sched.run(secs(10));
        assert_eq!(*fired.borrow(), vec![1]);
        // Clock stays at the stop point, and the later event is still queued
        assert_eq!(sched.now(), secs(1));
        assert_eq!(sched.pending(), 1);
    }

    #[test]
    fn test_schedule_at_past_clamps_to_now() {
        let fired = Rc::new(RefCell::new(Vec::new()));
        let mut sched = Scheduler::new();

        {
            let fired = Rc::clone(&fired);
            sched.schedule_at(secs(5), move |s| {
                let fired_inner = Rc::clone(&fired);
                // Asking for the past fires at the current time instead
                s.schedule_at(secs(1), move |s| {
                    fired_inner.borrow_mut().push(s.now());
                });
            });
        }

        sched.run(secs(10));
        assert_eq!(*fired.borrow(), vec![secs(5)]);
    }
}

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::rc::Rc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::simulator::{NetworkStats, PacketLossSimulation};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("not subscribed to topic {0:?}")]
    NotSubscribed(String),
    #[error("channel closed")]
    Closed,
}

/// Best-effort publish/subscribe primitive. Delivery is at-least-once and
/// may be reordered; received payloads are queued until drained.
pub trait BroadcastChannel {
    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError>;

    /// Takes every payload delivered on `topic` since the last drain.
    fn drain(&mut self, topic: &str) -> Vec<Vec<u8>>;

    fn close(&mut self);
}

#[derive(Debug)]
struct InFlight {
    release_ms: f64,
    order: u64,
    to: usize,
    topic: String,
    payload: Vec<u8>,
}

impl PartialEq for InFlight {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for InFlight {}

impl PartialOrd for InFlight {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InFlight {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .release_ms
            .total_cmp(&self.release_ms)
            .then_with(|| other.order.cmp(&self.order))
    }
}

#[derive(Debug)]
struct BusState {
    now_ms: f64,
    next_order: u64,
    simulation: PacketLossSimulation,
    rng: StdRng,
    subscriptions: Vec<HashSet<String>>,
    open: Vec<bool>,
    in_flight: BinaryHeap<InFlight>,
    inboxes: Vec<HashMap<String, VecDeque<Vec<u8>>>>,
    stats: NetworkStats,
}

impl BusState {
    fn release_due(&mut self) {
        while self
            .in_flight
            .peek()
            .is_some_and(|packet| packet.release_ms <= self.now_ms)
        {
            let Some(packet) = self.in_flight.pop() else {
                break;
            };
            if !self.open[packet.to] || !self.subscriptions[packet.to].contains(&packet.topic) {
                continue;
            }
            self.stats.packets_delivered += 1;
            self.stats.bytes_delivered += packet.payload.len() as u64;
            self.inboxes[packet.to]
                .entry(packet.topic)
                .or_default()
                .push_back(packet.payload);
        }
    }

    fn enqueue(&mut self, from: usize, topic: &str, payload: &[u8]) {
        self.stats.packets_sent += 1;
        self.stats.bytes_sent += payload.len() as u64;

        for to in 0..self.subscriptions.len() {
            if to == from || !self.open[to] || !self.subscriptions[to].contains(topic) {
                continue;
            }
            if self.simulation.should_drop(&mut self.rng) {
                self.stats.packets_dropped += 1;
                continue;
            }

            let copies = if self.simulation.should_duplicate(&mut self.rng) {
                self.stats.packets_duplicated += 1;
                2
            } else {
                1
            };
            for _ in 0..copies {
                let release_ms = self.now_ms + self.simulation.delay_ms(&mut self.rng);
                let order = self.next_order;
                self.next_order += 1;
                self.in_flight.push(InFlight {
                    release_ms,
                    order,
                    to,
                    topic: topic.to_owned(),
                    payload: payload.to_vec(),
                });
            }
        }
    }
}

/// In-memory broadcast medium for peers living in one process. Time only
/// moves when [`LoopbackBus::advance_to`] is called, so runs are
/// reproducible for a given RNG seed.
#[derive(Debug, Clone)]
pub struct LoopbackBus {
    state: Rc<RefCell<BusState>>,
}

impl LoopbackBus {
    pub fn new(simulation: PacketLossSimulation, rng_seed: u64) -> Self {
        Self {
            state: Rc::new(RefCell::new(BusState {
                now_ms: 0.0,
                next_order: 0,
                simulation,
                rng: StdRng::seed_from_u64(rng_seed),
                subscriptions: Vec::new(),
                open: Vec::new(),
                in_flight: BinaryHeap::new(),
                inboxes: Vec::new(),
                stats: NetworkStats::default(),
            })),
        }
    }

    pub fn perfect() -> Self {
        Self::new(PacketLossSimulation::default(), 0)
    }

    pub fn endpoint(&self) -> BusEndpoint {
        let mut state = self.state.borrow_mut();
        let id = state.subscriptions.len();
        state.subscriptions.push(HashSet::new());
        state.open.push(true);
        state.inboxes.push(HashMap::new());
        BusEndpoint {
            id,
            state: Rc::clone(&self.state),
        }
    }

    /// Moves bus time forward and delivers everything that has arrived.
    pub fn advance_to(&self, now_ms: f64) {
        let mut state = self.state.borrow_mut();
        state.now_ms = state.now_ms.max(now_ms);
        state.release_due();
    }

    pub fn set_simulation(&self, simulation: PacketLossSimulation) {
        self.state.borrow_mut().simulation = simulation;
    }

    pub fn stats(&self) -> NetworkStats {
        self.state.borrow().stats.clone()
    }

    pub fn in_flight(&self) -> usize {
        self.state.borrow().in_flight.len()
    }
}

/// One peer's attachment to a [`LoopbackBus`]. Publishers never receive
/// their own messages.
#[derive(Debug)]
pub struct BusEndpoint {
    id: usize,
    state: Rc<RefCell<BusState>>,
}

impl BroadcastChannel for BusEndpoint {
    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        if !state.open[self.id] {
            return Err(TransportError::Closed);
        }
        state.subscriptions[self.id].insert(topic.to_owned());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        if !state.open[self.id] {
            return Err(TransportError::Closed);
        }
        if !state.subscriptions[self.id].contains(topic) {
            return Err(TransportError::NotSubscribed(topic.to_owned()));
        }
        state.enqueue(self.id, topic, payload);
        state.release_due();
        Ok(())
    }

    fn drain(&mut self, topic: &str) -> Vec<Vec<u8>> {
        let mut state = self.state.borrow_mut();
        state.release_due();
        state.inboxes[self.id]
            .get_mut(topic)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    fn close(&mut self) {
        let mut state = self.state.borrow_mut();
        state.open[self.id] = false;
        state.subscriptions[self.id].clear();
        state.inboxes[self.id].clear();
    }
}

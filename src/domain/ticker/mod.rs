use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use actix::prelude::*;

use crate::clock::Clock;

/// Kinds of periodic events the ticker injects into the other actors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    Push,
    SetQueues,
    Checkpoint,
    TopoRefresh,
}

#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct Tick {
    pub kind: TickKind,
}

/// Register a periodic event. `count` of `None` repeats forever.
#[derive(Message)]
#[rtype(result = "()")]
pub struct AddTicker {
    pub interval_sec: i64,
    pub count: Option<u32>,
    pub dest: Recipient<Tick>,
    pub kind: TickKind,
}

struct TickEntry {
    next_fire: i64,
    interval: i64,
    remaining: Option<u32>,
    seq: u64,
    dest: Recipient<Tick>,
    kind: TickKind,
}

// Heap order: earliest deadline first; seq breaks ties so ordering is total.
impl PartialEq for TickEntry {
    fn eq(&self, other: &Self) -> bool {
        self.next_fire == other.next_fire && self.seq == other.seq
    }
}

impl Eq for TickEntry {}

impl PartialOrd for TickEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TickEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap.
        (other.next_fire, other.seq).cmp(&(self.next_fire, self.seq))
    }
}

/// Generic timer source: a priority queue of pending events drained by a
/// single timer chain. Granularity is one second; no drift correction.
pub struct Ticker {
    clock: Box<dyn Clock>,
    heap: BinaryHeap<TickEntry>,
    next_seq: u64,
    armed: Option<SpawnHandle>,
}

impl Ticker {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self { clock, heap: BinaryHeap::new(), next_seq: 0, armed: None }
    }

    fn fire_due(&mut self, ctx: &mut Context<Self>) {
        let now = self.clock.now();

        while let Some(entry) = self.heap.peek() {
            if entry.next_fire > now {
                break;
            }

            let mut entry = self.heap.pop().expect("peeked entry exists");
            entry.dest.do_send(Tick { kind: entry.kind });

            let keep = match entry.remaining.as_mut() {
                None => true,
                Some(n) => {
                    *n -= 1;
                    *n > 0
                }
            };

            if keep {
                entry.next_fire = now + entry.interval;
                self.heap.push(entry);
            }
        }

        self.rearm(ctx);
    }

    fn rearm(&mut self, ctx: &mut Context<Self>) {
        if let Some(handle) = self.armed.take() {
            ctx.cancel_future(handle);
        }

        let Some(entry) = self.heap.peek() else {
            return;
        };

        let wait = (entry.next_fire - self.clock.now()).max(1) as u64;
        self.armed = Some(ctx.run_later(Duration::from_secs(wait), |act, ctx| {
            act.armed = None;
            act.fire_due(ctx);
        }));
    }
}

impl Actor for Ticker {
    type Context = Context<Self>;
}

impl Handler<AddTicker> for Ticker {
    type Result = ();

    fn handle(&mut self, msg: AddTicker, ctx: &mut Self::Context) {
        if msg.count == Some(0) || msg.interval_sec <= 0 {
            log::warn!("ignoring ticker registration with zero count or non-positive interval");
            return;
        }

        let entry = TickEntry {
            next_fire: self.clock.now() + msg.interval_sec,
            interval: msg.interval_sec,
            remaining: msg.count,
            seq: self.next_seq,
            dest: msg.dest,
            kind: msg.kind,
        };
        self.next_seq += 1;

        self.heap.push(entry);
        self.rearm(ctx);
    }
}

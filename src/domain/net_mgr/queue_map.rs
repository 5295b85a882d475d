use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::ids::SwitchId;

/// The shared priority queue on every port is always number 1; reservation
/// queues are minted from 2 upward.
pub const PRIORITY_QUEUE: i32 = 1;
const FIRST_RESERVATION_QUEUE: i32 = 2;

/// One row of a queue plan: what to install on a switch port at an instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub switch: SwitchId,
    /// Compute node backing the switch; queue installs are grouped by it.
    #[serde(default)]
    pub phost: Option<String>,
    pub port: i32,
    pub queue: i32,
    pub min_rate: i64,
    pub max_rate: i64,
    pub priority: i32,
}

#[derive(Debug, Clone)]
struct QueueLease {
    qnum: i32,
    expiry: i64,
}

/// Per-port queue-number allocator.
///
/// Numbers are stable while their lease (the reservation's expiry) is live
/// and are reused after it lapses, so disjoint timeslices on the same port
/// can share the same small integers. Leases are minted lazily on first
/// request for a `(switch, port, queue-name)` key.
#[derive(Debug, Default)]
pub struct QueueMapper {
    ports: HashMap<(SwitchId, i32), HashMap<String, QueueLease>>,
}

impl QueueMapper {
    pub fn new() -> Self {
        Self { ports: HashMap::new() }
    }

    /// Returns the queue number for `qname` on the port, minting one if
    /// needed. An existing lease is extended rather than re-minted so the
    /// number stays stable for the reservation's whole life.
    pub fn lease(&mut self, switch: &SwitchId, port: i32, qname: &str, expiry: i64, now: i64) -> i32 {
        let leases = self.ports.entry((switch.clone(), port)).or_default();

        leases.retain(|_, l| l.expiry > now);

        if let Some(lease) = leases.get_mut(qname) {
            if expiry > lease.expiry {
                lease.expiry = expiry;
            }
            return lease.qnum;
        }

        let mut qnum = FIRST_RESERVATION_QUEUE;
        loop {
            if !leases.values().any(|l| l.qnum == qnum) {
                break;
            }
            qnum += 1;
        }

        leases.insert(qname.to_string(), QueueLease { qnum, expiry });
        qnum
    }

    /// Looks up a live lease without minting.
    pub fn lookup(&self, switch: &SwitchId, port: i32, qname: &str, now: i64) -> Option<i32> {
        let leases = self.ports.get(&(switch.clone(), port))?;
        let lease = leases.get(qname)?;

        if lease.expiry > now { Some(lease.qnum) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sw(id: &str) -> SwitchId {
        SwitchId::new(id)
    }

    #[test]
    fn numbers_start_above_the_priority_queue() {
        let mut qm = QueueMapper::new();
        assert_eq!(qm.lease(&sw("s1"), 1, "Qr1", 100, 0), 2, "first minted number must leave 1 for the priority queue");
    }

    #[test]
    fn lease_is_stable_while_live() {
        let mut qm = QueueMapper::new();
        let a = qm.lease(&sw("s1"), 1, "Qr1", 100, 0);
        let _b = qm.lease(&sw("s1"), 1, "Qr2", 100, 0);

        assert_eq!(qm.lease(&sw("s1"), 1, "Qr1", 100, 50), a, "the same key must keep its number within the slice");
        assert_eq!(qm.lookup(&sw("s1"), 1, "Qr1", 50), Some(a));
    }

    #[test]
    fn numbers_are_reused_across_disjoint_slices() {
        let mut qm = QueueMapper::new();
        let a = qm.lease(&sw("s1"), 1, "Qr1", 100, 0);

        // r1's lease has lapsed by now=150; r2 may take the same number.
        let b = qm.lease(&sw("s1"), 1, "Qr2", 300, 150);

        assert_eq!(a, b);
        assert_eq!(qm.lookup(&sw("s1"), 1, "Qr1", 150), None, "a lapsed lease must not resolve");
    }

    #[test]
    fn distinct_ports_do_not_share_allocations() {
        let mut qm = QueueMapper::new();
        let a = qm.lease(&sw("s1"), 1, "Qr1", 100, 0);
        let b = qm.lease(&sw("s1"), 2, "Qr2", 100, 0);

        assert_eq!(a, b, "each port has its own number space");
    }
}

use serde::{Deserialize, Serialize};

use crate::domain::ids::{HostName, LinkId, PledgeName, SwitchId};

/// Queue-name roles a reservation creates along a path. Forward traffic uses
/// `Q<rid>` at the h1 ingress and `E1Q<rid>` at the h2 egress; the reverse
/// direction mirrors them with `RQ<rid>` and `E0Q<rid>`. Intermediate links
/// use the shared priority queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueRole {
    Ingress,
    RevIngress,
    Egress0,
    Egress1,
}

impl QueueRole {
    pub fn qname(&self, rid: &PledgeName) -> String {
        match self {
            QueueRole::Ingress => format!("Q{}", rid),
            QueueRole::RevIngress => format!("RQ{}", rid),
            QueueRole::Egress0 => format!("E0Q{}", rid),
            QueueRole::Egress1 => format!("E1Q{}", rid),
        }
    }
}

/// Switch-port attachment of an endpoint VM (the "virtual link" between a
/// switch and the VM itself).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub switch: SwitchId,
    pub port: i32,

    /// Compute node backing the switch; flow-mods for this endpoint are
    /// addressed to it.
    #[serde(default)]
    pub phost: Option<String>,
}

/// One forward/reverse link pair along a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathHop {
    /// Link carrying h1 -> h2 traffic.
    pub fwd: LinkId,
    /// Twin link carrying h2 -> h1 traffic.
    pub rev: LinkId,

    /// Switch the forward link leaves from.
    pub switch: SwitchId,
    /// Egress port of the forward link on `switch`.
    pub out_port: i32,

    /// Switch the reverse link leaves from.
    pub rev_switch: SwitchId,
    /// Egress port of the reverse link on `rev_switch`.
    pub rev_out_port: i32,
}

/// An ordered route from h1 to h2 chosen at reserve time. A single-switch
/// path (both hosts co-resident) has no hops; only the endpoint virtual
/// links exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    pub h1: HostName,
    pub h2: HostName,

    pub hops: Vec<PathHop>,

    pub endpoint1: Endpoint,
    pub endpoint2: Endpoint,

    #[serde(default)]
    pub reversed: bool,

    #[serde(default)]
    pub external_ip: Option<String>,
}

impl Path {
    /// Ordered switch-id sequence, used for the lexicographic tie-break.
    pub fn switch_seq(&self) -> Vec<&SwitchId> {
        let mut seq: Vec<&SwitchId> = vec![&self.endpoint1.switch];
        for hop in &self.hops {
            seq.push(&hop.switch);
        }
        seq.push(&self.endpoint2.switch);
        seq
    }

    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }
}

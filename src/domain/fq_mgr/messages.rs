use actix::prelude::*;

use crate::domain::fq_mgr::flowmod::ExternalDir;
use crate::domain::ids::{PledgeName, SwitchId};
use crate::domain::net_mgr::messages::HostInfo;
use crate::domain::net_mgr::queue_map::QueueEntry;
use crate::domain::pledge::MirrorOutput;

/// Install the queue plan for an instant on every affected host.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct SetQueues {
    pub plan: Vec<QueueEntry>,
}

/// One ingress/egress or intermediate reservation flow-mod.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct IeReserve {
    pub name: PledgeName,
    pub dscp: u8,

    pub switch: SwitchId,
    /// Compute node the flow-mod is addressed to; the switch id is used
    /// when unknown.
    pub phost: Option<String>,
    pub port: i32,
    pub queue: i32,

    pub ip1: String,
    pub ip2: String,
    pub tp_src: Option<u16>,
    pub tp_dst: Option<u16>,

    /// True when matching traffic flowing toward h1.
    pub direction_in: bool,

    pub external_ip: Option<String>,
    pub external_dir: ExternalDir,

    /// Absolute expiry stamped into the rule.
    pub expiry: i64,
}

/// Build and ship the flow-mod chain for a steering pledge; endpoints and
/// middleboxes arrive already resolved.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct SteerFmods {
    pub name: PledgeName,
    pub src: HostInfo,
    pub dest: HostInfo,
    pub boxes: Vec<HostInfo>,
    pub proto: Option<String>,
    pub expiry: i64,
}

/// Create or tear down a mirror via the agent's mirrorwiz action.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct MirrorWiz {
    pub name: PledgeName,
    pub add: bool,
    pub ports: Vec<String>,
    pub output: MirrorOutput,
    pub vlan: Option<String>,
    pub options: Option<String>,
    pub phost: Option<String>,
}

/// Refresh the compute-node list used for broadcast operations.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct ChostList {
    pub hosts: Vec<String>,
}

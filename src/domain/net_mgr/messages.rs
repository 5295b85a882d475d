use actix::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::ids::{HostName, PledgeName, SwitchId, TenantId};
use crate::domain::net_mgr::path::Path;
use crate::domain::net_mgr::queue_map::QueueEntry;
use crate::domain::pledge::PledgeWindow;
use crate::error::Result;

/// Ask for path(s) from h1 to h2 able to carry `amt_out` forward and
/// `amt_in` backward over the window. On success the allotments are
/// committed and the chosen paths returned for storage in the pledge.
#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<Vec<Path>>")]
pub struct Reserve {
    pub name: PledgeName,
    pub tenant: Option<TenantId>,
    pub h1: HostName,
    pub h2: HostName,
    pub window: PledgeWindow,
    pub amt_out: i64,
    pub amt_in: i64,
    pub external_ip: Option<String>,
}

/// Release the allotments committed for a pledge. Idempotent.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct Release {
    pub name: PledgeName,
}

#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<String>")]
pub struct GetIp {
    pub name: HostName,
}

/// Resolved endpoint facts needed by mirror and steering emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostInfo {
    pub name: HostName,
    pub ip4: String,
    pub mac: String,
    pub phost: Option<String>,
}

#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<HostInfo>")]
pub struct ResolveHost {
    pub name: HostName,
}

/// One ingress/egress/intermediate flow-mod target along a path.
#[derive(Debug, Clone)]
pub struct HopFmod {
    pub switch: SwitchId,
    pub phost: Option<String>,
    pub port: i32,
    pub queue: i32,
}

#[derive(Debug, Clone)]
pub struct PathPlan {
    pub fwd: Vec<HopFmod>,
    pub rev: Vec<HopFmod>,
}

/// Everything the push loop needs to emit flow-mods for one pledge:
/// endpoint IPs plus the per-path switch/port/queue tuples probed at a
/// timestamp inside the first post-activation timeslice.
#[derive(Debug, Clone)]
pub struct PushPlan {
    pub ip1: String,
    pub ip2: String,
    pub paths: Vec<PathPlan>,
}

#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<PushPlan>")]
pub struct PathQueues {
    pub name: PledgeName,
    pub ts: i64,
}

/// Full queue plan for an instant: endpoint reservation queues plus
/// per-link priority aggregates.
#[derive(Debug, Clone, Message)]
#[rtype(result = "Vec<QueueEntry>")]
pub struct GenQueueMap {
    pub ts: i64,
}

/// Endpoint-only queue plan.
#[derive(Debug, Clone, Message)]
#[rtype(result = "Vec<QueueEntry>")]
pub struct GenEndpointQueueMap {
    pub ts: i64,
}

/// MAC -> physical-host pairs reported by an agent.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct Mac2Phost {
    pub pairs: Vec<(String, String)>,
}

#[derive(Debug, Clone, Message)]
#[rtype(result = "String")]
pub struct GraphJson;

#[derive(Debug, Clone, Message)]
#[rtype(result = "String")]
pub struct ListHosts;

#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<String>")]
pub struct ListConns {
    pub name: HostName,
}

#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<()>")]
pub struct SetUserCap {
    pub tenant: TenantId,
    pub pct: u8,
}

#[derive(Debug, Clone, Message)]
#[rtype(result = "String")]
pub struct ListUserCaps;

#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct SetDiscount {
    pub amount: i64,
}

use serde::{Deserialize, Serialize};

use crate::domain::ids::HostName;
use crate::domain::net_mgr::path::Path;
use crate::domain::pledge::pledge::PledgeBase;

/// A time-bounded bandwidth guarantee between two endpoints.
///
/// `amt_out` is the h1 -> h2 rate, `amt_in` the h2 -> h1 rate, both in
/// bytes/sec. The path list is filled in at reserve time; a reservation may
/// ride more than one path in multi-link-aggregation topologies, so revoke
/// and release must visit every entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandwidthPledge {
    #[serde(flatten)]
    pub base: PledgeBase,

    pub h1: HostName,
    pub h2: HostName,

    /// Optional transport-port match, h1 and h2 side.
    #[serde(default)]
    pub p1: Option<u16>,
    #[serde(default)]
    pub p2: Option<u16>,

    pub amt_out: i64,
    pub amt_in: i64,

    pub dscp: u8,

    #[serde(default)]
    pub external_ip: Option<String>,

    #[serde(default)]
    pub paths: Vec<Path>,
}

use serde::{Deserialize, Serialize};

use crate::domain::ids::{HostName, SwitchId, TenantId};

/// One attachment point of a host: an OVS switch and port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConn {
    pub switch: SwitchId,
    pub port: i32,
}

/// A VM or bare host as reported by the OpenStack oracle. Mutated only when
/// the oracle reports a change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub name: HostName,

    #[serde(default)]
    pub openstack_id: Option<String>,

    pub ip4: String,

    #[serde(default)]
    pub ip6: Option<String>,

    pub mac: String,

    /// Compute node the VM lives on.
    #[serde(default)]
    pub phost: Option<String>,

    #[serde(default)]
    pub tenant: Option<TenantId>,

    #[serde(default)]
    pub gateway: Option<String>,

    #[serde(default)]
    pub floating_ip: Option<String>,

    /// Attachment points; more than one for multi-homed hosts.
    pub conns: Vec<HostConn>,
}

/// Seam for the (external) OpenStack/Keystone collaborator: something that
/// can produce the current host map on demand.
pub trait HostOracle: std::fmt::Debug + Send {
    fn hosts(&self) -> Vec<Host>;
}

/// Oracle backed by a fixed host list, used at boot from the topology file
/// and by tests.
#[derive(Debug, Clone)]
pub struct StaticHostOracle {
    hosts: Vec<Host>,
}

impl StaticHostOracle {
    pub fn new(hosts: Vec<Host>) -> Self {
        Self { hosts }
    }
}

impl HostOracle for StaticHostOracle {
    fn hosts(&self) -> Vec<Host> {
        self.hosts.clone()
    }
}

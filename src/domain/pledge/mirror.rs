use serde::{Deserialize, Serialize};

use crate::domain::pledge::pledge::PledgeBase;

/// Where mirrored traffic is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum MirrorOutput {
    /// GRE tunnel to an IPv4 collector.
    Gre(String),
    /// GRE tunnel to an IPv6 collector.
    Gre6(String),
    Vlan(u16),
    /// Local port by UUID.
    Port(String),
}

impl std::fmt::Display for MirrorOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MirrorOutput::Gre(ip) => write!(f, "gre:{}", ip),
            MirrorOutput::Gre6(ip) => write!(f, "gre6:{}", ip),
            MirrorOutput::Vlan(v) => write!(f, "vlan:{}", v),
            MirrorOutput::Port(uuid) => write!(f, "port:{}", uuid),
        }
    }
}

/// Port-mirroring reservation. Source ports are OVS port UUIDs or MACs on a
/// single physical host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorPledge {
    #[serde(flatten)]
    pub base: PledgeBase,

    pub ports: Vec<String>,

    pub output: MirrorOutput,

    /// Mirror only these VLANs when set.
    #[serde(default)]
    pub vlan: Option<String>,

    #[serde(default)]
    pub options: Option<String>,

    /// Compute node carrying the source ports.
    #[serde(default)]
    pub phost: Option<String>,

    /// Output/error of the last mirrorwiz run, reported back by the agent.
    #[serde(default)]
    pub last_output: Option<String>,
    #[serde(default)]
    pub last_error: Option<String>,
}

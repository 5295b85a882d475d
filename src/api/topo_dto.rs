use serde::Deserialize;

use crate::domain::ids::{HostName, LinkId, SwitchId, TenantId};
use crate::domain::net_mgr::graph::NetGraph;
use crate::domain::net_mgr::host::{Host, HostConn};

/// Physical network description loaded at boot. In a live deployment the
/// host section is superseded by the OpenStack oracle; switches and links
/// come from the controller query.
#[derive(Debug, Clone, Deserialize)]
pub struct NetTopoDto {
    #[serde(default)]
    pub switches: Vec<SwitchDto>,

    pub links: Vec<LinkDto>,

    #[serde(default)]
    pub hosts: Vec<HostDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwitchDto {
    pub id: String,

    #[serde(default)]
    pub phost: Option<String>,
}

/// One directed link; list both directions for a full-duplex wire.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkDto {
    #[serde(default)]
    pub id: Option<String>,

    pub src: String,
    pub src_port: i32,
    pub dst: String,
    pub dst_port: i32,

    pub capacity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostDto {
    pub name: String,
    pub ip4: String,
    pub mac: String,

    #[serde(default)]
    pub ip6: Option<String>,

    #[serde(default)]
    pub phost: Option<String>,

    #[serde(default)]
    pub tenant: Option<String>,

    #[serde(default)]
    pub gateway: Option<String>,

    #[serde(default)]
    pub floating_ip: Option<String>,

    #[serde(default)]
    pub openstack_id: Option<String>,

    pub conns: Vec<ConnDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnDto {
    pub switch: String,
    pub port: i32,
}

impl NetTopoDto {
    pub fn build_graph(&self) -> NetGraph {
        let mut graph = NetGraph::new();

        for sw in &self.switches {
            graph.add_switch(SwitchId::new(sw.id.clone()), sw.phost.clone());
        }

        for link in &self.links {
            let id = link.id.clone().unwrap_or_else(|| format!("{}--{}", link.src, link.dst));
            graph.add_link(LinkId::new(id), SwitchId::new(link.src.clone()), link.src_port, SwitchId::new(link.dst.clone()), link.dst_port, link.capacity);
        }

        graph
    }

    pub fn build_hosts(&self) -> Vec<Host> {
        self.hosts
            .iter()
            .map(|h| Host {
                name: HostName::new(h.name.clone()),
                openstack_id: h.openstack_id.clone(),
                ip4: h.ip4.clone(),
                ip6: h.ip6.clone(),
                mac: h.mac.clone(),
                phost: h.phost.clone(),
                tenant: h.tenant.as_deref().map(TenantId::new),
                gateway: h.gateway.clone(),
                floating_ip: h.floating_ip.clone(),
                conns: h.conns.iter().map(|c| HostConn { switch: SwitchId::new(c.switch.clone()), port: c.port }).collect(),
            })
            .collect()
    }
}

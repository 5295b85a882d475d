pub mod actor;
pub mod graph;
pub mod handler;
pub mod host;
pub mod messages;
pub mod obligation;
pub mod path;
pub mod queue_map;

use std::collections::HashMap;

use bimap::BiMap;
use serde::Serialize;

use crate::clock::Clock;
use crate::domain::ids::{HostName, LinkId, PledgeName, SwitchId, TenantId};
use crate::domain::net_mgr::graph::NetGraph;
use crate::domain::net_mgr::host::{Host, HostOracle};
use crate::domain::net_mgr::messages::{HopFmod, HostInfo, PathPlan, PushPlan, Reserve};
use crate::domain::net_mgr::path::{Endpoint, Path, PathHop, QueueRole};
use crate::domain::net_mgr::queue_map::{PRIORITY_QUEUE, QueueEntry, QueueMapper};
use crate::domain::pledge::PledgeWindow;
use crate::error::{Error, Result};

const ENDPOINT_QUEUE_PRIORITY: i32 = 20;
const LINK_QUEUE_PRIORITY: i32 = 10;

/// What was committed for a pledge at reserve time; release and queue-plan
/// generation walk these.
#[derive(Debug, Clone)]
pub struct ResvBinding {
    pub paths: Vec<Path>,
    pub window: PledgeWindow,
    /// Discounted amounts actually committed to the allotments.
    pub eff_out: i64,
    pub eff_in: i64,
}

/// Owner of the network graph, the host map and all allotments. Runs as a
/// single actor; handlers delegate to the inherent methods below so tests
/// can drive the logic directly.
#[derive(Debug)]
pub struct NetMgr {
    clock: Box<dyn Clock>,
    graph: NetGraph,
    hosts: HashMap<HostName, Host>,
    /// ip4 <-> mac, rebuilt on every host refresh.
    ip_mac: BiMap<String, String>,
    mac2phost: HashMap<String, String>,
    bindings: HashMap<PledgeName, ResvBinding>,
    queues: QueueMapper,
    ulcaps: HashMap<TenantId, u8>,
    default_cap: u8,
    discount: i64,
    oracle: Box<dyn HostOracle>,
}

impl NetMgr {
    pub fn new(clock: Box<dyn Clock>, graph: NetGraph, oracle: Box<dyn HostOracle>, default_cap: u8, discount: i64) -> Self {
        let mut mgr = NetMgr {
            clock,
            graph,
            hosts: HashMap::new(),
            ip_mac: BiMap::new(),
            mac2phost: HashMap::new(),
            bindings: HashMap::new(),
            queues: QueueMapper::new(),
            ulcaps: HashMap::new(),
            default_cap,
            discount,
            oracle,
        };
        mgr.refresh_hosts();
        mgr
    }

    /// Re-pulls the host map from the oracle; called at boot and on every
    /// topology-refresh tick.
    pub fn refresh_hosts(&mut self) {
        let fresh = self.oracle.hosts();

        self.hosts.clear();
        self.ip_mac.clear();

        for host in fresh {
            self.ip_mac.insert(host.ip4.clone(), host.mac.clone());
            self.hosts.insert(host.name.clone(), host);
        }

        log::debug!("host map refreshed: {} hosts known", self.hosts.len());
    }

    pub fn graph(&self) -> &NetGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut NetGraph {
        &mut self.graph
    }

    pub fn set_discount(&mut self, amount: i64) {
        self.discount = amount;
    }

    pub fn set_user_cap(&mut self, tenant: TenantId, pct: u8) -> Result<()> {
        if pct > 100 {
            return Err(Error::InvalidRequest(format!("user link cap {}% is not a percentage", pct)));
        }

        self.ulcaps.insert(tenant, pct);
        Ok(())
    }

    pub fn user_caps_json(&self) -> String {
        let mut caps: Vec<(&str, u8)> = self.ulcaps.iter().map(|(t, p)| (t.as_str(), *p)).collect();
        caps.sort();

        serde_json::to_string(&caps.iter().map(|(t, p)| serde_json::json!({"tenant": t, "pct": p})).collect::<Vec<_>>())
            .unwrap_or_else(|_| "[]".to_string())
    }

    fn cap_for(&self, tenant: Option<&TenantId>) -> u8 {
        tenant.and_then(|t| self.ulcaps.get(t).copied()).unwrap_or(self.default_cap)
    }

    pub fn get_ip(&self, name: &HostName) -> Result<String> {
        self.hosts.get(name).map(|h| h.ip4.clone()).ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Resolves a VM name, or an IPv4 address when the caller only knows
    /// the address (steering sources arrive both ways).
    pub fn resolve_host(&self, name: &HostName) -> Result<HostInfo> {
        if let Some(host) = self.hosts.get(name) {
            let phost = host.phost.clone().or_else(|| self.mac2phost.get(&host.mac).cloned());
            return Ok(HostInfo { name: host.name.clone(), ip4: host.ip4.clone(), mac: host.mac.clone(), phost });
        }

        if let Some(mac) = self.ip_mac.get_by_left(name.as_str()) {
            let phost = self.mac2phost.get(mac).cloned();
            return Ok(HostInfo { name: name.clone(), ip4: name.to_string(), mac: mac.clone(), phost });
        }

        Err(Error::NotFound(name.to_string()))
    }

    pub fn update_mac2phost(&mut self, pairs: Vec<(String, String)>) {
        for (mac, phost) in pairs {
            self.mac2phost.insert(mac, phost);
        }
    }

    /// Find and commit path(s) for a bandwidth pledge. The minimum-hop
    /// admitting endpoint combination wins; ties break on the lexicographic
    /// switch-id sequence.
    pub fn reserve(&mut self, req: &Reserve) -> Result<Vec<Path>> {
        if self.bindings.contains_key(&req.name) {
            return Err(Error::Conflict(req.name.to_string()));
        }

        let h1 = self.hosts.get(&req.h1).ok_or_else(|| Error::InvalidRequest(format!("unknown host: {}", req.h1)))?.clone();
        let h2 = self.hosts.get(&req.h2).ok_or_else(|| Error::InvalidRequest(format!("unknown host: {}", req.h2)))?.clone();

        let eff_out = (req.amt_out - self.discount).max(0);
        let eff_in = (req.amt_in - self.discount).max(0);
        let tenant = req.tenant.clone().or_else(|| h1.tenant.clone());
        let cap_pct = self.cap_for(tenant.as_ref());

        let mut best: Option<(Vec<LinkId>, Endpoint, Endpoint)> = None;

        for c1 in &h1.conns {
            for c2 in &h2.conns {
                let Some(route) = self.graph.find_route(&c1.switch, &c2.switch, &req.window, eff_out, eff_in, cap_pct) else {
                    continue;
                };

                let ep1 = Endpoint { switch: c1.switch.clone(), port: c1.port, phost: h1.phost.clone() };
                let ep2 = Endpoint { switch: c2.switch.clone(), port: c2.port, phost: h2.phost.clone() };

                let better = match &best {
                    None => true,
                    Some((cur, cur_ep1, _)) => {
                        route.len() < cur.len() || (route.len() == cur.len() && (&ep1.switch, &route) < (&cur_ep1.switch, cur))
                    }
                };

                if better {
                    best = Some((route, ep1, ep2));
                }
            }
        }

        let Some((route, endpoint1, endpoint2)) = best else {
            return Err(Error::CannotReserve(format!("no admitting route from {} to {}", req.h1, req.h2)));
        };

        let mut hops = Vec::with_capacity(route.len());
        for link_id in &route {
            let rev_id = self.graph.twin_of(link_id).expect("admitting link always has a twin").clone();
            let link = self.graph.link(link_id).expect("route links exist");
            let rev = self.graph.link(&rev_id).expect("twin links exist");

            hops.push(PathHop {
                fwd: link_id.clone(),
                rev: rev_id.clone(),
                switch: link.src.clone(),
                out_port: link.src_port,
                rev_switch: rev.src.clone(),
                rev_out_port: rev.src_port,
            });
        }

        // Commit. The reverse direction books on the twin links.
        for hop in &hops {
            self.graph.link_mut(&hop.fwd).expect("route links exist").obligation.increase(req.window.commence, req.window.expiry, eff_out);
            self.graph.link_mut(&hop.rev).expect("twin links exist").obligation.increase(req.window.commence, req.window.expiry, eff_in);
        }

        let path = Path {
            h1: req.h1.clone(),
            h2: req.h2.clone(),
            hops,
            endpoint1,
            endpoint2,
            reversed: false,
            external_ip: req.external_ip.clone(),
        };

        let paths = vec![path];
        self.bindings.insert(req.name.clone(), ResvBinding { paths: paths.clone(), window: req.window, eff_out, eff_in });

        log::info!("reserved {}: {} -> {} over {} hop(s), out={} in={}", req.name, req.h1, req.h2, paths[0].hop_count(), eff_out, eff_in);

        Ok(paths)
    }

    /// Release the committed allotments for `[max(now, commence), expiry)`.
    /// Safe to call for unknown names; revocation must be idempotent.
    pub fn release(&mut self, name: &PledgeName) {
        let Some(binding) = self.bindings.remove(name) else {
            return;
        };

        let now = self.clock.now();
        let start = binding.window.commence.max(now);
        let end = binding.window.expiry;

        if start >= end {
            return;
        }

        for path in &binding.paths {
            for hop in &path.hops {
                if let Some(link) = self.graph.link_mut(&hop.fwd) {
                    link.obligation.decrease(start, end, binding.eff_out);
                }
                if let Some(link) = self.graph.link_mut(&hop.rev) {
                    link.obligation.decrease(start, end, binding.eff_in);
                }
            }
        }

        log::info!("released allotments for {}", name);
    }

    /// Switch/port/queue tuples for every flow-mod the push loop must emit
    /// for a pledge, probed at `ts`.
    pub fn path_queues(&mut self, name: &PledgeName, ts: i64) -> Result<PushPlan> {
        let now = self.clock.now();
        let binding = self.bindings.get(name).cloned().ok_or_else(|| Error::NotFound(name.to_string()))?;

        let mut paths = Vec::with_capacity(binding.paths.len());

        for path in &binding.paths {
            let expiry = binding.window.expiry;
            let mut fwd: Vec<HopFmod> = Vec::new();
            let mut rev: Vec<HopFmod> = Vec::new();

            // Forward: egress endpoint, ingress switch of the first link,
            // then each intermediate link's priority queue.
            let e1q = self.queues.lease(&path.endpoint2.switch, path.endpoint2.port, &QueueRole::Egress1.qname(name), expiry, now);
            fwd.push(HopFmod {
                switch: path.endpoint2.switch.clone(),
                phost: path.endpoint2.phost.clone(),
                port: path.endpoint2.port,
                queue: e1q,
            });

            let q = self.queues.lease(&path.endpoint1.switch, path.endpoint1.port, &QueueRole::Ingress.qname(name), expiry, now);
            fwd.push(HopFmod {
                switch: path.endpoint1.switch.clone(),
                phost: path.endpoint1.phost.clone(),
                port: path.endpoint1.port,
                queue: q,
            });

            for hop in path.hops.iter().skip(1) {
                fwd.push(HopFmod { switch: hop.switch.clone(), phost: self.switch_phost(&hop.switch), port: hop.out_port, queue: PRIORITY_QUEUE });
            }

            // Reverse: symmetric, with the R-prefixed queue names.
            let e0q = self.queues.lease(&path.endpoint1.switch, path.endpoint1.port, &QueueRole::Egress0.qname(name), expiry, now);
            rev.push(HopFmod {
                switch: path.endpoint1.switch.clone(),
                phost: path.endpoint1.phost.clone(),
                port: path.endpoint1.port,
                queue: e0q,
            });

            let rq = self.queues.lease(&path.endpoint2.switch, path.endpoint2.port, &QueueRole::RevIngress.qname(name), expiry, now);
            rev.push(HopFmod {
                switch: path.endpoint2.switch.clone(),
                phost: path.endpoint2.phost.clone(),
                port: path.endpoint2.port,
                queue: rq,
            });

            for hop in path.hops.iter().rev().skip(1) {
                rev.push(HopFmod {
                    switch: hop.rev_switch.clone(),
                    phost: self.switch_phost(&hop.rev_switch),
                    port: hop.rev_out_port,
                    queue: PRIORITY_QUEUE,
                });
            }

            paths.push(PathPlan { fwd, rev });
        }

        let first = &binding.paths[0];
        Ok(PushPlan { ip1: self.get_ip(&first.h1)?, ip2: self.get_ip(&first.h2)?, paths })
    }

    fn switch_phost(&self, id: &SwitchId) -> Option<String> {
        self.graph.switch(id).and_then(|s| s.phost.clone())
    }

    /// Queue plan for an instant: endpoint reservation queues plus per-link
    /// priority aggregates.
    pub fn gen_queue_map(&mut self, ts: i64) -> Vec<QueueEntry> {
        let mut entries = self.gen_endpoint_queue_map(ts);

        for link in self.graph.links() {
            let committed = link.obligation.committed_at(ts);

            if committed > 0 {
                entries.push(QueueEntry {
                    switch: link.src.clone(),
                    phost: self.graph.switch(&link.src).and_then(|s| s.phost.clone()),
                    port: link.src_port,
                    queue: PRIORITY_QUEUE,
                    min_rate: committed,
                    max_rate: link.capacity,
                    priority: LINK_QUEUE_PRIORITY,
                });
            }
        }

        entries.sort_by(|a, b| (&a.switch, a.port, a.queue).cmp(&(&b.switch, b.port, b.queue)));
        entries
    }

    /// Endpoint-only queue plan.
    pub fn gen_endpoint_queue_map(&mut self, ts: i64) -> Vec<QueueEntry> {
        let now = self.clock.now();
        let mut entries: Vec<QueueEntry> = Vec::new();

        let names: Vec<PledgeName> = self
            .bindings
            .iter()
            .filter(|(_, b)| b.window.commence <= ts && ts < b.window.expiry)
            .map(|(n, _)| n.clone())
            .collect();

        for name in names {
            let binding = self.bindings.get(&name).cloned().expect("binding existed above");

            for path in &binding.paths {
                let expiry = binding.window.expiry;

                for (role, ep, rate) in [
                    (QueueRole::Ingress, &path.endpoint1, binding.eff_out),
                    (QueueRole::Egress0, &path.endpoint1, binding.eff_in),
                    (QueueRole::RevIngress, &path.endpoint2, binding.eff_in),
                    (QueueRole::Egress1, &path.endpoint2, binding.eff_out),
                ] {
                    let qnum = self.queues.lease(&ep.switch, ep.port, &role.qname(&name), expiry, now);

                    entries.push(QueueEntry {
                        switch: ep.switch.clone(),
                        phost: ep.phost.clone(),
                        port: ep.port,
                        queue: qnum,
                        min_rate: rate,
                        max_rate: rate,
                        priority: ENDPOINT_QUEUE_PRIORITY,
                    });
                }
            }
        }

        entries.sort_by(|a, b| (&a.switch, a.port, a.queue).cmp(&(&b.switch, b.port, b.queue)));
        entries
    }

    pub fn graph_json(&self) -> String {
        #[derive(Serialize)]
        struct LinkDump<'a> {
            id: &'a str,
            src: &'a str,
            dst: &'a str,
            capacity: i64,
        }

        let mut links: Vec<LinkDump> = self
            .graph
            .links()
            .map(|l| LinkDump { id: l.id.as_str(), src: l.src.as_str(), dst: l.dst.as_str(), capacity: l.capacity })
            .collect();
        links.sort_by(|a, b| a.id.cmp(b.id));

        let mut switches: Vec<&str> = self.graph.switches().map(|s| s.id.as_str()).collect();
        switches.sort();

        serde_json::to_string(&serde_json::json!({"switches": switches, "links": links})).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn hosts_json(&self) -> String {
        let mut hosts: Vec<&Host> = self.hosts.values().collect();
        hosts.sort_by(|a, b| a.name.cmp(&b.name));

        serde_json::to_string(&hosts).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn conns_json(&self, name: &HostName) -> Result<String> {
        let host = self.hosts.get(name).ok_or_else(|| Error::NotFound(name.to_string()))?;
        serde_json::to_string(&host.conns).map_err(Error::from)
    }
}

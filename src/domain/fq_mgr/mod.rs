pub mod flowmod;
pub mod handler;
pub mod messages;
pub mod steer;

use std::collections::BTreeMap;

use actix::prelude::*;

use crate::clock::Clock;
use crate::domain::agent::AgentMgr;
use crate::domain::agent::messages::{SendAll, SendOne};
use crate::domain::agent::protocol::AgentRequest;
use crate::domain::fq_mgr::flowmod::{ActionOpts, COOKIE_QUEUE, DEFAULT_BRIDGE, FlowMod, MatchOpts};
use crate::domain::fq_mgr::messages::{IeReserve, MirrorWiz, SetQueues};
use crate::domain::net_mgr::queue_map::QueueEntry;

/// Minimum interval between intermediate-queue rebroadcasts. Treated as a
/// hard floor; earlier requests are refused.
pub const INTERMED_REFRESH_FLOOR_SEC: i64 = 1800;

const IE_RESERVE_PRIORITY: i32 = 400;

/// Stateless translator from reservation requests into wire-level agent
/// commands. The only state carried is the compute-node list and the
/// last intermediate-queue refresh stamp.
pub struct FqMgr {
    agent: Addr<AgentMgr>,
    clock: Box<dyn Clock>,
    chosts: Vec<String>,
    last_intermed: i64,
}

impl FqMgr {
    pub fn new(agent: Addr<AgentMgr>, clock: Box<dyn Clock>) -> Self {
        Self { agent, clock, chosts: Vec::new(), last_intermed: 0 }
    }

    pub fn set_chosts(&mut self, hosts: Vec<String>) {
        self.chosts = hosts;
    }

    pub(crate) fn agent(&self) -> &Addr<AgentMgr> {
        &self.agent
    }

    /// Consolidates queue entries per physical host and ships one
    /// `setqueues` action carrying all of them; follows up with an
    /// intermediate-queue refresh when the floor allows.
    pub(crate) fn push_queue_plan(&mut self, msg: SetQueues) {
        if msg.plan.is_empty() {
            return;
        }

        // BTreeMap keeps host order stable across pushes.
        let mut by_host: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for entry in &msg.plan {
            let host = entry.phost.clone().unwrap_or_else(|| entry.switch.to_string());
            by_host.entry(host).or_default().push(render_queue_entry(entry));
        }

        let hosts: Vec<String> = by_host.keys().cloned().collect();
        let qdata: Vec<String> = by_host.into_values().flatten().collect();

        log::debug!("queue plan: {} entries across {} host(s)", qdata.len(), hosts.len());
        self.agent.do_send(SendAll(AgentRequest::setqueues(hosts, qdata)));

        self.maybe_refresh_intermed();
    }

    fn maybe_refresh_intermed(&mut self) {
        let now = self.clock.now();

        if now - self.last_intermed < INTERMED_REFRESH_FLOOR_SEC {
            return;
        }

        self.last_intermed = now;
        self.agent.do_send(SendAll(AgentRequest::intermed_queues(self.chosts.clone(), None)));
    }

    pub(crate) fn push_ie_reserve(&self, req: IeReserve) {
        let fm = ie_reserve_fmod(&req);
        self.agent.do_send(SendOne(AgentRequest::flowmod(vec![fm.render()])));
    }

    pub(crate) fn push_mirror(&self, req: MirrorWiz) {
        let verb = if req.add { "add" } else { "del" };
        let mut cmd = format!("{} {}", verb, req.name);

        if req.add {
            cmd.push_str(&format!(" {} {}", req.ports.join(","), req.output));

            if let Some(vlan) = &req.vlan {
                cmd.push_str(&format!(" vlan={}", vlan));
            }
            if let Some(options) = &req.options {
                cmd.push_str(&format!(" {}", options));
            }
        }

        if let Some(phost) = &req.phost {
            cmd.push_str(&format!(" -h {}", phost));
        }

        self.agent.do_send(SendOne(AgentRequest::mirrorwiz(req.name.to_string(), vec![cmd])));
    }
}

fn render_queue_entry(entry: &QueueEntry) -> String {
    format!("{}/{}/q{},min={},max={},pri={}", entry.switch, entry.port, entry.queue, entry.min_rate, entry.max_rate, entry.priority)
}

/// Single flow-mod for one ingress/egress or intermediate reservation hop.
pub fn ie_reserve_fmod(req: &IeReserve) -> FlowMod {
    let (src, dst, tp_src, tp_dst) = if req.direction_in {
        (req.ip2.clone(), req.ip1.clone(), req.tp_dst, req.tp_src)
    } else {
        (req.ip1.clone(), req.ip2.clone(), req.tp_src, req.tp_dst)
    };

    let matches = MatchOpts {
        src: Some(src),
        dst: Some(dst),
        tp_src,
        tp_dst,
        external: req.external_ip.clone().map(|ip| (req.external_dir, ip)),
        ..Default::default()
    };

    let actions = ActionOpts {
        queue: Some(req.queue),
        dscp: if req.dscp > 0 { Some(req.dscp) } else { None },
        normal: true,
        ..Default::default()
    };

    FlowMod {
        host: req.phost.clone().unwrap_or_else(|| req.switch.to_string()),
        table: None,
        timeout: req.expiry,
        priority: IE_RESERVE_PRIORITY,
        matches,
        actions,
        verb: "add",
        cookie: COOKIE_QUEUE,
        bridge: DEFAULT_BRIDGE.to_string(),
    }
}

impl Actor for FqMgr {
    type Context = Context<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fq_mgr::flowmod::ExternalDir;
    use crate::domain::ids::{PledgeName, SwitchId};

    fn req() -> IeReserve {
        IeReserve {
            name: PledgeName::new("r1"),
            dscp: 46,
            switch: SwitchId::new("s1"),
            phost: Some("phys1".to_string()),
            port: 3,
            queue: 2,
            ip1: "10.0.0.4".to_string(),
            ip2: "10.0.0.9".to_string(),
            tp_src: Some(80),
            tp_dst: None,
            direction_in: false,
            external_ip: None,
            external_dir: ExternalDir::Dest,
            expiry: 1500,
        }
    }

    #[test]
    fn forward_direction_matches_h1_to_h2() {
        let fm = ie_reserve_fmod(&req());
        let s = fm.render();

        assert!(s.contains("-s 10.0.0.4 -d 10.0.0.9"), "forward direction must match src=h1 dst=h2: {}", s);
        assert!(s.contains("-q 2"));
        assert!(s.contains("0xbeef"));
    }

    #[test]
    fn inbound_direction_swaps_addresses_and_ports() {
        let mut r = req();
        r.direction_in = true;
        r.tp_dst = Some(443);

        let s = ie_reserve_fmod(&r).render();

        assert!(s.contains("-s 10.0.0.9 -d 10.0.0.4"), "inbound direction must swap the address pair: {}", s);
        assert!(s.contains("-p 443"), "transport ports must swap with the direction: {}", s);
    }

    #[test]
    fn external_ip_carries_the_direction_marker() {
        let mut r = req();
        r.external_ip = Some("192.168.1.1".to_string());

        let s = ie_reserve_fmod(&r).render();
        assert!(s.contains("-D 192.168.1.1"), "{}", s);
    }

    #[test]
    fn queue_entry_rendering() {
        let entry = QueueEntry {
            switch: SwitchId::new("s1"),
            phost: Some("phys1".to_string()),
            port: 3,
            queue: 2,
            min_rate: 100,
            max_rate: 100,
            priority: 20,
        };

        assert_eq!(render_queue_entry(&entry), "s1/3/q2,min=100,max=100,pri=20");
    }
}

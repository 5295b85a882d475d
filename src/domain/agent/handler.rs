use std::collections::HashSet;

use actix::prelude::Handler;
use lazy_static::lazy_static;

use crate::domain::agent::AgentMgr;
use crate::domain::agent::messages::{AgentEvent, SendAll, SendLong, SendOne, SendToAgent, SetSinks};
use crate::domain::agent::protocol::{AgentRequest, AgentResponse};
use crate::domain::ids::AgentId;
use crate::domain::net_mgr::messages::Mac2Phost;
use crate::domain::res_mgr::messages::MirrorResult;

lazy_static! {
    /// Response kinds whose non-zero state means a reservation is broken,
    /// not merely a script hiccup.
    static ref FATAL_RTYPES: HashSet<&'static str> = ["bwow_fmod", "flowmod"].iter().copied().collect();
}

impl Handler<AgentEvent> for AgentMgr {
    type Result = ();

    fn handle(&mut self, msg: AgentEvent, _ctx: &mut Self::Context) {
        match msg {
            AgentEvent::Connect { id, addr } => {
                log::info!("agent connected: {} ({} now up)", id, self.session_count() + 1);

                // Prime the new agent so the MAC map and the intermediate
                // queues exist before any reservation lands on it.
                addr.do_send(SendToAgent(AgentRequest::map_mac2phost(Vec::new())));
                addr.do_send(SendToAgent(AgentRequest::intermed_queues(Vec::new(), None)));

                self.add_session(id, addr);
            }
            AgentEvent::Disconnect { id } => {
                self.drop_session(&id);
                log::warn!("agent disconnected: {} ({} remain)", id, self.session_count());
            }
            AgentEvent::Inbound { id, resp } => {
                self.dispatch_inbound(&id, resp);
            }
        }
    }
}

impl AgentMgr {
    fn dispatch_inbound(&mut self, id: &AgentId, resp: AgentResponse) {
        if resp.ctype != "response" {
            log::debug!("agent {}: ignoring inbound ctype {}", id, resp.ctype);
            return;
        }

        if resp.state != 0 {
            if FATAL_RTYPES.contains(resp.rtype.as_str()) {
                log::error!("agent {}: {} failed (state {}): {}", id, resp.rtype, resp.state, resp.edata.join("; "));
            } else {
                log::warn!("agent {}: {} returned state {}: {}", id, resp.rtype, resp.state, resp.edata.join("; "));
            }
            return;
        }

        match resp.rtype.as_str() {
            "map_mac2phost" => {
                let pairs: Vec<(String, String)> = resp
                    .rdata
                    .iter()
                    .filter_map(|line| {
                        let mut parts = line.split_whitespace();
                        Some((parts.next()?.to_string(), parts.next()?.to_string()))
                    })
                    .collect();

                match self.net_sink() {
                    Some(net) => net.do_send(Mac2Phost { pairs }),
                    None => log::warn!("mac2phost response before sinks were wired; dropped"),
                }
            }
            "mirrorwiz" => {
                let output = if resp.rdata.is_empty() { None } else { Some(resp.rdata.join("\n")) };
                let error = if resp.edata.is_empty() { None } else { Some(resp.edata.join("\n")) };

                match self.res_sink() {
                    Some(res) => res.do_send(MirrorResult { name: crate::domain::ids::PledgeName::new(resp.rid.clone()), output, error }),
                    None => log::warn!("mirrorwiz response before sinks were wired; dropped"),
                }
            }
            other => {
                log::debug!("agent {}: ok response for {}", id, other);
            }
        }
    }
}

impl Handler<SendAll> for AgentMgr {
    type Result = ();

    fn handle(&mut self, msg: SendAll, _ctx: &mut Self::Context) {
        if self.session_count() == 0 {
            log::warn!("no agents connected; broadcast dropped");
            return;
        }

        for (_, addr) in self.sessions_iter() {
            addr.do_send(SendToAgent(msg.0.clone()));
        }
    }
}

impl Handler<SendOne> for AgentMgr {
    type Result = ();

    fn handle(&mut self, msg: SendOne, _ctx: &mut Self::Context) {
        match self.next_short() {
            Some(addr) => addr.do_send(SendToAgent(msg.0)),
            None => log::warn!("no agents connected; request dropped"),
        }
    }
}

impl Handler<SendLong> for AgentMgr {
    type Result = ();

    fn handle(&mut self, msg: SendLong, _ctx: &mut Self::Context) {
        match self.long_slot() {
            Some(addr) => addr.do_send(SendToAgent(msg.0)),
            None => log::warn!("no agents connected; long request dropped"),
        }
    }
}

impl Handler<SetSinks> for AgentMgr {
    type Result = ();

    fn handle(&mut self, msg: SetSinks, _ctx: &mut Self::Context) {
        self.set_sinks(msg.net, msg.res);
    }
}

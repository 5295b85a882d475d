pub mod codec;
pub mod handler;
pub mod messages;
pub mod protocol;
pub mod session;

use actix::prelude::*;
use tokio::net::TcpListener;

use crate::domain::agent::messages::{AgentEvent, SendToAgent};
use crate::domain::agent::session::AgentSession;
use crate::domain::ids::AgentId;
use crate::domain::net_mgr::messages::Mac2Phost;
use crate::domain::res_mgr::messages::MirrorResult;

/// Connection pool over all agents. Keeps the ordered session list; index 0
/// is reserved for long-running work whenever more than one agent is up.
pub struct AgentMgr {
    sessions: Vec<(AgentId, Recipient<SendToAgent>)>,
    rr: usize,

    net: Option<Recipient<Mac2Phost>>,
    res: Option<Recipient<MirrorResult>>,
}

impl AgentMgr {
    pub fn new() -> Self {
        Self { sessions: Vec::new(), rr: 0, net: None, res: None }
    }

    pub(crate) fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub(crate) fn add_session(&mut self, id: AgentId, addr: Recipient<SendToAgent>) {
        self.sessions.push((id, addr));
    }

    pub(crate) fn drop_session(&mut self, id: &AgentId) {
        self.sessions.retain(|(sid, _)| sid != id);
    }

    pub(crate) fn sessions_iter(&self) -> impl Iterator<Item = &(AgentId, Recipient<SendToAgent>)> {
        self.sessions.iter()
    }

    /// Round-robin pick for short work, skipping index 0 when it can be
    /// spared for long-running requests.
    pub(crate) fn next_short(&mut self) -> Option<&Recipient<SendToAgent>> {
        if self.sessions.is_empty() {
            return None;
        }

        if self.sessions.len() == 1 {
            return Some(&self.sessions[0].1);
        }

        self.rr += 1;
        let idx = 1 + (self.rr % (self.sessions.len() - 1));
        Some(&self.sessions[idx].1)
    }

    pub(crate) fn long_slot(&self) -> Option<&Recipient<SendToAgent>> {
        self.sessions.first().map(|(_, addr)| addr)
    }

    pub(crate) fn net_sink(&self) -> Option<&Recipient<Mac2Phost>> {
        self.net.as_ref()
    }

    pub(crate) fn res_sink(&self) -> Option<&Recipient<MirrorResult>> {
        self.res.as_ref()
    }

    pub(crate) fn set_sinks(&mut self, net: Recipient<Mac2Phost>, res: Recipient<MirrorResult>) {
        self.net = Some(net);
        self.res = Some(res);
    }
}

impl Default for AgentMgr {
    fn default() -> Self {
        Self::new()
    }
}

impl Actor for AgentMgr {
    type Context = Context<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::messages::SendToAgent;

    struct Sink;

    impl Actor for Sink {
        type Context = Context<Self>;
    }

    impl Handler<SendToAgent> for Sink {
        type Result = ();

        fn handle(&mut self, _msg: SendToAgent, _ctx: &mut Self::Context) {}
    }

    fn sink() -> Recipient<SendToAgent> {
        Sink.start().recipient()
    }

    #[actix_rt::test]
    async fn a_lone_agent_takes_short_work() {
        let mut mgr = AgentMgr::new();
        let only = sink();
        mgr.add_session(AgentId::new("a0"), only.clone());

        for _ in 0..5 {
            assert!(mgr.next_short() == Some(&only), "with one agent there is nobody to spare");
        }
    }

    #[actix_rt::test]
    async fn short_work_skips_the_long_slot_when_possible() {
        let mut mgr = AgentMgr::new();
        let long = sink();
        mgr.add_session(AgentId::new("a0"), long.clone());
        mgr.add_session(AgentId::new("a1"), sink());
        mgr.add_session(AgentId::new("a2"), sink());

        for _ in 0..10 {
            let picked = mgr.next_short().expect("agents are connected").clone();
            assert!(picked != long, "index 0 is reserved for long-running work");
        }

        assert!(mgr.long_slot() == Some(&long));
    }

    #[actix_rt::test]
    async fn dropping_a_session_shrinks_the_pool() {
        let mut mgr = AgentMgr::new();
        mgr.add_session(AgentId::new("a0"), sink());
        mgr.add_session(AgentId::new("a1"), sink());

        mgr.drop_session(&AgentId::new("a0"));

        assert_eq!(mgr.session_count(), 1);
        let short = mgr.next_short().cloned();
        assert!(mgr.long_slot().cloned() == short, "the survivor serves both roles");
    }
}

/// Accept loop for the agent port. Each connection becomes a session actor
/// reporting to the dispatcher.
pub async fn listen(listener: TcpListener, mgr: Addr<AgentMgr>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let id = AgentId::new(format!("{}-{}", peer, uuid::Uuid::new_v4().simple()));
                let (read_half, write_half) = tokio::io::split(stream);
                let session = AgentSession::new(id.clone(), mgr.clone().recipient(), write_half, read_half);

                mgr.do_send(AgentEvent::Connect { id, addr: session.recipient() });
            }
            Err(e) => {
                log::error!("agent listener accept failed: {}", e);
                break;
            }
        }
    }
}

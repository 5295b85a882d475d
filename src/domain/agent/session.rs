use actix::prelude::*;
use std::io;
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;

use crate::domain::agent::codec::AgentCodec;
use crate::domain::agent::messages::{AgentEvent, SendToAgent};
use crate::domain::agent::protocol::AgentResponse;
use crate::domain::ids::AgentId;

/// One connected agent. Acts as a proxy: messages sent to this actor are
/// written to TCP; objects read from TCP are forwarded to the dispatcher.
pub struct AgentSession {
    id: AgentId,

    /// The dispatcher this session reports to.
    mgr: Recipient<AgentEvent>,

    /// Write sink for the TCP stream.
    framed_write: actix::io::FramedWrite<crate::domain::agent::protocol::AgentRequest, tokio::io::WriteHalf<TcpStream>, AgentCodec>,
}

impl AgentSession {
    pub fn new(
        id: AgentId,
        mgr: Recipient<AgentEvent>,
        write_half: tokio::io::WriteHalf<TcpStream>,
        read_half: tokio::io::ReadHalf<TcpStream>,
    ) -> Addr<Self> {
        Self::create(|ctx| {
            ctx.add_stream(FramedRead::new(read_half, AgentCodec::new()));
            Self { id, mgr, framed_write: actix::io::FramedWrite::new(write_half, AgentCodec::new(), ctx) }
        })
    }
}

impl Actor for AgentSession {
    type Context = Context<Self>;

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.mgr.do_send(AgentEvent::Disconnect { id: self.id.clone() });
    }
}

impl Handler<SendToAgent> for AgentSession {
    type Result = ();

    fn handle(&mut self, msg: SendToAgent, _ctx: &mut Self::Context) {
        self.framed_write.write(msg.0);
    }
}

impl StreamHandler<Result<AgentResponse, io::Error>> for AgentSession {
    fn handle(&mut self, msg: Result<AgentResponse, io::Error>, ctx: &mut Self::Context) {
        match msg {
            Ok(resp) => {
                self.mgr.do_send(AgentEvent::Inbound { id: self.id.clone(), resp });
            }
            Err(e) => {
                log::error!("agent {}: codec error: {}", self.id, e);
                ctx.stop();
            }
        }
    }
}

impl actix::io::WriteHandler<io::Error> for AgentSession {}

use actix::prelude::*;

use crate::domain::agent::protocol::{AgentRequest, AgentResponse};
use crate::domain::ids::AgentId;
use crate::domain::net_mgr::messages::Mac2Phost;
use crate::domain::res_mgr::messages::MirrorResult;

/// Connection lifecycle and inbound traffic, reported by sessions.
#[derive(Message)]
#[rtype(result = "()")]
pub enum AgentEvent {
    Connect { id: AgentId, addr: Recipient<SendToAgent> },
    Disconnect { id: AgentId },
    Inbound { id: AgentId, resp: AgentResponse },
}

/// Write one request to a single session's TCP stream.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct SendToAgent(pub AgentRequest);

/// Fan out to every connected agent.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct SendAll(pub AgentRequest);

/// Round-robin to one agent, skipping the long-work slot when possible.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct SendOne(pub AgentRequest);

/// Send to the agent reserved for long-running work (index 0).
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct SendLong(pub AgentRequest);

/// Late wiring of the response sinks; breaks the construction cycle between
/// the dispatcher and the managers it reports into.
#[derive(Message)]
#[rtype(result = "()")]
pub struct SetSinks {
    pub net: Recipient<Mac2Phost>,
    pub res: Recipient<MirrorResult>,
}

use serde::{Deserialize, Serialize};

/// One agent action inside an outbound `action_list` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAction {
    pub atype: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dscps: Option<String>,

    /// Flow-mod command strings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fdata: Vec<String>,

    /// Queue specification strings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qdata: Vec<String>,

    /// Request id echoed back in the response, used to correlate mirror
    /// results with their pledge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,
}

/// Outbound command shape, both to one agent and broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub ctype: String,
    pub actions: Vec<AgentAction>,
}

impl AgentRequest {
    fn action_list(action: AgentAction) -> Self {
        Self { ctype: "action_list".to_string(), actions: vec![action] }
    }

    pub fn flowmod(fdata: Vec<String>) -> Self {
        Self::action_list(AgentAction { atype: "flowmod".to_string(), hosts: Vec::new(), dscps: None, fdata, qdata: Vec::new(), rid: None })
    }

    pub fn setqueues(hosts: Vec<String>, qdata: Vec<String>) -> Self {
        Self::action_list(AgentAction { atype: "setqueues".to_string(), hosts, dscps: None, fdata: Vec::new(), qdata, rid: None })
    }

    pub fn map_mac2phost(hosts: Vec<String>) -> Self {
        Self::action_list(AgentAction { atype: "map_mac2phost".to_string(), hosts, dscps: None, fdata: Vec::new(), qdata: Vec::new(), rid: None })
    }

    pub fn intermed_queues(hosts: Vec<String>, dscps: Option<String>) -> Self {
        Self::action_list(AgentAction { atype: "intermed_queues".to_string(), hosts, dscps, fdata: Vec::new(), qdata: Vec::new(), rid: None })
    }

    pub fn mirrorwiz(rid: String, fdata: Vec<String>) -> Self {
        Self::action_list(AgentAction { atype: "mirrorwiz".to_string(), hosts: Vec::new(), dscps: None, fdata, qdata: Vec::new(), rid: Some(rid) })
    }
}

/// Inbound response envelope from an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub ctype: String,

    #[serde(default)]
    pub rtype: String,

    #[serde(default)]
    pub rdata: Vec<String>,

    #[serde(default)]
    pub edata: Vec<String>,

    #[serde(default)]
    pub state: i32,

    #[serde(default)]
    pub vinfo: String,

    /// Correlates a response with the pledge that caused the request.
    #[serde(default)]
    pub rid: String,
}

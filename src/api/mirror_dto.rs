use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

use crate::domain::ids::PledgeName;
use crate::domain::pledge::{MirrorOutput, MirrorPledge, Pledge, PledgeBase, PledgeWindow};
use crate::error::{Error, Result};

const MAX_VLAN: u16 = 4095;

/// Create body of the mirror REST surface.
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorCreateDto {
    #[serde(default)]
    pub start_time: Option<i64>,
    pub end_time: i64,

    /// GRE collector IP (v4 or v6), `vlan:<id>` or a local port UUID.
    pub output: String,

    /// Source ports: OVS port UUIDs or MACs.
    pub port: Vec<String>,

    #[serde(default)]
    pub vlan: Option<String>,

    #[serde(default)]
    pub cookie: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub options: Option<String>,

    #[serde(default)]
    pub phost: Option<String>,
}

fn parse_output(raw: &str) -> Result<MirrorOutput> {
    if let Some(vlan) = raw.strip_prefix("vlan:") {
        let id: u16 = vlan.parse().map_err(|_| Error::InvalidRequest(format!("bad vlan output: {}", raw)))?;
        if id > MAX_VLAN {
            return Err(Error::InvalidRequest(format!("vlan {} out of range", id)));
        }
        return Ok(MirrorOutput::Vlan(id));
    }

    if raw.parse::<Ipv4Addr>().is_ok() {
        return Ok(MirrorOutput::Gre(raw.to_string()));
    }
    if raw.parse::<Ipv6Addr>().is_ok() {
        return Ok(MirrorOutput::Gre6(raw.to_string()));
    }

    Ok(MirrorOutput::Port(raw.to_string()))
}

fn validate_vlan_filter(filter: &str) -> Result<()> {
    for part in filter.split(',') {
        let id: i64 = part.trim().parse().map_err(|_| Error::InvalidRequest(format!("bad vlan filter: {}", filter)))?;
        if !(0..=MAX_VLAN as i64).contains(&id) {
            return Err(Error::InvalidRequest(format!("vlan {} out of range", id)));
        }
    }

    Ok(())
}

impl MirrorCreateDto {
    pub fn into_pledge(self, now: i64) -> Result<Pledge> {
        let window = PledgeWindow::new(now, self.start_time.unwrap_or(now), self.end_time)?;

        if self.port.is_empty() {
            return Err(Error::InvalidRequest("a mirror needs at least one source port".to_string()));
        }

        let output = parse_output(&self.output)?;

        if let Some(filter) = &self.vlan {
            validate_vlan_filter(filter)?;
        }

        let name = self.name.unwrap_or_else(|| format!("mir-{}", uuid::Uuid::new_v4().simple()));

        Ok(Pledge::Mirror(MirrorPledge {
            base: PledgeBase {
                name: PledgeName::new(name.clone()),
                cookie: self.cookie.unwrap_or_default(),
                window,
                pushed: false,
                paused: false,
                usrname: Some(name),
            },
            ports: self.port,
            output,
            vlan: self.vlan,
            options: self.options,
            phost: self.phost,
            last_output: None,
            last_error: None,
        }))
    }
}

/// One element of the create response array.
#[derive(Debug, Clone, Serialize)]
pub struct MirrorResultDto {
    pub name: String,
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MirrorResultDto {
    pub fn ok(name: &str) -> Self {
        Self { name: name.to_string(), url: format!("/tegu/mirrors/{}/", name), error: None }
    }
}

/// Show body for GET on a mirror url.
#[derive(Debug, Clone, Serialize)]
pub struct MirrorShowDto {
    pub name: String,
    pub start_time: i64,
    pub end_time: i64,
    pub active: bool,
    pub port: Vec<String>,
    pub output: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MirrorShowDto {
    pub fn from_pledge(p: &MirrorPledge, now: i64) -> Self {
        Self {
            name: p.base.name.to_string(),
            start_time: p.base.window.commence,
            end_time: p.base.window.expiry,
            active: p.base.window.is_active(now),
            port: p.ports.clone(),
            output: p.output.to_string(),
            error: p.last_error.clone(),
        }
    }
}

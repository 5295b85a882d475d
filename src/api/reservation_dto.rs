use serde::{Deserialize, Serialize};

use crate::domain::ids::{HostName, PledgeName};
use crate::domain::pledge::{BandwidthPledge, Pledge, PledgeBase, PledgeWindow, SteerPledge};
use crate::error::{Error, Result};

const MAX_DSCP: u8 = 63;

/// Body of a `reserve` verb as the HTTP front-end would hand it over.
#[derive(Debug, Clone, Deserialize)]
pub struct ReserveRequestDto {
    /// h2 -> h1 rate, bytes/sec; defaults to the outbound rate.
    #[serde(default)]
    pub bandwidth_in: Option<i64>,

    /// h1 -> h2 rate, bytes/sec.
    pub bandwidth_out: i64,

    #[serde(default)]
    pub start_time: Option<i64>,
    pub end_time: i64,

    pub h1: String,
    pub h2: String,

    #[serde(default)]
    pub p1: Option<u16>,
    #[serde(default)]
    pub p2: Option<u16>,

    #[serde(default)]
    pub cookie: Option<String>,

    #[serde(default)]
    pub dscp: Option<u8>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub external_ip: Option<String>,
}

impl ReserveRequestDto {
    /// Validates and converts into a pledge; `now` drives the commence
    /// clamp.
    pub fn into_pledge(self, now: i64) -> Result<Pledge> {
        let window = PledgeWindow::new(now, self.start_time.unwrap_or(now), self.end_time)?;

        let dscp = self.dscp.unwrap_or(0);
        if dscp > MAX_DSCP {
            return Err(Error::InvalidRequest(format!("dscp {} out of range", dscp)));
        }

        if self.bandwidth_out <= 0 {
            return Err(Error::InvalidRequest("outbound bandwidth must be positive".to_string()));
        }

        let name = self.name.unwrap_or_else(|| format!("res-{}", uuid::Uuid::new_v4().simple()));

        Ok(Pledge::Bandwidth(BandwidthPledge {
            base: PledgeBase {
                name: PledgeName::new(name.clone()),
                cookie: self.cookie.unwrap_or_default(),
                window,
                pushed: false,
                paused: false,
                usrname: Some(name),
            },
            h1: HostName::new(self.h1),
            h2: HostName::new(self.h2),
            p1: self.p1,
            p2: self.p2,
            amt_out: self.bandwidth_out,
            amt_in: self.bandwidth_in.unwrap_or(self.bandwidth_out),
            dscp,
            external_ip: self.external_ip,
            paths: Vec::new(),
        }))
    }
}

/// Body of a `steer` verb.
#[derive(Debug, Clone, Deserialize)]
pub struct SteerRequestDto {
    pub tenant: String,
    pub src: String,
    pub dest: String,
    pub middleboxes: Vec<String>,

    #[serde(default)]
    pub proto: Option<String>,

    #[serde(default)]
    pub start_time: Option<i64>,
    pub end_time: i64,

    #[serde(default)]
    pub cookie: Option<String>,

    #[serde(default)]
    pub name: Option<String>,
}

impl SteerRequestDto {
    pub fn into_pledge(self, now: i64) -> Result<Pledge> {
        let window = PledgeWindow::new(now, self.start_time.unwrap_or(now), self.end_time)?;

        if self.middleboxes.is_empty() {
            return Err(Error::InvalidRequest("a steering request needs at least one middlebox".to_string()));
        }

        let name = self.name.unwrap_or_else(|| format!("steer-{}", uuid::Uuid::new_v4().simple()));

        Ok(Pledge::Steer(SteerPledge {
            base: PledgeBase {
                name: PledgeName::new(name.clone()),
                cookie: self.cookie.unwrap_or_default(),
                window,
                pushed: false,
                paused: false,
                usrname: Some(name),
            },
            tenant: crate::domain::ids::TenantId::new(self.tenant),
            src: self.src,
            dest: self.dest,
            middleboxes: self.middleboxes,
            proto: self.proto,
        }))
    }
}

/// What a successful reserve answers with.
#[derive(Debug, Clone, Serialize)]
pub struct ReserveReplyDto {
    pub name: String,
    pub commence: i64,
    pub expiry: i64,
    pub bandwidth_out: i64,
    pub bandwidth_in: i64,
}

impl From<&BandwidthPledge> for ReserveReplyDto {
    fn from(p: &BandwidthPledge) -> Self {
        Self {
            name: p.base.name.to_string(),
            commence: p.base.window.commence,
            expiry: p.base.window.expiry,
            bandwidth_out: p.amt_out,
            bandwidth_in: p.amt_in,
        }
    }
}

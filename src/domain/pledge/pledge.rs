use serde::{Deserialize, Serialize};

use crate::domain::ids::{HostName, PledgeName};
use crate::domain::pledge::{bandwidth::BandwidthPledge, mirror::MirrorPledge, steer::SteerPledge};
use crate::error::{Error, Result};

/// Seconds past expiry after which a pushed pledge may be swept from the
/// inventory.
pub const EXTINCT_GRACE_SEC: i64 = 120;

/// Deleting a pledge rewrites its expiry to `now + DELETE_GRACE_SEC` so the
/// revocation flow-mods still propagate before the switch forgets the rules.
pub const DELETE_GRACE_SEC: i64 = 15;

/// Half-open reservation window `[commence, expiry)` in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PledgeWindow {
    pub commence: i64,
    pub expiry: i64,
}

impl PledgeWindow {
    /// Builds a window, clamping a commence time in the past up to `now`.
    /// A window whose expiry is not strictly after the (clamped) commence
    /// is rejected.
    pub fn new(now: i64, commence: i64, expiry: i64) -> Result<Self> {
        let commence = if commence < now { now } else { commence };

        if expiry <= commence {
            return Err(Error::InvalidRequest(format!("expiry {} is not after commence {}", expiry, commence)));
        }

        Ok(PledgeWindow { commence, expiry })
    }

    pub fn is_pending(&self, now: i64) -> bool {
        now < self.commence
    }

    pub fn is_active(&self, now: i64) -> bool {
        self.commence <= now && now < self.expiry
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expiry <= now
    }

    /// Active now, or will be within `lead` seconds.
    pub fn is_active_within(&self, now: i64, lead: i64) -> bool {
        !self.is_expired(now) && self.commence <= now + lead
    }

    pub fn overlaps(&self, other: &PledgeWindow) -> bool {
        self.commence < other.expiry && other.commence < self.expiry
    }
}

/// Attributes every pledge variant carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PledgeBase {
    /// Unique id within the inventory.
    pub name: PledgeName,

    /// Opaque owner cookie; matched (or overridden by the super-cookie) on
    /// every get/delete.
    pub cookie: String,

    pub window: PledgeWindow,

    /// Set once every flow-mod request for the pledge was handed to the
    /// dispatcher. Cleared on pause, delete and push failure so the next
    /// scheduler tick re-emits.
    #[serde(default)]
    pub pushed: bool,

    /// A paused pledge stays in the inventory but emits no fresh flow-mods;
    /// its next emission carries an imminent expiry, pulling it from the
    /// switches.
    #[serde(default)]
    pub paused: bool,

    /// Tenant/user visible label.
    #[serde(default)]
    pub usrname: Option<String>,
}

impl PledgeBase {
    pub fn is_extinct(&self, now: i64) -> bool {
        self.pushed && self.window.expiry + EXTINCT_GRACE_SEC <= now
    }
}

/// A persisted reservation. The `ptype` tag keeps checkpoint lines
/// self-describing so unknown variants can be skipped on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "ptype", rename_all = "lowercase")]
pub enum Pledge {
    Bandwidth(BandwidthPledge),
    Mirror(MirrorPledge),
    Steer(SteerPledge),
}

impl Pledge {
    pub fn base(&self) -> &PledgeBase {
        match self {
            Pledge::Bandwidth(p) => &p.base,
            Pledge::Mirror(p) => &p.base,
            Pledge::Steer(p) => &p.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut PledgeBase {
        match self {
            Pledge::Bandwidth(p) => &mut p.base,
            Pledge::Mirror(p) => &mut p.base,
            Pledge::Steer(p) => &mut p.base,
        }
    }

    pub fn name(&self) -> &PledgeName {
        &self.base().name
    }

    pub fn window(&self) -> PledgeWindow {
        self.base().window
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.base().window.is_expired(now)
    }

    pub fn is_extinct(&self, now: i64) -> bool {
        self.base().is_extinct(now)
    }

    pub fn as_bandwidth(&self) -> Option<&BandwidthPledge> {
        match self {
            Pledge::Bandwidth(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_mirror_mut(&mut self) -> Option<&mut MirrorPledge> {
        match self {
            Pledge::Mirror(p) => Some(p),
            _ => None,
        }
    }

    /// True if the pledge references the named VM/host in any role.
    pub fn concerns_host(&self, host: &HostName) -> bool {
        match self {
            Pledge::Bandwidth(p) => p.h1 == *host || p.h2 == *host,
            Pledge::Mirror(p) => p.phost.as_deref() == Some(host.as_str()),
            Pledge::Steer(p) => p.src == host.as_str() || p.dest == host.as_str(),
        }
    }
}

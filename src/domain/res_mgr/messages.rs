use actix::prelude::*;

use crate::domain::ids::{HostName, PledgeName};
use crate::domain::pledge::Pledge;
use crate::error::Result;

/// Store a new pledge. Bandwidth pledges reserve their paths with the
/// network manager before they are accepted; the returned string is the
/// pledge name. There is no immediate push: emission happens on the next
/// scheduler tick.
#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<String>")]
pub struct AddPledge {
    pub pledge: Pledge,
}

#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<Pledge>")]
pub struct GetPledge {
    pub name: PledgeName,
    pub cookie: String,
}

/// Authorised delete. The network-manager release is awaited before the
/// expiry rewrite; doing it the other way round would split timeslices on
/// the new boundary and leak queues.
#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<()>")]
pub struct DelPledge {
    pub name: PledgeName,
    pub cookie: String,
}

/// Delete every pledge the cookie owns (every pledge for the super-cookie).
/// Returns how many were revoked.
#[derive(Debug, Clone, Message)]
#[rtype(result = "usize")]
pub struct DelAll {
    pub cookie: String,
}

/// JSON array of all non-expired pledges.
#[derive(Debug, Clone, Message)]
#[rtype(result = "String")]
pub struct ListPledges;

/// Internal-only: clone the pledge for expiry purposes, release its path
/// bindings and mark the clone expired and unpushed. Used when re-pathing
/// after a VM migration.
#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<()>")]
pub struct Yank {
    pub name: PledgeName,
}

/// Pause or resume every pledge; either way the pushed flag clears so the
/// next scheduler tick re-emits.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct SetPauseState {
    pub paused: bool,
}

#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct WriteCheckpoint;

/// Restore the inventory from a checkpoint file, re-reserving bandwidth
/// paths. Pledges that can no longer be pathed are dropped with a warning;
/// returns how many loaded.
#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<usize>")]
pub struct LoadCheckpoint {
    pub file: String,
}

/// Async report from the push pipeline: clear the pushed flag so the next
/// tick retries.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct FailedPush {
    pub name: PledgeName,
}

/// All pledges referencing a given VM/host.
#[derive(Debug, Clone, Message)]
#[rtype(result = "Vec<Pledge>")]
pub struct PledgesForHost {
    pub host: HostName,
}

/// Output/error of a mirrorwiz run, reported back by an agent.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct MirrorResult {
    pub name: PledgeName,
    pub output: Option<String>,
    pub error: Option<String>,
}

/// Re-path every bandwidth pledge touching a migrated VM: yank the old
/// incarnation and re-reserve under the same id/cookie/window. Returns how
/// many were refreshed.
#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<usize>")]
pub struct RefreshHost {
    pub host: HostName,
}

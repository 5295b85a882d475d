pub mod actor;
pub mod checkpoint;
pub mod handler;
pub mod messages;
pub mod push;

use std::collections::HashMap;

use actix::prelude::*;
use slotmap::{SlotMap, new_key_type};

use crate::clock::Clock;
use crate::domain::fq_mgr::FqMgr;
use crate::domain::ids::PledgeName;
use crate::domain::net_mgr::NetMgr;
use crate::domain::pledge::Pledge;
use crate::error::{Error, Result};

new_key_type! {
    pub struct PledgeKey;
}

/// The authoritative pledge inventory. Keyed storage with a name index;
/// owned exclusively by the reservation manager actor, so no locking.
#[derive(Debug, Default)]
pub struct Inventory {
    slots: SlotMap<PledgeKey, Pledge>,
    name_index: HashMap<PledgeName, PledgeKey>,
}

impl Inventory {
    pub fn new() -> Self {
        Self { slots: SlotMap::with_key(), name_index: HashMap::new() }
    }

    /// Adds a pledge, rejecting on id collision.
    pub fn insert(&mut self, pledge: Pledge) -> Result<PledgeKey> {
        let name = pledge.name().clone();

        if self.name_index.contains_key(&name) {
            return Err(Error::Conflict(name.to_string()));
        }

        let key = self.slots.insert(pledge);
        self.name_index.insert(name, key);

        Ok(key)
    }

    pub fn get(&self, name: &PledgeName) -> Option<&Pledge> {
        let key = self.name_index.get(name)?;
        self.slots.get(*key)
    }

    pub fn get_mut(&mut self, name: &PledgeName) -> Option<&mut Pledge> {
        let key = self.name_index.get(name)?;
        self.slots.get_mut(*key)
    }

    pub fn remove(&mut self, name: &PledgeName) -> Option<Pledge> {
        let key = self.name_index.remove(name)?;
        self.slots.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pledge> {
        self.slots.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Pledge> {
        self.slots.values_mut()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drops every pledge the predicate rejects, keeping the name index in
    /// step.
    pub fn retain(&mut self, mut keep: impl FnMut(&Pledge) -> bool) {
        let doomed: Vec<PledgeName> = self.slots.values().filter(|p| !keep(p)).map(|p| p.name().clone()).collect();

        for name in doomed {
            self.remove(&name);
        }
    }
}

/// Owner of the pledge inventory and its lifecycle: add/get/delete,
/// pause/resume, scheduler-driven push, checkpoint and restore.
pub struct ResMgr {
    clock: Box<dyn Clock>,
    pub(crate) inventory: Inventory,
    pub(crate) net: Addr<NetMgr>,
    pub(crate) fq: Addr<FqMgr>,
    super_cookie: Option<String>,
    pub(crate) ckpt_dir: String,
    pub(crate) ckpt_keep: usize,
    pub(crate) ckpt_seq: u64,
    pub(crate) last_qcheck: i64,
}

impl ResMgr {
    pub fn new(clock: Box<dyn Clock>, net: Addr<NetMgr>, fq: Addr<FqMgr>, super_cookie: Option<String>, ckpt_dir: String, ckpt_keep: usize) -> Self {
        let now = clock.now();
        let ckpt_seq = checkpoint::next_seq(&ckpt_dir);

        Self { clock, inventory: Inventory::new(), net, fq, super_cookie, ckpt_dir, ckpt_keep, ckpt_seq, last_qcheck: now }
    }

    pub(crate) fn now(&self) -> i64 {
        self.clock.now()
    }

    /// A presented cookie authorises when it matches the pledge owner or the
    /// process-wide super-cookie.
    pub(crate) fn authorised(&self, presented: &str, owner: &str) -> bool {
        presented == owner || self.super_cookie.as_deref() == Some(presented)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pledge::{PledgeBase, PledgeWindow, SteerPledge};
    use crate::domain::ids::TenantId;

    fn steer(name: &str) -> Pledge {
        Pledge::Steer(SteerPledge {
            base: PledgeBase {
                name: PledgeName::new(name),
                cookie: "c".to_string(),
                window: PledgeWindow { commence: 0, expiry: 100 },
                pushed: false,
                paused: false,
                usrname: None,
            },
            tenant: TenantId::new("t"),
            src: "a".to_string(),
            dest: "b".to_string(),
            middleboxes: vec!["mb".to_string()],
            proto: None,
        })
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut inv = Inventory::new();
        inv.insert(steer("r1")).unwrap();

        assert!(matches!(inv.insert(steer("r1")), Err(Error::Conflict(_))), "a second pledge with the same id must be rejected");
        assert_eq!(inv.len(), 1);
    }

    #[test]
    fn remove_keeps_the_index_in_step() {
        let mut inv = Inventory::new();
        inv.insert(steer("r1")).unwrap();

        assert!(inv.remove(&PledgeName::new("r1")).is_some());
        assert!(inv.get(&PledgeName::new("r1")).is_none());
        assert!(inv.insert(steer("r1")).is_ok(), "the name must be reusable after removal");
    }

    #[test]
    fn retain_drops_rejected_pledges() {
        let mut inv = Inventory::new();
        inv.insert(steer("r1")).unwrap();
        inv.insert(steer("r2")).unwrap();

        inv.retain(|p| p.name().as_str() == "r2");

        assert_eq!(inv.len(), 1);
        assert!(inv.get(&PledgeName::new("r2")).is_some());
    }
}

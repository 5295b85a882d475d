use actix::fut;
use actix::prelude::*;

use crate::domain::fq_mgr::messages::{MirrorWiz, SetQueues};
use crate::domain::ids::PledgeName;
use crate::domain::net_mgr::messages::{GenQueueMap, Release, Reserve};
use crate::domain::pledge::{DELETE_GRACE_SEC, Pledge, PledgeWindow};
use crate::domain::res_mgr::messages::{
    AddPledge, DelAll, DelPledge, FailedPush, GetPledge, ListPledges, LoadCheckpoint, MirrorResult, PledgesForHost, RefreshHost,
    SetPauseState, WriteCheckpoint, Yank,
};
use crate::domain::res_mgr::push::{self, BwPushData, PUSH_PROBE_LEAD_SEC};
use crate::domain::res_mgr::{ResMgr, checkpoint};
use crate::domain::ticker::{Tick, TickKind};
use crate::error::{Error, Result};

/// Pledges commencing within this many seconds of a push tick are emitted
/// early so the switches are primed when the window opens.
const PUSH_LEAD_SEC: i64 = 15;

impl Handler<AddPledge> for ResMgr {
    type Result = ResponseActFuture<Self, Result<String>>;

    fn handle(&mut self, msg: AddPledge, _ctx: &mut Self::Context) -> Self::Result {
        let name = msg.pledge.name().clone();

        if self.inventory.get(&name).is_some() {
            return Box::pin(fut::ready(Err(Error::Conflict(name.to_string()))));
        }

        match msg.pledge {
            Pledge::Bandwidth(bw) => {
                let req = Reserve {
                    name: name.clone(),
                    tenant: None,
                    h1: bw.h1.clone(),
                    h2: bw.h2.clone(),
                    window: bw.base.window,
                    amt_out: bw.amt_out,
                    amt_in: bw.amt_in,
                    external_ip: bw.external_ip.clone(),
                };
                let net = self.net.clone();

                Box::pin(async move { (net.send(req).await, bw) }.into_actor(self).map(move |(outcome, mut bw), act, _ctx| {
                    let paths = match outcome {
                        Ok(Ok(paths)) => paths,
                        Ok(Err(e)) => return Err(e),
                        Err(e) => return Err(e.into()),
                    };

                    bw.paths = paths;
                    act.inventory.insert(Pledge::Bandwidth(bw))?;

                    log::info!("pledge added: {}", name);
                    Ok(name.to_string())
                }))
            }
            other => {
                let result = self.inventory.insert(other).map(|_| {
                    log::info!("pledge added: {}", name);
                    name.to_string()
                });

                Box::pin(fut::ready(result))
            }
        }
    }
}

impl Handler<GetPledge> for ResMgr {
    type Result = Result<Pledge>;

    fn handle(&mut self, msg: GetPledge, _ctx: &mut Self::Context) -> Self::Result {
        let pledge = self.inventory.get(&msg.name).ok_or_else(|| Error::NotFound(msg.name.to_string()))?;

        if !self.authorised(&msg.cookie, &pledge.base().cookie) {
            return Err(Error::Unauthorized);
        }

        Ok(pledge.clone())
    }
}

impl Handler<DelPledge> for ResMgr {
    type Result = ResponseActFuture<Self, Result<()>>;

    fn handle(&mut self, msg: DelPledge, _ctx: &mut Self::Context) -> Self::Result {
        let Some(pledge) = self.inventory.get(&msg.name) else {
            return Box::pin(fut::ready(Err(Error::NotFound(msg.name.to_string()))));
        };

        if !self.authorised(&msg.cookie, &pledge.base().cookie) {
            return Box::pin(fut::ready(Err(Error::Unauthorized)));
        }

        let name = msg.name.clone();
        let net = self.net.clone();

        // The queue release must land before the expiry rewrite; rewriting
        // first would split timeslices on the new boundary and leak queues.
        Box::pin(async move { net.send(Release { name: name.clone() }).await.map(|_| name) }.into_actor(self).map(
            |outcome, act, _ctx| {
                let name = outcome.map_err(Error::from)?;
                let now = act.now();

                if let Some(pledge) = act.inventory.get_mut(&name) {
                    let base = pledge.base_mut();
                    base.window.expiry = now + DELETE_GRACE_SEC;
                    base.pushed = false;
                }

                log::info!("pledge deleted: {} (expiry pulled to now+{})", name, DELETE_GRACE_SEC);
                Ok(())
            },
        ))
    }
}

impl Handler<DelAll> for ResMgr {
    type Result = usize;

    fn handle(&mut self, msg: DelAll, _ctx: &mut Self::Context) -> Self::Result {
        let doomed: Vec<PledgeName> = self
            .inventory
            .iter()
            .filter(|p| self.authorised(&msg.cookie, &p.base().cookie))
            .map(|p| p.name().clone())
            .collect();

        let now = self.now();

        for name in &doomed {
            // Release first, mailbox order makes it land before any later
            // traffic for the same pledge.
            self.net.do_send(Release { name: name.clone() });

            if let Some(pledge) = self.inventory.get_mut(name) {
                let base = pledge.base_mut();
                base.window.expiry = now + DELETE_GRACE_SEC;
                base.pushed = false;
            }
        }

        log::info!("delete-all revoked {} pledge(s)", doomed.len());
        doomed.len()
    }
}

impl Handler<ListPledges> for ResMgr {
    type Result = String;

    fn handle(&mut self, _msg: ListPledges, _ctx: &mut Self::Context) -> Self::Result {
        let now = self.now();
        let live: Vec<&Pledge> = self.inventory.iter().filter(|p| !p.is_expired(now)).collect();

        serde_json::to_string(&live).unwrap_or_else(|_| "[]".to_string())
    }
}

impl Handler<Yank> for ResMgr {
    type Result = Result<()>;

    fn handle(&mut self, msg: Yank, _ctx: &mut Self::Context) -> Self::Result {
        self.yank_pledge(&msg.name)
    }
}

impl Handler<SetPauseState> for ResMgr {
    type Result = ();

    fn handle(&mut self, msg: SetPauseState, _ctx: &mut Self::Context) {
        for pledge in self.inventory.iter_mut() {
            let base = pledge.base_mut();
            base.paused = msg.paused;
            base.pushed = false;
        }

        log::info!("all pledges {}", if msg.paused { "paused" } else { "resumed" });
    }
}

impl Handler<WriteCheckpoint> for ResMgr {
    type Result = ();

    fn handle(&mut self, _msg: WriteCheckpoint, _ctx: &mut Self::Context) {
        self.do_checkpoint();
    }
}

impl Handler<LoadCheckpoint> for ResMgr {
    type Result = ResponseActFuture<Self, Result<usize>>;

    fn handle(&mut self, msg: LoadCheckpoint, _ctx: &mut Self::Context) -> Self::Result {
        let now = self.now();
        let pledges = match checkpoint::load_checkpoint(&msg.file, now) {
            Ok(pledges) => pledges,
            Err(e) => return Box::pin(fut::ready(Err(e))),
        };

        log::info!("loading {} pledge(s) from {}", pledges.len(), msg.file);
        let net = self.net.clone();

        Box::pin(
            async move {
                let mut results = Vec::with_capacity(pledges.len());

                for pledge in pledges {
                    let outcome = match &pledge {
                        Pledge::Bandwidth(bw) => {
                            let req = Reserve {
                                name: bw.base.name.clone(),
                                tenant: None,
                                h1: bw.h1.clone(),
                                h2: bw.h2.clone(),
                                window: bw.base.window,
                                amt_out: bw.amt_out,
                                amt_in: bw.amt_in,
                                external_ip: bw.external_ip.clone(),
                            };

                            match net.send(req).await {
                                Ok(Ok(paths)) => Some(paths),
                                Ok(Err(e)) => {
                                    log::warn!("checkpoint pledge {} no longer pathable: {}", bw.base.name, e);
                                    None
                                }
                                Err(e) => {
                                    log::warn!("checkpoint pledge {}: network manager unreachable: {}", bw.base.name, e);
                                    None
                                }
                            }
                        }
                        _ => Some(Vec::new()),
                    };

                    results.push((pledge, outcome));
                }

                results
            }
            .into_actor(self)
            .map(|results, act, _ctx| {
                let mut loaded = 0;

                for (mut pledge, outcome) in results {
                    let Some(paths) = outcome else {
                        continue;
                    };

                    if let Pledge::Bandwidth(bw) = &mut pledge {
                        bw.paths = paths;
                    }
                    // Everything re-emits on the next push tick.
                    pledge.base_mut().pushed = false;

                    match act.inventory.insert(pledge) {
                        Ok(_) => loaded += 1,
                        Err(e) => log::warn!("checkpoint pledge skipped: {}", e),
                    }
                }

                log::info!("checkpoint restore complete: {} pledge(s) live", loaded);
                Ok(loaded)
            }),
        )
    }
}

impl Handler<FailedPush> for ResMgr {
    type Result = ();

    fn handle(&mut self, msg: FailedPush, _ctx: &mut Self::Context) {
        if let Some(pledge) = self.inventory.get_mut(&msg.name) {
            pledge.base_mut().pushed = false;
            log::warn!("push failed for {}; will retry on the next tick", msg.name);
        }
    }
}

impl Handler<PledgesForHost> for ResMgr {
    type Result = MessageResult<PledgesForHost>;

    fn handle(&mut self, msg: PledgesForHost, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.inventory.iter().filter(|p| p.concerns_host(&msg.host)).cloned().collect())
    }
}

impl Handler<MirrorResult> for ResMgr {
    type Result = ();

    fn handle(&mut self, msg: MirrorResult, _ctx: &mut Self::Context) {
        let Some(mirror) = self.inventory.get_mut(&msg.name).and_then(|p| p.as_mirror_mut()) else {
            log::debug!("mirrorwiz result for unknown pledge {}", msg.name);
            return;
        };

        if let Some(err) = &msg.error {
            log::warn!("mirror {} reported: {}", msg.name, err);
        }

        mirror.last_output = msg.output;
        mirror.last_error = msg.error;
    }
}

impl Handler<RefreshHost> for ResMgr {
    type Result = ResponseActFuture<Self, Result<usize>>;

    fn handle(&mut self, msg: RefreshHost, _ctx: &mut Self::Context) -> Self::Result {
        let now = self.now();

        let affected: Vec<Pledge> = self
            .inventory
            .iter()
            .filter(|p| p.as_bandwidth().is_some() && p.concerns_host(&msg.host) && !p.is_expired(now))
            .cloned()
            .collect();

        for pledge in &affected {
            if let Err(e) = self.yank_pledge(pledge.name()) {
                log::warn!("refresh: yank of {} failed: {}", pledge.name(), e);
            }
        }

        let net = self.net.clone();

        Box::pin(
            async move {
                let mut results = Vec::with_capacity(affected.len());

                for pledge in affected {
                    let Pledge::Bandwidth(bw) = pledge else { continue };
                    let window = PledgeWindow { commence: bw.base.window.commence.max(now), expiry: bw.base.window.expiry };

                    let req = Reserve {
                        name: bw.base.name.clone(),
                        tenant: None,
                        h1: bw.h1.clone(),
                        h2: bw.h2.clone(),
                        window,
                        amt_out: bw.amt_out,
                        amt_in: bw.amt_in,
                        external_ip: bw.external_ip.clone(),
                    };

                    // The yank's release is already queued ahead of this
                    // reserve in the network manager's mailbox.
                    let outcome = net.send(req).await;
                    results.push((bw, window, outcome));
                }

                results
            }
            .into_actor(self)
            .map(|results, act, _ctx| {
                let mut refreshed = 0;

                for (mut bw, window, outcome) in results {
                    let paths = match outcome {
                        Ok(Ok(paths)) => paths,
                        Ok(Err(e)) => {
                            log::warn!("refresh: {} could not be re-pathed: {}", bw.base.name, e);
                            continue;
                        }
                        Err(e) => {
                            log::warn!("refresh: {}: network manager unreachable: {}", bw.base.name, e);
                            continue;
                        }
                    };

                    bw.base.window = window;
                    bw.base.pushed = false;
                    bw.paths = paths;

                    match act.inventory.insert(Pledge::Bandwidth(bw)) {
                        Ok(_) => refreshed += 1,
                        Err(e) => log::warn!("refresh insert failed: {}", e),
                    }
                }

                Ok(refreshed)
            }),
        )
    }
}

impl Handler<Tick> for ResMgr {
    type Result = ();

    fn handle(&mut self, msg: Tick, ctx: &mut Self::Context) {
        match msg.kind {
            TickKind::Push => self.do_push(ctx),
            TickKind::SetQueues => self.do_setqueues_check(),
            TickKind::Checkpoint => self.do_checkpoint(),
            TickKind::TopoRefresh => {}
        }
    }
}

enum PushItem {
    Bandwidth(BwPushData),
    Steer { name: PledgeName, src: String, dest: String, middleboxes: Vec<String>, proto: Option<String>, expiry: i64 },
    Mirror(MirrorWiz),
}

impl ResMgr {
    /// Clone for expiry purposes: the original leaves the inventory and its
    /// bindings are released; the clone lives on briefly under a derived
    /// name with no paths, so its own expiry never double-releases.
    pub(crate) fn yank_pledge(&mut self, name: &PledgeName) -> Result<()> {
        let Some(mut pledge) = self.inventory.remove(name) else {
            return Err(Error::NotFound(name.to_string()));
        };

        self.net.do_send(Release { name: name.clone() });

        let now = self.now();
        let clone_name = PledgeName::new(format!("{}.y", name));

        {
            let base = pledge.base_mut();
            base.name = clone_name.clone();
            base.window.expiry = now + DELETE_GRACE_SEC;
            if base.window.commence > now {
                base.window.commence = now;
            }
            base.pushed = false;
        }

        if let Pledge::Bandwidth(bw) = &mut pledge {
            bw.paths.clear();
        }

        // A prior yank of the same pledge may still be draining.
        self.inventory.remove(&clone_name);
        self.inventory.insert(pledge)?;

        Ok(())
    }

    fn do_push(&mut self, ctx: &mut Context<Self>) {
        let now = self.now();
        let mut items: Vec<PushItem> = Vec::new();

        for pledge in self.inventory.iter_mut() {
            {
                let base = pledge.base();
                if base.pushed || !base.window.is_active_within(now, PUSH_LEAD_SEC) {
                    continue;
                }
            }

            let expiry = if pledge.base().paused { now + DELETE_GRACE_SEC } else { pledge.base().window.expiry };

            match pledge {
                Pledge::Bandwidth(bw) => {
                    items.push(PushItem::Bandwidth(BwPushData {
                        name: bw.base.name.clone(),
                        dscp: bw.dscp,
                        p1: bw.p1,
                        p2: bw.p2,
                        external_ip: bw.external_ip.clone(),
                        expiry,
                        probe_ts: now + PUSH_PROBE_LEAD_SEC,
                    }));
                }
                Pledge::Steer(st) => {
                    items.push(PushItem::Steer {
                        name: st.base.name.clone(),
                        src: st.src.clone(),
                        dest: st.dest.clone(),
                        middleboxes: st.middleboxes.clone(),
                        proto: st.proto.clone(),
                        expiry,
                    });
                }
                Pledge::Mirror(mir) => {
                    let add = !mir.base.paused && mir.base.window.expiry > now + DELETE_GRACE_SEC;

                    items.push(PushItem::Mirror(MirrorWiz {
                        name: mir.base.name.clone(),
                        add,
                        ports: mir.ports.clone(),
                        output: mir.output.clone(),
                        vlan: mir.vlan.clone(),
                        options: mir.options.clone(),
                        phost: mir.phost.clone(),
                    }));
                }
            }

            pledge.base_mut().pushed = true;
        }

        if items.is_empty() {
            return;
        }

        log::debug!("push tick: {} pledge(s) to emit", items.len());
        let res_addr = ctx.address();

        for item in items {
            match item {
                PushItem::Bandwidth(data) => {
                    actix::spawn(push::push_bandwidth(self.net.clone(), self.fq.clone(), res_addr.clone(), data));
                }
                PushItem::Steer { name, src, dest, middleboxes, proto, expiry } => {
                    actix::spawn(push::push_steer(
                        self.net.clone(),
                        self.fq.clone(),
                        res_addr.clone(),
                        name,
                        crate::domain::ids::HostName::new(src),
                        crate::domain::ids::HostName::new(dest),
                        middleboxes,
                        proto,
                        expiry,
                    ));
                }
                PushItem::Mirror(req) => {
                    self.fq.do_send(req);
                }
            }
        }
    }

    /// If any pledge commenced or concluded since the last check, the queue
    /// landscape changed: fetch a fresh plan and forward it.
    fn do_setqueues_check(&mut self) {
        let now = self.now();
        let last = self.last_qcheck;
        self.last_qcheck = now;

        let boundary_crossed = self.inventory.iter().any(|p| {
            let w = p.window();
            (w.commence > last && w.commence <= now) || (w.expiry > last && w.expiry <= now)
        });

        if !boundary_crossed {
            return;
        }

        let net = self.net.clone();
        let fq = self.fq.clone();

        actix::spawn(async move {
            match net.send(GenQueueMap { ts: now + 1 }).await {
                Ok(plan) => fq.do_send(SetQueues { plan }),
                Err(e) => log::warn!("queue re-evaluation failed: {}", e),
            }
        });
    }

    fn do_checkpoint(&mut self) {
        let now = self.now();
        self.inventory.retain(|p| !p.is_extinct(now));

        match checkpoint::write_checkpoint(self.inventory.iter(), &self.ckpt_dir, self.ckpt_seq) {
            Ok(path) => {
                log::debug!("checkpoint written: {}", path.display());
                self.ckpt_seq += 1;
                checkpoint::prune(&self.ckpt_dir, self.ckpt_keep);
            }
            // The inventory is still in memory; keep running.
            Err(e) => log::error!("{}", e),
        }
    }
}

use actix::prelude::{Handler, MessageResult};

use crate::domain::net_mgr::NetMgr;
use crate::domain::net_mgr::messages::{
    GenEndpointQueueMap, GenQueueMap, GetIp, GraphJson, HostInfo, ListConns, ListHosts, ListUserCaps, Mac2Phost, PathQueues, PushPlan,
    Release, Reserve, ResolveHost, SetDiscount, SetUserCap,
};
use crate::domain::net_mgr::path::Path;
use crate::domain::ticker::{Tick, TickKind};
use crate::error::Result;

impl Handler<Reserve> for NetMgr {
    type Result = Result<Vec<Path>>;

    fn handle(&mut self, msg: Reserve, _ctx: &mut Self::Context) -> Self::Result {
        self.reserve(&msg)
    }
}

impl Handler<Release> for NetMgr {
    type Result = ();

    fn handle(&mut self, msg: Release, _ctx: &mut Self::Context) {
        self.release(&msg.name);
    }
}

impl Handler<GetIp> for NetMgr {
    type Result = Result<String>;

    fn handle(&mut self, msg: GetIp, _ctx: &mut Self::Context) -> Self::Result {
        self.get_ip(&msg.name)
    }
}

impl Handler<ResolveHost> for NetMgr {
    type Result = Result<HostInfo>;

    fn handle(&mut self, msg: ResolveHost, _ctx: &mut Self::Context) -> Self::Result {
        self.resolve_host(&msg.name)
    }
}

impl Handler<PathQueues> for NetMgr {
    type Result = Result<PushPlan>;

    fn handle(&mut self, msg: PathQueues, _ctx: &mut Self::Context) -> Self::Result {
        self.path_queues(&msg.name, msg.ts)
    }
}

impl Handler<GenQueueMap> for NetMgr {
    type Result = MessageResult<GenQueueMap>;

    fn handle(&mut self, msg: GenQueueMap, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.gen_queue_map(msg.ts))
    }
}

impl Handler<GenEndpointQueueMap> for NetMgr {
    type Result = MessageResult<GenEndpointQueueMap>;

    fn handle(&mut self, msg: GenEndpointQueueMap, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.gen_endpoint_queue_map(msg.ts))
    }
}

impl Handler<Mac2Phost> for NetMgr {
    type Result = ();

    fn handle(&mut self, msg: Mac2Phost, _ctx: &mut Self::Context) {
        self.update_mac2phost(msg.pairs);
    }
}

impl Handler<GraphJson> for NetMgr {
    type Result = String;

    fn handle(&mut self, _msg: GraphJson, _ctx: &mut Self::Context) -> Self::Result {
        self.graph_json()
    }
}

impl Handler<ListHosts> for NetMgr {
    type Result = String;

    fn handle(&mut self, _msg: ListHosts, _ctx: &mut Self::Context) -> Self::Result {
        self.hosts_json()
    }
}

impl Handler<ListConns> for NetMgr {
    type Result = Result<String>;

    fn handle(&mut self, msg: ListConns, _ctx: &mut Self::Context) -> Self::Result {
        self.conns_json(&msg.name)
    }
}

impl Handler<SetUserCap> for NetMgr {
    type Result = Result<()>;

    fn handle(&mut self, msg: SetUserCap, _ctx: &mut Self::Context) -> Self::Result {
        self.set_user_cap(msg.tenant, msg.pct)
    }
}

impl Handler<ListUserCaps> for NetMgr {
    type Result = String;

    fn handle(&mut self, _msg: ListUserCaps, _ctx: &mut Self::Context) -> Self::Result {
        self.user_caps_json()
    }
}

impl Handler<SetDiscount> for NetMgr {
    type Result = ();

    fn handle(&mut self, msg: SetDiscount, _ctx: &mut Self::Context) {
        self.set_discount(msg.amount);
    }
}

impl Handler<Tick> for NetMgr {
    type Result = ();

    fn handle(&mut self, msg: Tick, _ctx: &mut Self::Context) {
        if let TickKind::TopoRefresh = msg.kind {
            self.refresh_hosts();
        }
    }
}

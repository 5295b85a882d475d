use actix::prelude::Handler;

use crate::domain::agent::messages::SendOne;
use crate::domain::agent::protocol::AgentRequest;
use crate::domain::fq_mgr::FqMgr;
use crate::domain::fq_mgr::messages::{ChostList, IeReserve, MirrorWiz, SetQueues, SteerFmods};
use crate::domain::fq_mgr::steer::build_steer_fmods;

impl Handler<SetQueues> for FqMgr {
    type Result = ();

    fn handle(&mut self, msg: SetQueues, _ctx: &mut Self::Context) {
        self.push_queue_plan(msg);
    }
}

impl Handler<IeReserve> for FqMgr {
    type Result = ();

    fn handle(&mut self, msg: IeReserve, _ctx: &mut Self::Context) {
        self.push_ie_reserve(msg);
    }
}

impl Handler<SteerFmods> for FqMgr {
    type Result = ();

    fn handle(&mut self, msg: SteerFmods, _ctx: &mut Self::Context) {
        let fmods = build_steer_fmods(&msg);

        log::debug!("steering {}: {} flow-mod(s)", msg.name, fmods.len());
        self.agent().do_send(SendOne(AgentRequest::flowmod(fmods)));
    }
}

impl Handler<MirrorWiz> for FqMgr {
    type Result = ();

    fn handle(&mut self, msg: MirrorWiz, _ctx: &mut Self::Context) {
        self.push_mirror(msg);
    }
}

impl Handler<ChostList> for FqMgr {
    type Result = ();

    fn handle(&mut self, msg: ChostList, _ctx: &mut Self::Context) {
        self.set_chosts(msg.hosts);
    }
}

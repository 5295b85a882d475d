use actix::prelude::{Actor, Context};

use crate::domain::net_mgr::NetMgr;

impl Actor for NetMgr {
    type Context = Context<Self>;
}

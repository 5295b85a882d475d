use actix::prelude::{Actor, Context};

use crate::domain::res_mgr::ResMgr;

impl Actor for ResMgr {
    type Context = Context<Self>;
}

pub mod agent;
pub mod fq_mgr;
pub mod ids;
pub mod net_mgr;
pub mod pledge;
pub mod res_mgr;
pub mod ticker;

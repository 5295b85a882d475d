pub mod bandwidth;
pub mod mirror;
pub mod pledge;
pub mod steer;

pub use bandwidth::BandwidthPledge;
pub use mirror::{MirrorOutput, MirrorPledge};
pub use pledge::{DELETE_GRACE_SEC, EXTINCT_GRACE_SEC, Pledge, PledgeBase, PledgeWindow};
pub use steer::SteerPledge;

use serde::{Deserialize, Serialize};

use crate::domain::ids::TenantId;
use crate::domain::pledge::pledge::PledgeBase;

/// Flow-steering reservation: traffic from `src` to `dest` must traverse the
/// middleboxes in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SteerPledge {
    #[serde(flatten)]
    pub base: PledgeBase,

    pub tenant: TenantId,

    pub src: String,
    pub dest: String,

    /// Ordered middlebox chain (host names).
    pub middleboxes: Vec<String>,

    #[serde(default)]
    pub proto: Option<String>,
}

use actix::prelude::*;

use crate::domain::fq_mgr::FqMgr;
use crate::domain::fq_mgr::flowmod::ExternalDir;
use crate::domain::fq_mgr::messages::{IeReserve, SteerFmods};
use crate::domain::ids::{HostName, PledgeName};
use crate::domain::net_mgr::NetMgr;
use crate::domain::net_mgr::messages::{PathQueues, PushPlan, ResolveHost};
use crate::domain::res_mgr::ResMgr;
use crate::domain::res_mgr::messages::FailedPush;

/// The queue tuple probe lands this far past "now" so the timeslice lookup
/// falls inside the first post-activation slice.
pub const PUSH_PROBE_LEAD_SEC: i64 = 16;

/// Everything the detached push task needs from a bandwidth pledge.
#[derive(Debug, Clone)]
pub struct BwPushData {
    pub name: PledgeName,
    pub dscp: u8,
    pub p1: Option<u16>,
    pub p2: Option<u16>,
    pub external_ip: Option<String>,
    /// Pledge expiry, or now+15 when paused or being withdrawn.
    pub expiry: i64,
    pub probe_ts: i64,
}

/// Fire-and-forget emission for one bandwidth pledge: fetch the queue plan,
/// hand every flow-mod request to the translator. Errors come back to the
/// reservation manager as `FailedPush` so the 2s tick retries.
pub async fn push_bandwidth(net: Addr<NetMgr>, fq: Addr<FqMgr>, res: Addr<ResMgr>, data: BwPushData) {
    match net.send(PathQueues { name: data.name.clone(), ts: data.probe_ts }).await {
        Ok(Ok(plan)) => {
            let requests = build_ie_requests(&data, &plan);
            log::debug!("pushing {}: {} flow-mod request(s)", data.name, requests.len());

            for req in requests {
                fq.do_send(req);
            }
        }
        Ok(Err(e)) => {
            log::warn!("push failed for {}: {}", data.name, e);
            res.do_send(FailedPush { name: data.name });
        }
        Err(e) => {
            log::warn!("push failed for {}: network manager unreachable: {}", data.name, e);
            res.do_send(FailedPush { name: data.name });
        }
    }
}

/// Expands a push plan into concrete flow-mod requests: both directions for
/// every path, transport ports and addresses swapped on the reverse leg,
/// external references marked destination forward and source backward.
pub fn build_ie_requests(data: &BwPushData, plan: &PushPlan) -> Vec<IeReserve> {
    let mut requests = Vec::new();

    for path in &plan.paths {
        for hop in &path.fwd {
            requests.push(IeReserve {
                name: data.name.clone(),
                dscp: data.dscp,
                switch: hop.switch.clone(),
                phost: hop.phost.clone(),
                port: hop.port,
                queue: hop.queue,
                ip1: plan.ip1.clone(),
                ip2: plan.ip2.clone(),
                tp_src: data.p1,
                tp_dst: data.p2,
                direction_in: false,
                external_ip: data.external_ip.clone(),
                external_dir: ExternalDir::Dest,
                expiry: data.expiry,
            });
        }

        for hop in &path.rev {
            requests.push(IeReserve {
                name: data.name.clone(),
                dscp: data.dscp,
                switch: hop.switch.clone(),
                phost: hop.phost.clone(),
                port: hop.port,
                queue: hop.queue,
                ip1: plan.ip1.clone(),
                ip2: plan.ip2.clone(),
                tp_src: data.p1,
                tp_dst: data.p2,
                direction_in: true,
                external_ip: data.external_ip.clone(),
                external_dir: ExternalDir::Source,
                expiry: data.expiry,
            });
        }
    }

    requests
}

/// Steering pledges resolve their endpoints and middleboxes first, then hand
/// one chain request to the translator.
pub async fn push_steer(
    net: Addr<NetMgr>,
    fq: Addr<FqMgr>,
    res: Addr<ResMgr>,
    name: PledgeName,
    src: HostName,
    dest: HostName,
    middleboxes: Vec<String>,
    proto: Option<String>,
    expiry: i64,
) {
    let mut lookups = vec![src, dest];
    lookups.extend(middleboxes.iter().map(|m| HostName::new(m.clone())));

    let futures = lookups.into_iter().map(|h| net.send(ResolveHost { name: h }));
    let mut resolved = Vec::new();

    for outcome in futures::future::join_all(futures).await {
        match outcome {
            Ok(Ok(info)) => resolved.push(info),
            Ok(Err(e)) => {
                log::warn!("steer push failed for {}: {}", name, e);
                res.do_send(FailedPush { name });
                return;
            }
            Err(e) => {
                log::warn!("steer push failed for {}: network manager unreachable: {}", name, e);
                res.do_send(FailedPush { name });
                return;
            }
        }
    }

    let src = resolved.remove(0);
    let dest = resolved.remove(0);

    fq.do_send(SteerFmods { name, src, dest, boxes: resolved, proto, expiry });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::SwitchId;
    use crate::domain::net_mgr::messages::{HopFmod, PathPlan};

    fn plan(hops_per_dir: usize) -> PushPlan {
        let hop = |i: usize| HopFmod { switch: SwitchId::new(format!("s{}", i)), phost: None, port: i as i32, queue: 2 };

        PushPlan {
            ip1: "10.0.0.1".to_string(),
            ip2: "10.0.0.2".to_string(),
            paths: vec![PathPlan { fwd: (0..hops_per_dir).map(hop).collect(), rev: (0..hops_per_dir).map(hop).collect() }],
        }
    }

    fn data() -> BwPushData {
        BwPushData {
            name: PledgeName::new("r1"),
            dscp: 46,
            p1: Some(80),
            p2: None,
            external_ip: None,
            expiry: 1000,
            probe_ts: 516,
        }
    }

    #[test]
    fn both_directions_are_emitted() {
        let requests = build_ie_requests(&data(), &plan(3));

        assert_eq!(requests.len(), 6, "every hop in both directions must produce a request");
        assert_eq!(requests.iter().filter(|r| r.direction_in).count(), 3);
    }

    #[test]
    fn reverse_leg_marks_the_external_source() {
        let mut d = data();
        d.external_ip = Some("192.168.1.1".to_string());

        let requests = build_ie_requests(&d, &plan(1));

        assert_eq!(requests[0].external_dir, ExternalDir::Dest, "forward leg references the external as destination");
        assert_eq!(requests[1].external_dir, ExternalDir::Source, "reverse leg references the external as source");
    }

    #[test]
    fn expiry_is_stamped_on_every_request() {
        let requests = build_ie_requests(&data(), &plan(2));
        assert!(requests.iter().all(|r| r.expiry == 1000));
    }
}

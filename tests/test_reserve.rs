use tegu::api::topo_dto::{ConnDto, HostDto, LinkDto, NetTopoDto, SwitchDto};
use tegu::clock::MockClock;
use tegu::domain::ids::{HostName, LinkId, PledgeName};
use tegu::domain::net_mgr::NetMgr;
use tegu::domain::net_mgr::messages::Reserve;
use tegu::domain::net_mgr::obligation::TimeSlice;
use tegu::domain::pledge::PledgeWindow;
use tegu::error::Error;

const GBIT: i64 = 1_000_000_000;

fn host(name: &str, ip: &str, mac: &str, switch: &str, port: i32) -> HostDto {
    HostDto {
        name: name.to_string(),
        ip4: ip.to_string(),
        mac: mac.to_string(),
        ip6: None,
        phost: Some(format!("phys-{}", switch)),
        tenant: None,
        gateway: None,
        floating_ip: None,
        openstack_id: None,
        conns: vec![ConnDto { switch: switch.to_string(), port }],
    }
}

fn duplex(src: &str, dst: &str, sp: i32, dp: i32) -> Vec<LinkDto> {
    vec![
        LinkDto { id: None, src: src.to_string(), src_port: sp, dst: dst.to_string(), dst_port: dp, capacity: GBIT },
        LinkDto { id: None, src: dst.to_string(), src_port: dp, dst: src.to_string(), dst_port: sp, capacity: GBIT },
    ]
}

/// Three switches in a line: s1 - s2 - s3, VMs on s1 and s3, plus a pair of
/// co-resident VMs on s2.
fn test_topo() -> NetTopoDto {
    let mut links = Vec::new();
    links.extend(duplex("s1", "s2", 10, 11));
    links.extend(duplex("s2", "s3", 12, 13));

    NetTopoDto {
        switches: vec![
            SwitchDto { id: "s1".to_string(), phost: Some("phys-s1".to_string()) },
            SwitchDto { id: "s2".to_string(), phost: Some("phys-s2".to_string()) },
            SwitchDto { id: "s3".to_string(), phost: Some("phys-s3".to_string()) },
        ],
        links,
        hosts: vec![
            host("vmA", "10.0.0.1", "fa:16:3e:00:00:01", "s1", 1),
            host("vmB", "10.0.0.2", "fa:16:3e:00:00:02", "s3", 1),
            host("vmC", "10.0.0.3", "fa:16:3e:00:00:03", "s2", 1),
            host("vmD", "10.0.0.4", "fa:16:3e:00:00:04", "s2", 2),
        ],
    }
}

fn net_mgr() -> NetMgr {
    let topo = test_topo();
    NetMgr::new(
        Box::new(MockClock::new(1000)),
        topo.build_graph(),
        Box::new(tegu::domain::net_mgr::host::StaticHostOracle::new(topo.build_hosts())),
        100,
        0,
    )
}

fn reserve_req(name: &str, h1: &str, h2: &str, out: i64, inn: i64, commence: i64, expiry: i64) -> Reserve {
    Reserve {
        name: PledgeName::new(name),
        tenant: None,
        h1: HostName::new(h1),
        h2: HostName::new(h2),
        window: PledgeWindow { commence, expiry },
        amt_out: out,
        amt_in: inn,
        external_ip: None,
    }
}

#[test]
fn happy_reserve_commits_both_directions() {
    let mut net = net_mgr();

    let paths = net.reserve(&reserve_req("r1", "vmA", "vmB", 100_000_000, 50_000_000, 1010, 1070)).expect("reserve must succeed");

    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].hop_count(), 2, "vmA to vmB crosses two links");

    let fwd = net.graph().link(&paths[0].hops[0].fwd).unwrap();
    assert_eq!(fwd.obligation.max_committed(1010, 1070), 100_000_000, "forward links carry the outbound amount");

    let rev = net.graph().link(&paths[0].hops[0].rev).unwrap();
    assert_eq!(rev.obligation.max_committed(1010, 1070), 50_000_000, "twin links carry the inbound amount");
}

#[test]
fn overlapping_reservations_beyond_capacity_are_rejected() {
    let mut net = net_mgr();

    net.reserve(&reserve_req("r1", "vmA", "vmB", 700_000_000, 0, 1010, 1070)).expect("first 700M fits");

    let denied = net.reserve(&reserve_req("r2", "vmA", "vmB", 700_000_000, 0, 1030, 1100));
    assert!(matches!(denied, Err(Error::CannotReserve(_))), "the second 700M overlaps and must not fit a 1G path");

    let ok = net.reserve(&reserve_req("r3", "vmA", "vmB", 700_000_000, 0, 1080, 1200));
    assert!(ok.is_ok(), "a disjoint window must still fit");
}

#[test]
fn co_resident_hosts_use_a_linkless_path() {
    let mut net = net_mgr();

    let paths = net.reserve(&reserve_req("r1", "vmC", "vmD", 500_000_000, 500_000_000, 1010, 1070)).expect("single switch reserve");

    assert_eq!(paths[0].hop_count(), 0, "co-resident endpoints need no real links");

    for link in net.graph().links() {
        assert_eq!(link.obligation.max_committed(0, i64::MAX), 0, "a single-switch path must not consume link capacity");
    }
}

#[test]
fn release_restores_every_allotment() {
    let mut net = net_mgr();

    let before: Vec<(LinkId, Vec<TimeSlice>)> =
        net.graph().links().map(|l| (l.id.clone(), l.obligation.slices().to_vec())).collect();

    net.reserve(&reserve_req("r1", "vmA", "vmB", 100_000_000, 50_000_000, 1010, 1070)).unwrap();
    net.release(&PledgeName::new("r1"));

    for (id, slices) in before {
        let link = net.graph().link(&id).unwrap();
        assert_eq!(link.obligation.slices(), &slices[..], "link {} must return to its pre-reserve state", id);
    }
}

#[test]
fn release_is_idempotent() {
    let mut net = net_mgr();

    net.reserve(&reserve_req("r1", "vmA", "vmB", 100_000_000, 50_000_000, 1010, 1070)).unwrap();
    net.release(&PledgeName::new("r1"));
    net.release(&PledgeName::new("r1"));

    for link in net.graph().links() {
        assert_eq!(link.obligation.max_committed(0, i64::MAX), 0, "a double release must not underflow");
    }
}

#[test]
fn unknown_hosts_are_an_invalid_request() {
    let mut net = net_mgr();

    let denied = net.reserve(&reserve_req("r1", "vmA", "ghost", 1, 1, 1010, 1070));
    assert!(matches!(denied, Err(Error::InvalidRequest(_))));
}

#[test]
fn user_link_cap_limits_the_tenant_share() {
    let mut net = net_mgr();
    net.set_user_cap(tegu::domain::ids::TenantId::new("t1"), 10).unwrap();

    let mut req = reserve_req("r1", "vmA", "vmB", 200_000_000, 0, 1010, 1070);
    req.tenant = Some(tegu::domain::ids::TenantId::new("t1"));

    assert!(
        matches!(net.reserve(&req), Err(Error::CannotReserve(_))),
        "200M exceeds a 10% share of a 1G link and must be refused"
    );

    let mut ok = reserve_req("r2", "vmA", "vmB", 90_000_000, 0, 1010, 1070);
    ok.tenant = Some(tegu::domain::ids::TenantId::new("t1"));
    assert!(net.reserve(&ok).is_ok());
}

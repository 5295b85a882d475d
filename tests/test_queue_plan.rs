use tegu::api::topo_dto::{ConnDto, HostDto, LinkDto, NetTopoDto, SwitchDto};
use tegu::clock::MockClock;
use tegu::domain::ids::{HostName, PledgeName};
use tegu::domain::net_mgr::NetMgr;
use tegu::domain::net_mgr::messages::Reserve;
use tegu::domain::net_mgr::queue_map::PRIORITY_QUEUE;
use tegu::domain::pledge::PledgeWindow;

const GBIT: i64 = 1_000_000_000;

fn two_switch_topo() -> NetTopoDto {
    NetTopoDto {
        switches: vec![
            SwitchDto { id: "s1".to_string(), phost: Some("phys1".to_string()) },
            SwitchDto { id: "s2".to_string(), phost: Some("phys2".to_string()) },
        ],
        links: vec![
            LinkDto { id: None, src: "s1".to_string(), src_port: 10, dst: "s2".to_string(), dst_port: 11, capacity: GBIT },
            LinkDto { id: None, src: "s2".to_string(), src_port: 11, dst: "s1".to_string(), dst_port: 10, capacity: GBIT },
        ],
        hosts: vec![
            HostDto {
                name: "vmA".to_string(),
                ip4: "10.0.0.1".to_string(),
                mac: "fa:16:3e:00:00:01".to_string(),
                ip6: None,
                phost: Some("phys1".to_string()),
                tenant: None,
                gateway: None,
                floating_ip: None,
                openstack_id: None,
                conns: vec![ConnDto { switch: "s1".to_string(), port: 1 }],
            },
            HostDto {
                name: "vmB".to_string(),
                ip4: "10.0.0.2".to_string(),
                mac: "fa:16:3e:00:00:02".to_string(),
                ip6: None,
                phost: Some("phys2".to_string()),
                tenant: None,
                gateway: None,
                floating_ip: None,
                openstack_id: None,
                conns: vec![ConnDto { switch: "s2".to_string(), port: 1 }],
            },
        ],
    }
}

fn net_mgr(clock: MockClock) -> NetMgr {
    let topo = two_switch_topo();
    NetMgr::new(
        Box::new(clock),
        topo.build_graph(),
        Box::new(tegu::domain::net_mgr::host::StaticHostOracle::new(topo.build_hosts())),
        100,
        0,
    )
}

fn reserve_req(name: &str, out: i64, inn: i64, commence: i64, expiry: i64) -> Reserve {
    Reserve {
        name: PledgeName::new(name),
        tenant: None,
        h1: HostName::new("vmA"),
        h2: HostName::new("vmB"),
        window: PledgeWindow { commence, expiry },
        amt_out: out,
        amt_in: inn,
        external_ip: None,
    }
}

#[test]
fn queue_plan_carries_endpoint_and_link_entries() {
    let mut net = net_mgr(MockClock::new(1000));
    net.reserve(&reserve_req("r1", 100_000_000, 50_000_000, 1010, 1070)).unwrap();

    let plan = net.gen_queue_map(1020);

    let link_entries: Vec<_> = plan.iter().filter(|e| e.queue == PRIORITY_QUEUE).collect();
    assert_eq!(link_entries.len(), 2, "each link direction with committed bandwidth gets a priority-queue entry");
    assert!(link_entries.iter().all(|e| e.max_rate == GBIT), "priority queues may burst to link capacity");

    let endpoint_entries: Vec<_> = plan.iter().filter(|e| e.queue > PRIORITY_QUEUE).collect();
    assert_eq!(endpoint_entries.len(), 4, "Q/RQ/E0Q/E1Q per reservation");
    assert!(endpoint_entries.iter().all(|e| e.min_rate == e.max_rate), "endpoint queues pin min to max");
}

#[test]
fn queue_plan_is_empty_outside_the_window() {
    let mut net = net_mgr(MockClock::new(1000));
    net.reserve(&reserve_req("r1", 100_000_000, 50_000_000, 1010, 1070)).unwrap();

    assert!(net.gen_endpoint_queue_map(1005).is_empty(), "nothing is active before commence");
    assert!(net.gen_endpoint_queue_map(1071).is_empty(), "nothing is active after expiry");
}

#[test]
fn queue_numbers_are_stable_across_probes() {
    let mut net = net_mgr(MockClock::new(1000));
    net.reserve(&reserve_req("r1", 100_000_000, 50_000_000, 1010, 1070)).unwrap();

    let first = net.gen_endpoint_queue_map(1020);
    let second = net.gen_endpoint_queue_map(1040);

    assert_eq!(first, second, "re-probing inside the same slice must not renumber queues");
}

#[test]
fn queue_numbers_are_reused_after_expiry() {
    let clock = MockClock::new(1000);
    let mut net = net_mgr(clock.clone());

    net.reserve(&reserve_req("r1", 100_000_000, 50_000_000, 1010, 1070)).unwrap();
    let first = net.gen_endpoint_queue_map(1020);

    // r1's leases lapse, then a later reservation lands on the same ports.
    clock.set(2000);
    net.reserve(&reserve_req("r2", 100_000_000, 50_000_000, 2010, 2070)).unwrap();
    let second = net.gen_endpoint_queue_map(2020);

    let nums = |plan: &[tegu::domain::net_mgr::queue_map::QueueEntry]| {
        let mut v: Vec<i32> = plan.iter().map(|e| e.queue).collect();
        v.sort();
        v
    };

    assert_eq!(nums(&first), nums(&second), "disjoint timeslices on the same ports must reuse queue numbers");
}

#[test]
fn push_plan_exposes_switch_port_queue_tuples() {
    let mut net = net_mgr(MockClock::new(1000));
    net.reserve(&reserve_req("r1", 100_000_000, 50_000_000, 1010, 1070)).unwrap();

    let plan = net.path_queues(&PledgeName::new("r1"), 1016).expect("push plan for a committed pledge");

    assert_eq!(plan.ip1, "10.0.0.1");
    assert_eq!(plan.ip2, "10.0.0.2");
    assert_eq!(plan.paths.len(), 1);

    // One hop: forward = egress endpoint + ingress; no intermediates.
    assert_eq!(plan.paths[0].fwd.len(), 2);
    assert_eq!(plan.paths[0].rev.len(), 2);
    assert!(plan.paths[0].fwd.iter().all(|h| h.queue >= 2), "endpoint queues sit above the priority queue");
}
